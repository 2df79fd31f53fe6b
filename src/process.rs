//! Child process execution.
//!
//! Every call blocks until the child exits. A non-zero exit is turned into a
//! [`ProcessError`] and nothing about the failure is interpreted beyond the
//! exit status.

use colored::Colorize;
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Variables layered over the inherited environment for a single child.
pub type EnvOverlay = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to execute '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed ({status}): {command}")]
    Failed { command: String, status: ExitStatus },
}

/// A fully described child process: program, arguments and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: EnvOverlay,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: EnvOverlay::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, env: EnvOverlay) -> Self {
        self.env.extend(env);
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(&self.env);
        command
    }

    fn failed(&self, status: ExitStatus) -> ProcessError {
        ProcessError::Failed {
            command: self.to_string(),
            status,
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> ProcessError {
        ProcessError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

/// Renders as a copy-pasteable shell line, e.g. `ASAN_OPTIONS=detect_leaks=false swift build`.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = self
            .env
            .iter()
            .map(|(key, value)| format!("{key}={}", escape_arg(value)))
            .join(" ");
        let command = std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .map(|arg| escape_arg(&arg))
            .join(" ");

        if env.is_empty() {
            f.write_str(&command)
        } else {
            write!(f, "{env} {command}")
        }
    }
}

/// Quote `arg` if it contains a space or a double quote.
pub fn escape_arg(arg: &str) -> String {
    if arg.contains('"') || arg.contains(' ') {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_owned()
    }
}

/// Seam between the dispatcher and the operating system.
pub trait Runner {
    /// Run to completion with inherited stdio; fail on non-zero exit.
    fn check_call(&mut self, invocation: &Invocation) -> Result<(), ProcessError>;

    /// Run to completion and return stdout; stderr is discarded.
    fn check_output(&mut self, invocation: &Invocation) -> Result<String, ProcessError>;

    /// Remove a directory tree, ignoring it if it's already gone.
    fn remove_dir_all(&mut self, path: &Path);
}

/// Spawns real processes.
#[derive(Debug, Default)]
pub struct SystemRunner {
    verbose: bool,
}

impl SystemRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn echo(&self, invocation: &Invocation) {
        if self.verbose {
            println!("{}", invocation.to_string().bright_black());
        }
    }
}

impl Runner for SystemRunner {
    fn check_call(&mut self, invocation: &Invocation) -> Result<(), ProcessError> {
        self.echo(invocation);
        tracing::debug!(program = %invocation.program.display(), "spawning");

        // the child writes straight to the fd, so our own lines must land first
        std::io::stdout()
            .flush()
            .map_err(|err| invocation.spawn_error(err))?;
        let stderr = stdout_as_stdio().map_err(|err| invocation.spawn_error(err))?;

        let status = invocation
            .command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(stderr)
            .status()
            .map_err(|err| invocation.spawn_error(err))?;

        if status.success() {
            Ok(())
        } else {
            Err(invocation.failed(status))
        }
    }

    fn check_output(&mut self, invocation: &Invocation) -> Result<String, ProcessError> {
        self.echo(invocation);
        tracing::debug!(program = %invocation.program.display(), "capturing output");

        let output = invocation
            .command()
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|err| invocation.spawn_error(err))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(invocation.failed(output.status))
        }
    }

    fn remove_dir_all(&mut self, path: &Path) {
        if let Err(err) = std::fs::remove_dir_all(path) {
            tracing::debug!(path = %path.display(), %err, "nothing removed");
        }
    }
}

/// A duplicate of our stdout, so a child's stderr interleaves with its stdout.
#[cfg(unix)]
fn stdout_as_stdio() -> std::io::Result<Stdio> {
    use std::os::fd::AsFd;
    Ok(Stdio::from(std::io::stdout().as_fd().try_clone_to_owned()?))
}

#[cfg(windows)]
fn stdout_as_stdio() -> std::io::Result<Stdio> {
    use std::os::windows::io::AsHandle;
    Ok(Stdio::from(std::io::stdout().as_handle().try_clone_to_owned()?))
}

#[cfg(not(any(unix, windows)))]
fn stdout_as_stdio() -> std::io::Result<Stdio> {
    Ok(Stdio::inherit())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every call instead of spawning anything.
    #[derive(Debug, Default)]
    pub struct RecordingRunner {
        pub calls: Vec<Invocation>,
        pub queries: Vec<Invocation>,
        pub removed: Vec<PathBuf>,
        /// Returned by `check_output`.
        pub output: String,
        /// Fail the n-th `check_call` (0-based).
        pub fail_call: Option<usize>,
        /// Directory whose existence is sampled at each `check_call`.
        pub probe: Option<PathBuf>,
        pub probe_seen: Vec<bool>,
    }

    impl Runner for RecordingRunner {
        fn check_call(&mut self, invocation: &Invocation) -> Result<(), ProcessError> {
            if let Some(probe) = &self.probe {
                self.probe_seen.push(probe.exists());
            }
            self.calls.push(invocation.clone());

            if self.fail_call == Some(self.calls.len() - 1) {
                return Err(ProcessError::Failed {
                    command: invocation.to_string(),
                    status: failing_status(),
                });
            }
            Ok(())
        }

        fn check_output(&mut self, invocation: &Invocation) -> Result<String, ProcessError> {
            self.queries.push(invocation.clone());
            Ok(self.output.clone())
        }

        fn remove_dir_all(&mut self, path: &Path) {
            self.removed.push(path.to_path_buf());
            let _ = std::fs::remove_dir_all(path);
        }
    }

    #[cfg(unix)]
    fn failing_status() -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(1 << 8)
    }

    #[cfg(windows)]
    fn failing_status() -> ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(1)
    }
}
