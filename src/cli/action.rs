use crate::config::{ConfigError, InvocationConfig};
use crate::process::{ProcessError, Runner};
use crate::sanitizer::Sanitizer;
use crate::swiftpm::{self, HostOs, STALE_TESTS_DIR};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Build,
    Test,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Build => "build",
            Action::Test => "test",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run `action` once, then once per sweep sanitizer if `--sanitize-all` was given.
///
/// The first failure aborts whatever passes are left.
pub fn run(
    action: Action,
    config: &InvocationConfig,
    host: HostOs,
    runner: &mut impl Runner,
) -> Result<(), RunError> {
    handle_invocation(action, config, host, runner)?;

    if config.sanitize_all {
        for sanitizer in Sanitizer::SWEEP {
            println!(
                "{}",
                format!(
                    "=== {action} indexstore-db with {} ===",
                    sanitizer.short_name()
                )
                .bold()
            );
            handle_invocation(action, &config.sweep_pass(sanitizer), host, runner)?;
        }
    }

    Ok(())
}

pub fn handle_invocation(
    action: Action,
    config: &InvocationConfig,
    host: HostOs,
    runner: &mut impl Runner,
) -> Result<(), RunError> {
    tracing::debug!(%action, build_path = %config.build_path.display(), "invoking swift");
    match action {
        Action::Build => build(config, host, runner),
        Action::Test => run_tests(config, host, runner),
    }
}

fn build(config: &InvocationConfig, host: HostOs, runner: &mut impl Runner) -> Result<(), RunError> {
    runner.check_call(&swiftpm::build_invocation(config, host))?;
    Ok(())
}

fn run_tests(
    config: &InvocationConfig,
    host: HostOs,
    runner: &mut impl Runner,
) -> Result<(), RunError> {
    let query = swiftpm::bin_path_invocation(config, host);
    // the echoed command line would tear through the spinner
    let bin_path = if config.verbose {
        runner.check_output(&query)?
    } else {
        wrap_progress("Resolving binary path", || runner.check_output(&query))?
    };
    let bin_path = PathBuf::from(bin_path.trim());
    tracing::debug!(bin_path = %bin_path.display());

    let tests = bin_path.join(STALE_TESTS_DIR);
    println!("Cleaning {}", tests.display().to_string().cyan());
    runner.remove_dir_all(&tests);

    runner.check_call(&swiftpm::test_invocation(config, host))?;
    Ok(())
}

fn wrap_progress<F, T, E>(message: &str, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    let style = ProgressStyle::with_template("{spinner:.bold.cyan} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
    let done = ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner());

    let bar = ProgressBar::new_spinner()
        .with_style(style)
        .with_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));

    let res = f();
    bar.set_style(done);
    match res {
        Ok(_) => {
            bar.set_message(format!("{} {message}", "✔".green().bold()));
            bar.finish()
        }
        Err(_) => {
            bar.set_message(format!("{} {message}", "✖".red().bold()));
            bar.abandon()
        }
    }

    res
}
