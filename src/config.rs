use crate::sanitizer::Sanitizer;
use clap::ValueEnum;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot combine --sanitize with --sanitize-all")]
    SanitizerConflict,

    #[error("unable to determine the current directory: {0}")]
    CurrentDir(#[from] std::io::Error),
}

/// SwiftPM build configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Configuration {
    #[default]
    Debug,
    Release,
}

impl Configuration {
    pub fn as_str(self) -> &'static str {
        match self {
            Configuration::Debug => "debug",
            Configuration::Release => "release",
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw, uncanonicalized options as they come off the command line.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub package_path: PathBuf,
    pub toolchain: PathBuf,
    pub ninja_bin: Option<PathBuf>,
    pub build_path: PathBuf,
    pub configuration: Configuration,
    pub sanitize: Vec<Sanitizer>,
    pub sanitize_all: bool,
    pub verbose: bool,
    pub multiroot_data_file: Option<PathBuf>,
}

/// Everything needed to drive one `swift build` / `swift test` call.
///
/// All paths are absolute. Only one of `sanitizers` and `sanitize_all` is ever
/// set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationConfig {
    pub package_path: PathBuf,
    pub toolchain: PathBuf,
    pub ninja_bin: Option<PathBuf>,
    pub build_path: PathBuf,
    pub configuration: Configuration,
    pub sanitizers: Vec<Sanitizer>,
    pub sanitize_all: bool,
    pub verbose: bool,
    pub multiroot_data_file: Option<PathBuf>,
}

impl InvocationConfig {
    /// Validate `options` and resolve its paths against the current directory.
    pub fn from_options(options: Options) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()?;
        Self::resolve(options, &cwd)
    }

    /// Same as [`InvocationConfig::from_options`] with an explicit base directory.
    pub fn resolve(options: Options, base: &Path) -> Result<Self, ConfigError> {
        if !options.sanitize.is_empty() && options.sanitize_all {
            return Err(ConfigError::SanitizerConflict);
        }

        Ok(Self {
            package_path: absolutize(&options.package_path, base),
            toolchain: absolutize(&options.toolchain, base),
            ninja_bin: options.ninja_bin.map(|p| absolutize(&p, base)),
            build_path: absolutize(&options.build_path, base),
            configuration: options.configuration,
            sanitizers: options.sanitize,
            sanitize_all: options.sanitize_all,
            verbose: options.verbose,
            multiroot_data_file: options.multiroot_data_file.map(|p| absolutize(&p, base)),
        })
    }

    /// Configuration for one pass of the sanitizer sweep.
    pub fn sweep_pass(&self, sanitizer: Sanitizer) -> Self {
        Self {
            build_path: self.build_path.join(sanitizer.build_subdir()),
            sanitizers: vec![sanitizer],
            sanitize_all: false,
            ..self.clone()
        }
    }

    /// `<toolchain>/bin/swift`
    pub fn swift_exec(&self) -> PathBuf {
        self.toolchain
            .join("bin")
            .join(format!("swift{}", std::env::consts::EXE_SUFFIX))
    }
}

/// Make `path` absolute against `base` and drop `.`/`..` components.
///
/// Purely lexical: the path does not need to exist.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` stays `/`
                if !matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Options {
        Options {
            package_path: ".".into(),
            toolchain: "toolchain/usr".into(),
            build_path: ".build".into(),
            ..Default::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn relative_paths_are_made_absolute() {
        let config = InvocationConfig::resolve(
            Options {
                ninja_bin: Some("../ninja/ninja".into()),
                multiroot_data_file: Some("./swift.xcworkspace".into()),
                ..options()
            },
            Path::new("/work/isdb"),
        )
        .unwrap();

        assert_eq!(config.package_path, Path::new("/work/isdb"));
        assert_eq!(config.toolchain, Path::new("/work/isdb/toolchain/usr"));
        assert_eq!(config.build_path, Path::new("/work/isdb/.build"));
        assert_eq!(config.ninja_bin.as_deref(), Some(Path::new("/work/ninja/ninja")));
        assert_eq!(
            config.multiroot_data_file.as_deref(),
            Some(Path::new("/work/isdb/swift.xcworkspace"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn absolute_paths_are_normalized() {
        assert_eq!(
            absolutize(Path::new("/opt/./swift/../toolchain/"), Path::new("/ignored")),
            Path::new("/opt/toolchain")
        );
        assert_eq!(absolutize(Path::new("/.."), Path::new("/")), Path::new("/"));
    }

    #[test]
    fn paths_from_current_dir_are_absolute() {
        let config = InvocationConfig::from_options(options()).unwrap();
        assert!(config.package_path.is_absolute());
        assert!(config.toolchain.is_absolute());
        assert!(config.build_path.is_absolute());
    }

    #[test]
    fn sanitize_conflicts_with_sanitize_all() {
        let err = InvocationConfig::from_options(Options {
            sanitize: vec![Sanitizer::Address],
            sanitize_all: true,
            ..options()
        })
        .unwrap_err();

        assert!(matches!(err, ConfigError::SanitizerConflict));
        assert_eq!(err.to_string(), "cannot combine --sanitize with --sanitize-all");
    }

    #[test]
    fn sweep_pass_uses_own_subdirectory() {
        let base = InvocationConfig::from_options(Options {
            sanitize_all: true,
            ..options()
        })
        .unwrap();

        let pass = base.sweep_pass(Sanitizer::Thread);
        assert_eq!(pass.build_path, base.build_path.join("test-tsan"));
        assert_eq!(pass.sanitizers, vec![Sanitizer::Thread]);
        assert!(!pass.sanitize_all);
        assert_eq!(pass.toolchain, base.toolchain);
    }
}
