mod action;

pub use action::{Action, RunError};

use crate::config::{Configuration, InvocationConfig, Options};
use crate::process::SystemRunner;
use crate::sanitizer::Sanitizer;
use crate::swiftpm::HostOs;
use anstyle::{AnsiColor, Color::Ansi, Style};
use clap::{builder::Styles, Args, Command, CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::{generate, Generator};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use itertools::Itertools;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, name = "build-script-helper")]
#[command(about = "Build along with the Swift build-script.")]
#[command(styles=STYLES, help_template = help_template("help", false, true, true))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the package
    #[command(styles=STYLES, help_template = help_template("command", false, true, false))]
    Build(PackageArgs),

    /// Test the package
    #[command(styles=STYLES, help_template = help_template("command", false, true, false))]
    Test(PackageArgs),

    /// Generate shell completions
    #[command(styles=STYLES, help_template = help_template("command", true, false, false))]
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

/// Options shared by `build` and `test`.
#[derive(Debug, Args)]
pub struct PackageArgs {
    /// Directory of the package to build
    #[arg(long, value_name = "PATH", default_value = ".", value_hint = ValueHint::DirPath)]
    pub package_path: PathBuf,

    /// Build using the toolchain at PATH
    #[arg(long, value_name = "PATH", env = "INDEXSTOREDB_TOOLCHAIN_BIN_PATH", value_hint = ValueHint::DirPath)]
    pub toolchain: PathBuf,

    /// Ninja binary to use for testing
    #[arg(long, value_name = "PATH", env = "NINJA_BIN", value_hint = ValueHint::ExecutablePath)]
    pub ninja_bin: Option<PathBuf>,

    /// Build in the given path
    #[arg(long, value_name = "PATH", default_value = ".build", value_hint = ValueHint::DirPath)]
    pub build_path: PathBuf,

    /// Build using configuration
    #[arg(short, long, value_enum, default_value_t = Configuration::Debug)]
    pub configuration: Configuration,

    /// Build using the given sanitizer(s)
    #[arg(long, value_enum)]
    pub sanitize: Vec<Sanitizer>,

    /// Build using every available sanitizer in sub-directories of build path
    #[arg(long)]
    pub sanitize_all: bool,

    /// Path to an Xcode workspace to create a unified build of all of Swift's SwiftPM projects
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub multiroot_data_file: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

impl PackageArgs {
    /// `-v` asks for SwiftPM's verbose output and echoes every command.
    pub fn verbose(&self) -> bool {
        self.verbosity.log_level_filter() >= log::LevelFilter::Debug
    }

    pub fn options(&self) -> Options {
        Options {
            package_path: self.package_path.clone(),
            toolchain: self.toolchain.clone(),
            ninja_bin: self.ninja_bin.clone(),
            build_path: self.build_path.clone(),
            configuration: self.configuration,
            sanitize: self.sanitize.clone(),
            sanitize_all: self.sanitize_all,
            verbose: self.verbose(),
            multiroot_data_file: self.multiroot_data_file.clone(),
        }
    }
}

impl Cli {
    pub fn exec(&self) -> Result<(), RunError> {
        let (action, args) = match &self.command {
            Commands::Build(args) => (Action::Build, args),
            Commands::Test(args) => (Action::Test, args),
            Commands::Completion { shell } => {
                print_completions(*shell, &mut Cli::command());
                return Ok(());
            }
            Commands::Unknown(args) => {
                let name = args.first().cloned().unwrap_or_default();
                return Err(RunError::UnknownAction(name));
            }
        };

        crate::logging::init(args.verbosity.log_level_filter());
        let config = InvocationConfig::from_options(args.options())?;
        tracing::debug!(?config, "resolved configuration");

        let mut runner = SystemRunner::new(config.verbose);
        action::run(action, &config, HostOs::current(), &mut runner)
    }
}

const HEADER_STYLE: Style = Style::new().bold().fg_color(Some(Ansi(AnsiColor::Green)));
const STYLES: Styles = Styles::styled()
    .literal(AnsiColor::BrightCyan.on_default().bold())
    .placeholder(AnsiColor::BrightCyan.on_default());

fn help_template(
    template: &str,
    has_arguments: bool,
    has_options: bool,
    has_commands: bool,
) -> String {
    let header = HEADER_STYLE.render();
    let rheader = HEADER_STYLE.render_reset();

    let sections = [
        (
            format!("{header}Arguments{rheader}:\n{{positionals}}"),
            has_arguments,
        ),
        (
            format!("{header}Options{rheader}:\n{{options}}"),
            has_options,
        ),
        (
            format!("{header}Commands{rheader}:\n{{subcommands}}"),
            has_commands,
        ),
    ]
    .iter()
    .filter(|(_, has)| *has)
    .map(|(s, _)| s)
    .join("\n\n");

    match template {
        "help" => format!(
            "\
build-script-helper v{{version}}
{{about-with-newline}}
{header}Usage{rheader}: {{usage}}

{sections}
{{after-help}}
"
        ),
        _ => format!(
            "\
{{about-with-newline}}
{header}Usage{rheader}: {{usage}}

{sections}
{{after-help}}
"
        ),
    }
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut std::io::stdout());
}
