mod cli;
mod config;
mod logging;
mod process;
mod sanitizer;
mod swiftpm;

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // best effort, the exit code still reports the failure
            err.print().ok();
            // usage errors are fatal like everything else
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match cli.exec() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}{} {}", "error".red().bold(), ":".bold(), err);
            ExitCode::FAILURE
        }
    }
}
