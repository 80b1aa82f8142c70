//! `pview` entry point
//!
//! Parses arguments, runs the command, and turns any error into a message
//! on stderr with exit code 1.

use clap::Parser;
use colored::Colorize;
use portable_views::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    if let Err(e) = cli.execute().await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
