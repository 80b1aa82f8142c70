//! Command-line interface for Portable Views.
//!
//! `pview` is a developer harness around the library: it validates
//! templates, renders them against a JSON record, and shows gap-fill
//! proposals for a schema directory.
//!
//! # Commands
//!
//! - `check` - Parse a template and report errors with their location
//! - `render` - Render a template against a JSON record
//! - `gaps` - Show the gap-fill proposal for a template and schema
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug logging
//! - `--quiet` - Suppress everything except errors
//! - `--config` - Path to an engine config file
//!
//! # Examples
//!
//! ```bash
//! pview check templates/change-order.md
//! pview render templates/change-order.md --context co-17.json --today 2024-06-01T09:00:00Z
//! pview render templates/change-order.md --context co-17.json --fill-gaps --schema-dir schemas/
//! pview gaps templates/change-order.md --schema-dir schemas/ --entity ChangeOrder
//! ```

mod check;
mod gaps;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::templating::{ParseError, Template};

pub use check::CheckCommand;
pub use gaps::GapsCommand;
pub use render::RenderCommand;

#[derive(Parser, Debug)]
#[command(
    name = "pview",
    about = "Compile, render and gap-fill Portable View templates",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to an engine config file
    ///
    /// Overrides `PVIEW_CONFIG` and `~/.pview/config.toml`.
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a template and report any errors
    Check(CheckCommand),

    /// Render a template against a JSON record
    Render(RenderCommand),

    /// Show the gap-fill proposal for a template
    Gaps(GapsCommand),
}

/// Output format for commands that print structured results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        let config = EngineConfig::load(self.config.as_deref())?;
        let engine = Engine::new(config);
        let quiet = self.quiet;

        match self.command {
            Commands::Check(cmd) => cmd.execute(&engine, quiet),
            Commands::Render(cmd) => cmd.execute(&engine, quiet).await,
            Commands::Gaps(cmd) => cmd.execute(&engine).await,
        }
    }

    /// Log level chosen by the global flags; `None` defers to `RUST_LOG`.
    fn log_level(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }

    fn init_logging(&self) {
        let filter = match self.log_level() {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// A parse error as an author-facing report.
fn parse_failure(template: &Template, error: &ParseError) -> anyhow::Error {
    anyhow::anyhow!("{}", template.describe_error(error))
}
