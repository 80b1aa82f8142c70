//! Render a template against a JSON record.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, Local};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

use super::{OutputFormat, parse_failure};
use crate::engine::{Engine, FilledRender};
use crate::schema::source::DirectorySchemaSource;
use crate::templating::{DataContext, Diagnostic};

#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Template file to render
    #[arg(value_name = "TEMPLATE")]
    pub template: PathBuf,

    /// JSON file holding the record to bind
    #[arg(long, value_name = "FILE")]
    pub context: PathBuf,

    /// Render timestamp for `_today`, as RFC 3339 (defaults to now)
    #[arg(long, value_name = "TIMESTAMP", value_parser = parse_timestamp)]
    pub today: Option<DateTime<FixedOffset>>,

    /// Append a section for schema attributes the template leaves out
    #[arg(long, requires = "schema_dir")]
    pub fill_gaps: bool,

    /// Directory of `<Entity>.json` or `<Entity>.toml` schema files
    #[arg(long, value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,

    /// Entity type to look up; overrides the template's frontmatter
    #[arg(long, value_name = "TYPE")]
    pub entity: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Fail when rendering produced diagnostics
    #[arg(long)]
    pub strict: bool,
}

impl RenderCommand {
    pub async fn execute(self, engine: &Engine, quiet: bool) -> Result<()> {
        let template = engine.load(&self.template)?;
        let record = read_record(&self.context)?;
        let today = self.today.unwrap_or_else(|| Local::now().fixed_offset());
        let context = DataContext::from_json(record, today);

        let filled = match (&self.schema_dir, self.fill_gaps) {
            (Some(dir), true) => {
                let source = DirectorySchemaSource::new(dir);
                engine
                    .render_with_gaps(&template, &context, self.entity.as_deref(), &source)
                    .await
                    .map_err(|e| parse_failure(&template, &e))?
            }
            _ => FilledRender {
                render: engine.render(&template, &context).map_err(|e| parse_failure(&template, &e))?,
                proposal: None,
                supplement: None,
            },
        };

        let diagnostics: Vec<&Diagnostic> = filled
            .render
            .diagnostics
            .iter()
            .chain(filled.supplement.iter().flat_map(|s| s.diagnostics.iter()))
            .collect();

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&filled)?),
            OutputFormat::Text => {
                print!("{}", filled.combined_text());
                if !quiet {
                    for diagnostic in &diagnostics {
                        eprintln!("{} {}", "warning:".yellow(), diagnostic);
                    }
                }
            }
        }

        if self.strict && !diagnostics.is_empty() {
            bail!("Rendering produced {} diagnostic(s)", diagnostics.len());
        }
        Ok(())
    }
}

fn read_record(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse context file: {}", path.display()))
}

fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(value).map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}
