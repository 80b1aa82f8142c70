//! Show the gap-fill proposal for a template.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::{OutputFormat, parse_failure};
use crate::engine::Engine;
use crate::schema::source::DirectorySchemaSource;

#[derive(Args, Debug)]
pub struct GapsCommand {
    /// Template file to analyse
    #[arg(value_name = "TEMPLATE")]
    pub template: PathBuf,

    /// Directory of `<Entity>.json` or `<Entity>.toml` schema files
    #[arg(long, value_name = "DIR")]
    pub schema_dir: PathBuf,

    /// Entity type to look up; overrides the template's frontmatter
    #[arg(long, value_name = "TYPE")]
    pub entity: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl GapsCommand {
    pub async fn execute(self, engine: &Engine) -> Result<()> {
        let template = engine.load(&self.template)?;
        template.compile().map_err(|e| parse_failure(&template, &e))?;

        let Some(entity) = self.entity.as_deref().or(template.entity()) else {
            bail!(
                "No entity type for {}: pass --entity or set `entity` in the template frontmatter",
                self.template.display()
            );
        };

        // Report lookup failures instead of degrading to no proposal.
        let source = DirectorySchemaSource::new(&self.schema_dir);
        engine
            .schema_cache()
            .get_or_fetch(&source, entity, engine.config().schema_timeout())
            .await?;

        let Some(proposal) = engine
            .propose_gaps(&template, Some(entity), &source)
            .await
            .map_err(|e| parse_failure(&template, &e))?
        else {
            bail!("Could not compute a gap proposal for {}", entity);
        };

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&proposal)?),
            OutputFormat::Text => {
                if proposal.is_empty() {
                    println!("{} {} covers every {} attribute", "✓".green(), template.name(), entity);
                } else {
                    println!(
                        "{} attribute(s) of {} v{} are not referenced:",
                        proposal.attributes.len(),
                        entity,
                        proposal.schema_version
                    );
                    for attribute in &proposal.attributes {
                        println!("  {} ({}, {:?})", attribute.name.bold(), attribute.kind, attribute.group);
                    }
                    println!("\n{}", "Proposed fragment:".cyan());
                    println!("{}", proposal.source);
                }
                for name in &proposal.skipped {
                    eprintln!("{} skipped `{}`: not a valid attribute name", "warning:".yellow(), name);
                }
            }
        }
        Ok(())
    }
}
