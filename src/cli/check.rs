//! Validate templates without rendering them.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use crate::engine::Engine;

#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Template files to check
    #[arg(value_name = "TEMPLATE", required = true)]
    pub templates: Vec<PathBuf>,
}

impl CheckCommand {
    pub fn execute(self, engine: &Engine, quiet: bool) -> Result<()> {
        let total = self.templates.len();
        let mut failed = 0;

        for path in &self.templates {
            let template = match engine.load(path) {
                Ok(template) => template,
                Err(e) => {
                    failed += 1;
                    eprintln!("{} {}", "✗".red(), path.display().to_string().bold());
                    eprintln!("{:#}", e);
                    continue;
                }
            };
            match template.compile() {
                Ok(ast) => {
                    if !quiet {
                        println!(
                            "{} {} ({} v{}, {} top-level nodes)",
                            "✓".green(),
                            path.display(),
                            template.name(),
                            template.version(),
                            ast.nodes.len()
                        );
                    }
                }
                Err(e) => {
                    failed += 1;
                    eprintln!("{} {}", "✗".red(), path.display().to_string().bold());
                    eprintln!("{}", template.describe_error(&e));
                }
            }
        }

        if failed > 0 {
            bail!("{} of {} template(s) failed the check", failed, total);
        }
        Ok(())
    }
}
