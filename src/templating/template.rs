//! Templates: immutable source plus a lazily parsed, cached AST.

use anyhow::{Context, Result};
use gray_matter::{Matter, engine::YAML};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::OnceLock;

use super::ast::{Ast, SourceLocation};
use super::context::DataContext;
use super::error::ParseError;
use super::filters::FormatContext;
use super::parser;
use super::renderer::{self, RenderResult};

const FRONTMATTER_DELIMITER: &str = "---";

/// Optional YAML frontmatter at the top of a template file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<VersionField>,
    /// Entity type the template binds to, used for gap filling.
    #[serde(default)]
    pub entity: Option<String>,
}

/// Versions may be written as `3` or `"3.1-draft"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VersionField {
    Number(serde_yaml::Number),
    Text(String),
}

impl std::fmt::Display for VersionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionField::Number(n) => write!(f, "{}", n),
            VersionField::Text(s) => f.write_str(s),
        }
    }
}

/// A named, versioned template. The source is never mutated; the AST is
/// built on first use and shared by every later render.
///
/// Locations in parse errors and diagnostics count from the start of the
/// file the template was read from, frontmatter included.
#[derive(Debug)]
pub struct Template {
    name: String,
    version: String,
    entity: Option<String>,
    /// Full file text; the body starts at `origin.offset`.
    text: String,
    origin: SourceLocation,
    ast: OnceLock<Result<Ast, ParseError>>,
}

impl Template {
    pub fn new(name: impl Into<String>, version: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            entity: None,
            text: source.into(),
            origin: SourceLocation::START,
            ast: OnceLock::new(),
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Build a template from Markdown with optional frontmatter. `fallback_name`
    /// is used when the frontmatter does not name the template.
    pub fn from_markdown(fallback_name: &str, content: &str) -> Result<Self> {
        let Some(body_start) = frontmatter_end(content) else {
            return Ok(Self::new(fallback_name, "0", content));
        };

        let matter: Matter<YAML> = Matter::new();
        let parsed = matter
            .parse::<TemplateMeta>(content)
            .with_context(|| format!("Failed to parse frontmatter of template '{}'", fallback_name))?;
        let meta = parsed.data.unwrap_or_default();

        let name = meta.name.unwrap_or_else(|| fallback_name.to_string());
        let version = meta.version.map(|v| v.to_string()).unwrap_or_else(|| "0".to_string());
        let mut template = Self::new(name, version, content);
        template.entity = meta.entity;
        template.origin = SourceLocation::from_offset(content, body_start);
        Ok(template)
    }

    /// Load a template file; the file stem is the fallback name.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template file: {}", path.display()))?;
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("template");
        Self::from_markdown(stem, &content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Template body, without frontmatter.
    pub fn source(&self) -> &str {
        &self.text[self.origin.offset..]
    }

    /// The text the template was built from, frontmatter included.
    pub fn file_text(&self) -> &str {
        &self.text
    }

    /// Where the body begins in [`Template::file_text`].
    pub fn origin(&self) -> SourceLocation {
        self.origin
    }

    /// Author-facing report for an error returned by [`Template::compile`].
    pub fn describe_error(&self, error: &ParseError) -> String {
        error.format_with_context(&self.text)
    }

    /// SHA-256 of the file text, hex encoded.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.text.as_bytes()))
    }

    /// Parse on first call; later calls return the cached result.
    pub fn compile(&self) -> Result<&Ast, ParseError> {
        self.ast
            .get_or_init(|| {
                tracing::debug!(template = %self.name, version = %self.version, "parsing template");
                parser::parse(self.source()).map_err(|e| e.within(self.origin))
            })
            .as_ref()
            .map_err(|e| e.clone())
    }

    pub fn is_compiled(&self) -> bool {
        self.ast.get().is_some()
    }

    pub fn render(&self, context: &DataContext, format: &FormatContext) -> Result<RenderResult, ParseError> {
        let ast = self.compile()?;
        let mut result = renderer::render(ast, self.source(), context, format);
        if self.origin != SourceLocation::START {
            for diagnostic in &mut result.diagnostics {
                diagnostic.relocate(self.origin);
            }
        }
        Ok(result)
    }
}

/// Byte offset just past the closing `---` line, when `content` opens with
/// a frontmatter block.
fn frontmatter_end(content: &str) -> Option<usize> {
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != FRONTMATTER_DELIMITER {
        return None;
    }

    let mut offset = first.len();
    for line in lines {
        offset += line.len();
        if line.trim_end() == FRONTMATTER_DELIMITER {
            return Some(offset);
        }
    }
    None
}
