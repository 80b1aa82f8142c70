//! Rendering façade.
//!
//! [`Engine`] ties together template compilation, rendering and gap
//! filling. It owns two session caches:
//!
//! - compiled templates keyed by (name, version, fingerprint), so each
//!   distinct template source is parsed once and its AST shared
//! - entity schemas, see [`SchemaCache`]
//!
//! Rendering is synchronous. Only gap filling touches the async schema
//! lookup, and a failed lookup never fails the render: the result simply
//! carries no proposal.

use dashmap::DashMap;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::schema::cache::SchemaCache;
use crate::schema::gaps::{self, GapOptions, GapProposal};
use crate::schema::source::SchemaSource;
use crate::templating::{DataContext, FormatContext, ParseError, RenderResult, Template, renderer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TemplateKey {
    name: String,
    version: String,
    fingerprint: String,
}

impl TemplateKey {
    fn of(template: &Template) -> Self {
        Self {
            name: template.name().to_string(),
            version: template.version().to_string(),
            fingerprint: template.fingerprint(),
        }
    }
}

/// A render plus the optional gap-fill supplement.
#[derive(Debug, Clone, Serialize)]
pub struct FilledRender {
    pub render: RenderResult,
    pub proposal: Option<GapProposal>,
    /// The proposal's fragment rendered against the same record.
    pub supplement: Option<RenderResult>,
}

impl FilledRender {
    /// Main text followed by the supplement, if any.
    pub fn combined_text(&self) -> String {
        match &self.supplement {
            Some(supplement) => format!("{}{}", self.render.text, supplement.text),
            None => self.render.text.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    format: FormatContext,
    gap_options: GapOptions,
    templates: DashMap<TemplateKey, Arc<Template>>,
    schemas: SchemaCache,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            format: config.format_context(),
            gap_options: config.gap_options(),
            config,
            templates: DashMap::new(),
            schemas: SchemaCache::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn format_context(&self) -> &FormatContext {
        &self.format
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schemas
    }

    /// Record that the schema for `entity` is now at `version`. A cached
    /// schema at any other version is dropped, so the next gap-fill request
    /// fetches it again. Returns true when an entry was dropped.
    pub fn observe_schema_version(&self, entity: &str, version: u64) -> bool {
        self.schemas.observe_version(entity, version)
    }

    /// Intern `template`. A template with the same name, version and source
    /// returns the instance already held, along with its parsed AST.
    pub fn register(&self, template: Template) -> Arc<Template> {
        let key = TemplateKey::of(&template);
        Arc::clone(
            self.templates
                .entry(key)
                .or_insert_with(|| {
                    tracing::debug!(
                        template = %template.name(),
                        version = %template.version(),
                        "registered template"
                    );
                    Arc::new(template)
                })
                .value(),
        )
    }

    /// Register and compile in one step.
    pub fn compile(&self, template: Template) -> Result<Arc<Template>, ParseError> {
        let template = self.register(template);
        template.compile()?;
        Ok(template)
    }

    /// Load a template file and register it.
    pub fn load(&self, path: &Path) -> anyhow::Result<Arc<Template>> {
        Ok(self.register(Template::load(path)?))
    }

    pub fn cached_templates(&self) -> usize {
        self.templates.len()
    }

    /// Forget every cached template and schema.
    pub fn clear(&self) {
        self.templates.clear();
        self.schemas.clear();
    }

    pub fn render(&self, template: &Template, context: &DataContext) -> Result<RenderResult, ParseError> {
        template.render(context, &self.format)
    }

    /// Propose content for schema attributes `template` never references.
    ///
    /// `entity` overrides the template's declared entity type. Returns
    /// `Ok(None)` when no entity type is known or the schema cannot be
    /// obtained; only a template parse error is an error. Schemas are cached
    /// per entity type until [`Engine::observe_schema_version`] reports a
    /// different version.
    pub async fn propose_gaps(
        &self,
        template: &Template,
        entity: Option<&str>,
        source: &dyn SchemaSource,
    ) -> Result<Option<GapProposal>, ParseError> {
        let ast = template.compile()?;

        let Some(entity) = entity.or(template.entity()) else {
            tracing::warn!(template = %template.name(), "gap filling requested without an entity type");
            return Ok(None);
        };

        let schema = match self.schemas.get_or_fetch(source, entity, self.config.schema_timeout()).await {
            Ok(schema) => schema,
            Err(e) => {
                tracing::warn!(template = %template.name(), entity, error = %e, "schema lookup failed, skipping gap filling");
                return Ok(None);
            }
        };

        match gaps::propose(ast, &schema, &self.gap_options) {
            Ok(proposal) => Ok(Some(proposal)),
            Err(e) => {
                tracing::warn!(template = %template.name(), entity, error = %e, "generated gap fragment did not parse");
                Ok(None)
            }
        }
    }

    /// Render `template` and, alongside it, the gap-fill supplement.
    ///
    /// The template itself is never altered; the supplement is rendered
    /// separately so the caller can decide whether to keep it.
    pub async fn render_with_gaps(
        &self,
        template: &Template,
        context: &DataContext,
        entity: Option<&str>,
        source: &dyn SchemaSource,
    ) -> Result<FilledRender, ParseError> {
        let render = self.render(template, context)?;
        let proposal = self.propose_gaps(template, entity, source).await?;
        let supplement = proposal
            .as_ref()
            .filter(|proposal| !proposal.is_empty())
            .map(|proposal| renderer::render(&proposal.fragment, &proposal.source, context, &self.format));

        Ok(FilledRender {
            render,
            proposal,
            supplement,
        })
    }
}
