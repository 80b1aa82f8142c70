//! External schema lookup.
//!
//! Schema descriptors are owned by another system. [`SchemaSource`] is the
//! seam to it; every lookup goes through [`fetch_with_timeout`] so a slow
//! collaborator can never stall a render. Dropping the returned future
//! cancels the lookup. Nothing here retries.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

use super::descriptor::SchemaDescriptor;
use crate::templating::parser::IDENTIFIER;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema lookup for `{entity}` timed out after {}ms", timeout.as_millis())]
    Timeout {
        entity: String,
        timeout: Duration,
    },

    #[error("no schema found for entity type `{0}`")]
    NotFound(String),

    #[error("schema source failed for `{entity}`: {message}")]
    Source {
        entity: String,
        message: String,
    },
}

impl SchemaError {
    fn from_anyhow(entity: &str, error: &anyhow::Error) -> Self {
        SchemaError::Source {
            entity: entity.to_string(),
            message: format!("{:#}", error),
        }
    }
}

/// Provider of entity-type schemas.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn fetch(&self, entity: &str) -> Result<SchemaDescriptor, SchemaError>;
}

/// Fetch `entity` from `source`, giving up after `timeout`.
pub async fn fetch_with_timeout(
    source: &dyn SchemaSource,
    entity: &str,
    timeout: Duration,
) -> Result<SchemaDescriptor, SchemaError> {
    tracing::debug!(entity, timeout_ms = timeout.as_millis() as u64, "fetching schema");
    match tokio::time::timeout(timeout, source.fetch(entity)).await {
        Ok(result) => result,
        Err(_) => Err(SchemaError::Timeout {
            entity: entity.to_string(),
            timeout,
        }),
    }
}

/// In-memory schemas, replaceable at runtime.
#[derive(Debug, Default)]
pub struct StaticSchemaSource {
    schemas: DashMap<String, SchemaDescriptor>,
    fetches: AtomicUsize,
}

impl StaticSchemaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(self, schema: SchemaDescriptor) -> Self {
        self.insert(schema);
        self
    }

    /// Add or replace the schema for `schema.entity`.
    pub fn insert(&self, schema: SchemaDescriptor) {
        self.schemas.insert(schema.entity.clone(), schema);
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SchemaSource for StaticSchemaSource {
    async fn fetch(&self, entity: &str) -> Result<SchemaDescriptor, SchemaError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.schemas
            .get(entity)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SchemaError::NotFound(entity.to_string()))
    }
}

/// Schemas stored as `<root>/<Entity>.json` or `<root>/<Entity>.toml`.
#[derive(Debug, Clone)]
pub struct DirectorySchemaSource {
    root: PathBuf,
}

impl DirectorySchemaSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read(&self, entity: &str) -> anyhow::Result<Option<SchemaDescriptor>> {
        let json = self.root.join(format!("{}.json", entity));
        if tokio::fs::try_exists(&json).await.unwrap_or(false) {
            let content = tokio::fs::read_to_string(&json)
                .await
                .with_context(|| format!("Failed to read schema file: {}", json.display()))?;
            let schema = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse schema file: {}", json.display()))?;
            return Ok(Some(schema));
        }

        let toml_path = self.root.join(format!("{}.toml", entity));
        if tokio::fs::try_exists(&toml_path).await.unwrap_or(false) {
            let content = tokio::fs::read_to_string(&toml_path)
                .await
                .with_context(|| format!("Failed to read schema file: {}", toml_path.display()))?;
            let schema = toml::from_str(&content)
                .with_context(|| format!("Failed to parse schema file: {}", toml_path.display()))?;
            return Ok(Some(schema));
        }

        Ok(None)
    }
}

#[async_trait]
impl SchemaSource for DirectorySchemaSource {
    async fn fetch(&self, entity: &str) -> Result<SchemaDescriptor, SchemaError> {
        // Entity names become file names.
        if !IDENTIFIER.is_match(entity) {
            return Err(SchemaError::from_anyhow(entity, &anyhow!("`{}` is not a valid entity type name", entity)));
        }

        let schema = self
            .read(entity)
            .await
            .map_err(|e| SchemaError::from_anyhow(entity, &e))?
            .ok_or_else(|| SchemaError::NotFound(entity.to_string()))?;

        if schema.entity != entity {
            tracing::warn!(
                requested = entity,
                declared = %schema.entity,
                root = %self.root.display(),
                "schema file declares a different entity type"
            );
        }
        Ok(schema)
    }
}
