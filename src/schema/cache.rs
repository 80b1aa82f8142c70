//! Per-entity-type schema cache.
//!
//! A render session looks a schema up once per entity type and reuses it
//! for every later gap-fill request. Entries are replaced when a different
//! schema version is observed rather than expiring on every render.
//! Failed lookups are never cached.

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::descriptor::SchemaDescriptor;
use super::source::{SchemaError, SchemaSource, fetch_with_timeout};

/// Hit and miss counters of a [`SchemaCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: DashMap<String, Arc<SchemaDescriptor>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached schema for `entity`, counted as a hit or miss.
    pub fn get(&self, entity: &str) -> Option<Arc<SchemaDescriptor>> {
        match self.entries.get(entity) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(entry.value()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `schema` under the entity type it declares, replacing any
    /// existing entry.
    pub fn insert(&self, schema: SchemaDescriptor) -> Arc<SchemaDescriptor> {
        let entity = schema.entity.clone();
        self.insert_as(&entity, schema)
    }

    /// Store `schema` under `entity`, whatever entity type it declares.
    pub fn insert_as(&self, entity: &str, schema: SchemaDescriptor) -> Arc<SchemaDescriptor> {
        let schema = Arc::new(schema);
        let previous = self.entries.insert(entity.to_string(), Arc::clone(&schema));
        match previous {
            Some(previous) if previous.version != schema.version => {
                tracing::debug!(
                    entity,
                    from = previous.version,
                    to = schema.version,
                    "replaced cached schema"
                );
            }
            _ => {}
        }
        schema
    }

    /// Drop the entry for `entity` if its version is not `version`.
    /// Returns true when an entry was dropped.
    pub fn observe_version(&self, entity: &str, version: u64) -> bool {
        let removed = self.entries.remove_if(entity, |_, cached| cached.version != version).is_some();
        if removed {
            tracing::debug!(entity, version, "schema version changed, cache entry invalidated");
        }
        removed
    }

    pub fn invalidate(&self, entity: &str) -> bool {
        self.entries.remove(entity).is_some()
    }

    /// Empty the cache and reset its statistics.
    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Cached schema for `entity`, fetching it from `source` on a miss.
    pub async fn get_or_fetch(
        &self,
        source: &dyn SchemaSource,
        entity: &str,
        timeout: Duration,
    ) -> Result<Arc<SchemaDescriptor>, SchemaError> {
        if let Some(schema) = self.get(entity) {
            return Ok(schema);
        }
        let schema = fetch_with_timeout(source, entity, timeout).await?;
        Ok(self.insert_as(entity, schema))
    }
}
