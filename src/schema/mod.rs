//! Entity schemas and schema-aware gap filling.
//!
//! - [`descriptor`]: the attribute schema of an entity type
//! - [`source`]: timeout-bound lookup from an external collaborator
//! - [`cache`]: per-entity-type cache, invalidated on version change
//! - [`gaps`]: proposals for attributes a template never references

pub mod cache;
pub mod descriptor;
pub mod gaps;
pub mod source;

pub use cache::{CacheStats, SchemaCache};
pub use descriptor::{AttributeGroup, SchemaAttribute, SchemaDescriptor, SemanticType};
pub use gaps::{GapOptions, GapProposal, ProposedAttribute, propose, referenced_attributes};
pub use source::{DirectorySchemaSource, SchemaError, SchemaSource, StaticSchemaSource, fetch_with_timeout};
