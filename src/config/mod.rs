//! Configuration for the rendering engine.
//!
//! Rendering itself takes no configuration except the [`FormatContext`]
//! handed to filters. [`EngineConfig`] is the file-backed source of that
//! context plus the gap-filling and schema-lookup settings. See [`engine`]
//! for file locations and format.
//!
//! [`FormatContext`]: crate::templating::FormatContext

pub mod engine;

pub use engine::{CONFIG_ENV_VAR, EngineConfig};
