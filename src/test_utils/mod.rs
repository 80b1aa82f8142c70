//! Test utilities for Portable Views
//!
//! Shared logging setup and fixtures for unit and integration tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use portable_views::test_utils::{TemplateFixture, init_test_logging};
//!
//! init_test_logging(None);
//! let temp = tempfile::TempDir::new().unwrap();
//! let path = TemplateFixture::change_order().write_to(temp.path()).unwrap();
//! assert!(path.exists());
//! ```

pub mod fixtures;

pub use fixtures::{RecordFixture, SchemaFixture, TemplateFixture};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging
/// stays off.
///
/// ```bash
/// RUST_LOG=portable_views=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
