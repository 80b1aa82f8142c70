//! Integration test suite for Portable Views
//!
//! End-to-end tests through the public API and the `pview` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **rendering**: Parse and render scenarios against realistic records
//! - **gap_filling**: Schema lookup, caching and gap proposals
//! - **cli**: The `pview` command line

mod cli;
mod gap_filling;
mod rendering;
