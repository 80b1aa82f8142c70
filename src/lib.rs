//! Portable Views - data-bound document templates
//!
//! A Portable View is a document produced by binding a template to one
//! entity record: a change order, an invoice, an RFI. Templates are
//! authored by end users in Markdown with a small, non-Turing-complete
//! expression language, so this crate treats them as untrusted input:
//! they can read the bound record and nothing else.
//!
//! # Architecture Overview
//!
//! ```text
//! template source ─▶ lexer ─▶ parser ─▶ AST (cached per template)
//!                                        │
//!                 data context ──────────┴─▶ renderer ─▶ text + diagnostics
//!
//! AST paths + schema descriptor ─▶ gap filler ─▶ proposed fragment
//! ```
//!
//! Parsing is strict: unknown filters, bad filter arguments and unbalanced
//! blocks are rejected with a source location before any record is seen.
//! Rendering is forgiving: missing data renders as empty text and is
//! reported as a diagnostic, so one broken token never blanks a document.
//!
//! # Core Modules
//!
//! - [`templating`] - Lexer, parser, filters, evaluator and renderer
//! - [`schema`] - Entity schemas, schema lookup and gap filling
//! - [`engine`] - Façade with compiled-template and schema caches
//! - [`config`] - Engine configuration (`~/.pview/config.toml`)
//! - [`cli`] - The `pview` developer command line
//!
//! # Template Syntax
//!
//! ```text
//! # Change Order {{ Number }}
//!
//! Prepared {{ _today | date }} for {{ Customer.Name | default('Valued Customer') }}.
//! Amount: {{ Amount | currency }}
//!
//! {% if ScopeOfWork %}{{ ScopeOfWork }}{% else %}Scope to follow.{% endif %}
//! {% for item in Items %}- {{ item.Description }}: {{ item.Cost | currency('EUR') }}
//! {% endfor %}
//! ```
//!
//! # Example
//!
//! ```rust
//! use portable_views::engine::Engine;
//! use portable_views::templating::{DataContext, Template};
//! use serde_json::json;
//!
//! let engine = Engine::default();
//! let template = engine.compile(Template::new("co", "1", "{{ Number }}: {{ Amount | currency }}")).unwrap();
//! let context = DataContext::now(json!({"Number": "CO-17", "Amount": 0}).into());
//!
//! let result = engine.render(&template, &context).unwrap();
//! assert_eq!(result.text, "CO-17: $0.00");
//! assert!(!result.has_diagnostics());
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod schema;
pub mod templating;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
