//! Template compilation and rendering for Portable Views.
//!
//! A Portable View is a document produced by binding a template to one
//! entity record. Templates are Markdown (or any text) containing a small,
//! closed expression language:
//!
//! - Substitution: `{{ Customer.Name }}`
//! - Filters: `{{ Amount | currency | default('TBD') }}`
//! - Conditionals: `{% if ScopeOfWork %} ... {% else %} ... {% endif %}`
//! - Loops: `{% for co in ChangeOrders %}{{ co.Number }}{% endfor %}`
//! - The reserved `_today` variable: `{{ _today | date('%m/%d/%Y') }}`
//!
//! # Pipeline
//!
//! ```text
//! source ──lexer──▶ tokens ──parser──▶ Ast (cached on the Template)
//!                                        │
//!                   DataContext ─────────┴──renderer──▶ RenderResult
//! ```
//!
//! # Safety
//!
//! The grammar is not Turing-complete. There are no user-defined functions,
//! no includes and no access to anything but the supplied data context.
//! Filters come from a fixed table and unknown names are rejected at parse
//! time, as are wrong argument counts and malformed arguments.
//!
//! # Missing data
//!
//! A path that does not resolve yields a missing sentinel rather than an
//! error. Missing expressions render as empty text with a diagnostic;
//! missing `if` paths are falsy; missing `for` collections render nothing.
//! Numeric zero is truthy so financial values of 0 still render.
//!
//! # Examples
//!
//! ```rust
//! use portable_views::templating::{DataContext, FormatContext, Template};
//! use serde_json::json;
//!
//! let template = Template::new("co", "1", "{{ Number }} - {{ Amount | currency }}");
//! let context = DataContext::now(json!({"Number": "CO-7", "Amount": 1234.5}).into());
//! let result = template.render(&context, &FormatContext::default()).unwrap();
//! assert_eq!(result.text, "CO-7 - $1,234.50");
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod filters;
pub mod lexer;
pub mod parser;
pub mod renderer;
pub mod template;
pub mod value;

pub use ast::{Ast, AttrPath, Node, Segment, SourceLocation, Span};
pub use context::{DataContext, TODAY};
pub use error::{DirectiveSite, FilterTypeError, ParseError};
pub use filters::{FilterKind, FormatContext};
pub use lexer::LexError;
pub use parser::parse;
pub use renderer::{Diagnostic, DiagnosticKind, RenderResult, render};
pub use template::{Template, TemplateMeta};
pub use value::{Resolved, Scalar, Value};
