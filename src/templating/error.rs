//! Template error types.
//!
//! Parse-time errors ([`ParseError`]) abort compilation of a template and
//! carry a precise [`SourceLocation`]. Render-time filter failures
//! ([`FilterTypeError`]) never abort a render; the renderer records them as
//! diagnostics.

use std::fmt;
use thiserror::Error;

use super::ast::SourceLocation;
use super::lexer::LexError;

/// Where a block directive was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveSite {
    /// Directive keyword: `if`, `else`, `endif`, `for`, `endfor`.
    pub keyword: String,
    pub location: SourceLocation,
}

impl fmt::Display for DirectiveSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{{% {} %}}` at {}", self.keyword, self.location)
    }
}

/// Fatal template compilation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{source} (at {location})")]
    Lex {
        source: LexError,
        location: SourceLocation,
    },

    /// Unbalanced or misordered block directives. `opening` is absent for a
    /// stray close; `closing` is absent when the block is never closed.
    #[error("{}", describe_mismatch(.opening.as_ref(), .closing.as_ref()))]
    BlockMismatch {
        opening: Option<DirectiveSite>,
        closing: Option<DirectiveSite>,
    },

    #[error("unknown filter `{name}` (at {location})")]
    UnknownFilter {
        name: String,
        suggestion: Option<String>,
        location: SourceLocation,
    },

    #[error("filter `{filter}` expects {expected}, got {found} (at {location})")]
    FilterArity {
        filter: &'static str,
        expected: String,
        found: usize,
        location: SourceLocation,
    },

    #[error("invalid argument for filter `{filter}`: {message} (at {location})")]
    FilterArgument {
        filter: &'static str,
        message: String,
        location: SourceLocation,
    },

    #[error("{message} (at {location})")]
    Syntax {
        message: String,
        location: SourceLocation,
    },
}

fn describe_mismatch(opening: Option<&DirectiveSite>, closing: Option<&DirectiveSite>) -> String {
    match (opening, closing) {
        (Some(open), Some(close)) => format!("{} does not close {}", close, open),
        (Some(open), None) => format!("{} is never closed", open),
        (None, Some(close)) => format!("{} has no matching opening directive", close),
        (None, None) => "unbalanced block directives".to_string(),
    }
}

impl ParseError {
    /// Primary location of the error. For block mismatches this is the
    /// opening directive when there is one.
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            ParseError::Lex {
                location,
                ..
            }
            | ParseError::UnknownFilter {
                location,
                ..
            }
            | ParseError::FilterArity {
                location,
                ..
            }
            | ParseError::FilterArgument {
                location,
                ..
            }
            | ParseError::Syntax {
                location,
                ..
            } => Some(*location),
            ParseError::BlockMismatch {
                opening,
                closing,
            } => opening.as_ref().or(closing.as_ref()).map(|site| site.location),
        }
    }

    /// Move every location into the coordinates of a file whose template
    /// body begins at `origin`.
    pub fn within(self, origin: SourceLocation) -> Self {
        let site = |site: DirectiveSite| DirectiveSite {
            location: site.location.within(origin),
            ..site
        };
        match self {
            ParseError::Lex {
                source,
                location,
            } => ParseError::Lex {
                source,
                location: location.within(origin),
            },
            ParseError::BlockMismatch {
                opening,
                closing,
            } => ParseError::BlockMismatch {
                opening: opening.map(site),
                closing: closing.map(site),
            },
            ParseError::UnknownFilter {
                name,
                suggestion,
                location,
            } => ParseError::UnknownFilter {
                name,
                suggestion,
                location: location.within(origin),
            },
            ParseError::FilterArity {
                filter,
                expected,
                found,
                location,
            } => ParseError::FilterArity {
                filter,
                expected,
                found,
                location: location.within(origin),
            },
            ParseError::FilterArgument {
                filter,
                message,
                location,
            } => ParseError::FilterArgument {
                filter,
                message,
                location: location.within(origin),
            },
            ParseError::Syntax {
                message,
                location,
            } => ParseError::Syntax {
                message,
                location: location.within(origin),
            },
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ParseError::Lex {
                ..
            } => "Unterminated Delimiter",
            ParseError::BlockMismatch {
                ..
            } => "Block Mismatch",
            ParseError::UnknownFilter {
                ..
            } => "Unknown Filter",
            ParseError::FilterArity {
                ..
            } => "Wrong Filter Argument Count",
            ParseError::FilterArgument {
                ..
            } => "Invalid Filter Argument",
            ParseError::Syntax {
                ..
            } => "Template Syntax Error",
        }
    }

    /// Author-facing report: title, message, the offending source line with
    /// a caret, and a hint where one applies.
    pub fn format_with_context(&self, source: &str) -> String {
        let mut msg = String::new();

        msg.push_str(&format!("ERROR: {}\n\n", self.title()));
        msg.push_str(&format!("{}\n", self));

        let mut sites = Vec::new();
        if let ParseError::BlockMismatch {
            opening,
            closing,
        } = self
        {
            sites.extend(opening.iter().map(|s| s.location));
            sites.extend(closing.iter().map(|s| s.location));
        } else if let Some(location) = self.location() {
            sites.push(location);
        }

        for location in sites {
            msg.push('\n');
            msg.push_str(&source_excerpt(source, location));
        }

        match self {
            ParseError::UnknownFilter {
                suggestion: Some(suggestion),
                ..
            } => {
                msg.push_str(&format!("\nDid you mean `{}`?\n", suggestion));
            }
            ParseError::UnknownFilter {
                ..
            } => {
                msg.push_str("\nAvailable filters: default, currency, date, datetime\n");
            }
            ParseError::BlockMismatch {
                ..
            } => {
                msg.push_str(
                    "\nSUGGESTION: every `{% if %}` needs an `{% endif %}` and every \
                     `{% for %}` an `{% endfor %}`, closed innermost first.\n",
                );
            }
            ParseError::Lex {
                ..
            } => {
                msg.push_str("\nSUGGESTION: close every `{{` with `}}` and every `{%` with `%}`.\n");
            }
            _ => {}
        }

        msg
    }
}

/// Render a `line | text` excerpt with a caret under `location`.
fn source_excerpt(source: &str, location: SourceLocation) -> String {
    let line_text = source.lines().nth(location.line.saturating_sub(1)).unwrap_or("");
    let gutter = location.line.to_string();
    format!(
        "{} | {}\n{} | {}^\n",
        gutter,
        line_text,
        " ".repeat(gutter.len()),
        " ".repeat(location.column.saturating_sub(1))
    )
}

/// A filter received a value outside its declared input type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("filter `{filter}`: {message}")]
pub struct FilterTypeError {
    pub filter: &'static str,
    pub message: String,
}

impl FilterTypeError {
    pub fn new(filter: &'static str, message: impl Into<String>) -> Self {
        Self {
            filter,
            message: message.into(),
        }
    }

    pub fn mismatch(filter: &'static str, expected: &str, found: &super::value::Value) -> Self {
        Self::new(filter, format!("expected {}, found {}", expected, found.kind()))
    }
}
