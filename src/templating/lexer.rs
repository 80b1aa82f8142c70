//! Template lexer.
//!
//! Splits template source into a flat token stream of literal text and
//! delimited directive content. `{{ ... }}` delimits an expression and
//! `{% ... %}` delimits a control-flow tag. Delimiters close at the first
//! matching close sequence and may not nest. Nothing is interpreted here.

use thiserror::Error;

use super::ast::Span;

const EXPR_OPEN: &str = "{{";
const EXPR_CLOSE: &str = "}}";
const TAG_OPEN: &str = "{%";
const TAG_CLOSE: &str = "%}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Text(String),
    ExprOpen,
    ExprClose,
    TagOpen,
    TagClose,
    /// Inner content between an open and a close delimiter.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Which delimiter pair a lex error concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Expression,
    Tag,
}

impl Delimiter {
    pub fn open(self) -> &'static str {
        match self {
            Delimiter::Expression => EXPR_OPEN,
            Delimiter::Tag => TAG_OPEN,
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Delimiter::Expression => EXPR_CLOSE,
            Delimiter::Tag => TAG_CLOSE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated `{}`: no matching `{}`", .delimiter.open(), .delimiter.close())]
    Unterminated {
        delimiter: Delimiter,
        offset: usize,
    },

    #[error("`{}` cannot appear inside `{}`", .inner.open(), .outer.open())]
    Nested {
        outer: Delimiter,
        inner: Delimiter,
        offset: usize,
    },
}

impl LexError {
    pub fn offset(&self) -> usize {
        match self {
            LexError::Unterminated {
                offset,
                ..
            }
            | LexError::Nested {
                offset,
                ..
            } => *offset,
        }
    }
}

struct Lexer<'a> {
    source: &'a str,
    position: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
            tokens: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        while self.position < self.source.len() {
            match next_open(self.rest()) {
                Some((relative, delimiter)) => {
                    if relative > 0 {
                        self.push_text(relative);
                    }
                    self.lex_delimited(delimiter)?;
                }
                None => {
                    let len = self.rest().len();
                    self.push_text(len);
                }
            }
        }
        Ok(self.tokens)
    }

    fn push_text(&mut self, len: usize) {
        let start = self.position;
        let end = start + len;
        self.tokens.push(Token {
            kind: TokenKind::Text(self.source[start..end].to_string()),
            span: Span::new(start, end),
        });
        self.position = end;
    }

    fn lex_delimited(&mut self, delimiter: Delimiter) -> Result<(), LexError> {
        let open_at = self.position;
        let inner_start = open_at + delimiter.open().len();
        let inner = &self.source[inner_start..];

        let close_rel = inner.find(delimiter.close()).ok_or(LexError::Unterminated {
            delimiter,
            offset: open_at,
        })?;

        let content = &inner[..close_rel];
        if let Some((nested_rel, nested)) = next_open(content) {
            return Err(LexError::Nested {
                outer: delimiter,
                inner: nested,
                offset: inner_start + nested_rel,
            });
        }

        let inner_end = inner_start + close_rel;
        let close_end = inner_end + delimiter.close().len();
        let (open_kind, close_kind) = match delimiter {
            Delimiter::Expression => (TokenKind::ExprOpen, TokenKind::ExprClose),
            Delimiter::Tag => (TokenKind::TagOpen, TokenKind::TagClose),
        };

        self.tokens.push(Token {
            kind: open_kind,
            span: Span::new(open_at, inner_start),
        });
        self.tokens.push(Token {
            kind: TokenKind::Raw(content.to_string()),
            span: Span::new(inner_start, inner_end),
        });
        self.tokens.push(Token {
            kind: close_kind,
            span: Span::new(inner_end, close_end),
        });
        self.position = close_end;
        Ok(())
    }
}

/// Find the earliest open delimiter in `input`.
fn next_open(input: &str) -> Option<(usize, Delimiter)> {
    let expr = input.find(EXPR_OPEN).map(|i| (i, Delimiter::Expression));
    let tag = input.find(TAG_OPEN).map(|i| (i, Delimiter::Tag));
    match (expr, tag) {
        (Some(e), Some(t)) => Some(if e.0 <= t.0 {
            e
        } else {
            t
        }),
        (e, t) => e.or(t),
    }
}

/// Tokenize template source.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_plain_text_is_single_token() {
        assert_eq!(kinds("Hello, world"), vec![TokenKind::Text("Hello, world".into())]);
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_expression_and_tag_tokens() {
        assert_eq!(
            kinds("A {{ x }} B {% if y %}"),
            vec![
                TokenKind::Text("A ".into()),
                TokenKind::ExprOpen,
                TokenKind::Raw(" x ".into()),
                TokenKind::ExprClose,
                TokenKind::Text(" B ".into()),
                TokenKind::TagOpen,
                TokenKind::Raw(" if y ".into()),
                TokenKind::TagClose,
            ]
        );
    }

    #[test]
    fn test_spans_cover_source() {
        let tokens = tokenize("ab{{c}}d").unwrap();
        let spans: Vec<_> = tokens.iter().map(|t| (t.span.start, t.span.end)).collect();
        assert_eq!(spans, vec![(0, 2), (2, 4), (4, 5), (5, 7), (7, 8)]);
    }

    #[test]
    fn test_stray_close_delimiters_are_text() {
        assert_eq!(kinds("a }} b %}"), vec![TokenKind::Text("a }} b %}".into())]);
    }

    #[test]
    fn test_unterminated_expression_reports_open_offset() {
        let err = tokenize("Hello {{ name").unwrap_err();
        assert_eq!(
            err,
            LexError::Unterminated {
                delimiter: Delimiter::Expression,
                offset: 6
            }
        );
        assert!(err.to_string().contains("unterminated `{{`"));
    }

    #[test]
    fn test_unterminated_tag() {
        let err = tokenize("{% if x").unwrap_err();
        assert_eq!(err.offset(), 0);
    }

    #[test]
    fn test_nested_open_is_rejected() {
        let err = tokenize("{{ a {% b %} }}").unwrap_err();
        assert!(matches!(
            err,
            LexError::Nested {
                outer: Delimiter::Expression,
                inner: Delimiter::Tag,
                offset: 5
            }
        ));
    }

    #[test]
    fn test_first_close_wins() {
        assert_eq!(
            kinds("{{ a }}}"),
            vec![
                TokenKind::ExprOpen,
                TokenKind::Raw(" a ".into()),
                TokenKind::ExprClose,
                TokenKind::Text("}".into()),
            ]
        );
    }
}
