//! Template parser.
//!
//! Consumes the lexer's token stream in a single pass with one token of
//! lookahead and builds the [`Ast`]. Block directives are tracked on an
//! explicit stack; a close directive must match the innermost open block.
//! Filter names, arities and literal argument types are all checked here so
//! a template that parses can never fail on them at render time.

use regex::Regex;
use std::iter::Peekable;
use std::sync::LazyLock;
use std::vec::IntoIter;
use strsim::levenshtein;

use super::ast::{Ast, AttrPath, FilterCall, Literal, Node, Segment, SourceLocation, Span};
use super::context::TODAY;
use super::error::{DirectiveSite, ParseError};
use super::filters::FilterKind;
use super::lexer::{self, Token, TokenKind};

/// Maximum Levenshtein distance, as a percentage of the candidate length,
/// for an unknown filter name to get a suggestion.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Identifier accepted for attribute names and loop bindings.
pub static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Parse template source into an AST.
pub fn parse(source: &str) -> Result<Ast, ParseError> {
    let tokens = lexer::tokenize(source).map_err(|e| ParseError::Lex {
        location: SourceLocation::from_offset(source, e.offset()),
        source: e,
    })?;
    tracing::trace!(tokens = tokens.len(), "tokenized template");
    Parser::new(source, tokens).parse()
}

/// An open block awaiting its close directive.
enum Frame {
    If {
        path: AttrPath,
        then_branch: Vec<Node>,
        else_branch: Option<Vec<Node>>,
        site: DirectiveSite,
        start: usize,
    },
    For {
        collection: AttrPath,
        binding: String,
        body: Vec<Node>,
        site: DirectiveSite,
        start: usize,
    },
}

impl Frame {
    fn site(&self) -> &DirectiveSite {
        match self {
            Frame::If {
                site,
                ..
            }
            | Frame::For {
                site,
                ..
            } => site,
        }
    }

    fn nodes_mut(&mut self) -> &mut Vec<Node> {
        match self {
            Frame::If {
                then_branch,
                else_branch,
                ..
            } => else_branch.as_mut().unwrap_or(then_branch),
            Frame::For {
                body,
                ..
            } => body,
        }
    }
}

struct Parser<'s> {
    source: &'s str,
    tokens: Peekable<IntoIter<Token>>,
    stack: Vec<Frame>,
    root: Vec<Node>,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens: tokens.into_iter().peekable(),
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    fn location(&self, offset: usize) -> SourceLocation {
        SourceLocation::from_offset(self.source, offset)
    }

    fn syntax(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            message: message.into(),
            location: self.location(offset),
        }
    }

    fn emit(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(frame) => frame.nodes_mut().push(node),
            None => self.root.push(node),
        }
    }

    fn parse(mut self) -> Result<Ast, ParseError> {
        while let Some(token) = self.tokens.next() {
            match token.kind {
                TokenKind::Text(raw) => self.emit(Node::Text {
                    raw,
                    span: token.span,
                }),
                TokenKind::ExprOpen => {
                    let (raw, raw_span) = self.expect_raw()?;
                    let close = self.expect_close(TokenKind::ExprClose)?;
                    let node = self.parse_expression(&raw, raw_span.start, Span::new(token.span.start, close.end))?;
                    self.emit(node);
                }
                TokenKind::TagOpen => {
                    let (raw, raw_span) = self.expect_raw()?;
                    let close = self.expect_close(TokenKind::TagClose)?;
                    self.parse_directive(&raw, raw_span.start, Span::new(token.span.start, close.end))?;
                }
                _ => return Err(self.syntax(token.span.start, "unexpected delimiter")),
            }
        }

        if let Some(frame) = self.stack.pop() {
            return Err(ParseError::BlockMismatch {
                opening: Some(frame.site().clone()),
                closing: None,
            });
        }

        Ok(Ast::new(self.root))
    }

    fn expect_raw(&mut self) -> Result<(String, Span), ParseError> {
        match self.tokens.next() {
            Some(Token {
                kind: TokenKind::Raw(raw),
                span,
            }) => Ok((raw, span)),
            Some(other) => Err(self.syntax(other.span.start, "expected directive content")),
            None => Err(self.syntax(self.source.len(), "unexpected end of template")),
        }
    }

    fn expect_close(&mut self, expected: TokenKind) -> Result<Span, ParseError> {
        match self.tokens.next() {
            Some(token) if token.kind == expected => Ok(token.span),
            Some(other) => Err(self.syntax(other.span.start, "expected closing delimiter")),
            None => Err(self.syntax(self.source.len(), "unexpected end of template")),
        }
    }

    fn parse_expression(&self, raw: &str, base: usize, span: Span) -> Result<Node, ParseError> {
        let mut cursor = Cursor::new(self.source, raw, base);
        cursor.skip_ws();
        if cursor.at_end() {
            return Err(self.syntax(span.start, "empty expression"));
        }

        let path = cursor.path()?;
        let mut filters = Vec::new();
        loop {
            cursor.skip_ws();
            if cursor.at_end() {
                break;
            }
            if !cursor.eat('|') {
                return Err(cursor.unexpected());
            }
            cursor.skip_ws();
            filters.push(cursor.filter_call()?);
        }

        Ok(Node::Expression {
            path,
            filters,
            span,
        })
    }

    fn parse_directive(&mut self, raw: &str, base: usize, span: Span) -> Result<(), ParseError> {
        let trimmed = raw.trim_start();
        let lead = raw.len() - trimmed.len();
        let keyword_len = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let keyword = &trimmed[..keyword_len];
        let rest_offset = base + lead + keyword_len;
        let rest = &trimmed[keyword_len..];

        let site = DirectiveSite {
            keyword: keyword.to_string(),
            location: self.location(span.start),
        };

        match keyword {
            "if" => {
                let path = self.directive_path(rest, rest_offset, "if")?;
                self.stack.push(Frame::If {
                    path,
                    then_branch: Vec::new(),
                    else_branch: None,
                    site,
                    start: span.start,
                });
            }
            "else" => {
                self.no_arguments(rest, rest_offset, keyword)?;
                match self.stack.last_mut() {
                    Some(Frame::If {
                        else_branch: else_branch @ None,
                        ..
                    }) => *else_branch = Some(Vec::new()),
                    other => {
                        return Err(ParseError::BlockMismatch {
                            opening: other.map(|f| f.site().clone()),
                            closing: Some(site),
                        });
                    }
                }
            }
            "endif" => {
                self.no_arguments(rest, rest_offset, keyword)?;
                match self.stack.pop() {
                    Some(Frame::If {
                        path,
                        then_branch,
                        else_branch,
                        start,
                        ..
                    }) => self.emit(Node::Conditional {
                        path,
                        then_branch,
                        else_branch,
                        span: Span::new(start, span.end),
                    }),
                    other => return Err(self.mismatch(other, site)),
                }
            }
            "for" => {
                let (binding, collection) = self.for_header(rest, rest_offset)?;
                self.stack.push(Frame::For {
                    collection,
                    binding,
                    body: Vec::new(),
                    site,
                    start: span.start,
                });
            }
            "endfor" => {
                self.no_arguments(rest, rest_offset, keyword)?;
                match self.stack.pop() {
                    Some(Frame::For {
                        collection,
                        binding,
                        body,
                        start,
                        ..
                    }) => self.emit(Node::Loop {
                        collection,
                        binding,
                        body,
                        span: Span::new(start, span.end),
                    }),
                    other => return Err(self.mismatch(other, site)),
                }
            }
            "" => return Err(self.syntax(span.start, "empty directive")),
            other => {
                return Err(self.syntax(
                    base + lead,
                    format!("unknown directive `{}`; expected if, else, endif, for or endfor", other),
                ));
            }
        }
        Ok(())
    }

    fn mismatch(&self, frame: Option<Frame>, closing: DirectiveSite) -> ParseError {
        ParseError::BlockMismatch {
            opening: frame.map(|f| f.site().clone()),
            closing: Some(closing),
        }
    }

    fn no_arguments(&self, rest: &str, offset: usize, keyword: &str) -> Result<(), ParseError> {
        let trimmed = rest.trim_start();
        if trimmed.trim_end().is_empty() {
            return Ok(());
        }
        Err(self.syntax(
            offset + rest.len() - trimmed.len(),
            format!("`{}` takes no arguments", keyword),
        ))
    }

    /// Parse a path that must make up the whole of `rest`.
    fn directive_path(&self, rest: &str, offset: usize, keyword: &str) -> Result<AttrPath, ParseError> {
        let mut cursor = Cursor::new(self.source, rest, offset);
        cursor.skip_ws();
        if cursor.at_end() {
            return Err(self.syntax(offset, format!("`{}` needs an attribute path", keyword)));
        }
        let path = cursor.path()?;
        cursor.skip_ws();
        if !cursor.at_end() {
            return Err(cursor.unexpected());
        }
        Ok(path)
    }

    /// Parse `<item> in <path>`.
    fn for_header(&self, rest: &str, offset: usize) -> Result<(String, AttrPath), ParseError> {
        let mut cursor = Cursor::new(self.source, rest, offset);
        cursor.skip_ws();
        let binding_at = cursor.offset();
        let binding = cursor
            .identifier()
            .ok_or_else(|| self.syntax(binding_at, "expected `for <item> in <path>`"))?;
        if binding == TODAY {
            return Err(self.syntax(binding_at, format!("`{}` is reserved and cannot be a loop variable", TODAY)));
        }

        cursor.skip_ws();
        let in_at = cursor.offset();
        if cursor.identifier().as_deref() != Some("in") {
            return Err(self.syntax(in_at, "expected `in` after the loop variable"));
        }

        let path_at = cursor.offset();
        let path = self.directive_path(cursor.rest(), path_at, "for")?;
        Ok((binding, path))
    }
}

/// Character cursor over directive content. Offsets are absolute in the
/// template source so errors can be located precisely.
struct Cursor<'s, 'r> {
    source: &'s str,
    input: &'r str,
    pos: usize,
    base: usize,
}

impl<'s, 'r> Cursor<'s, 'r> {
    fn new(source: &'s str, input: &'r str, base: usize) -> Self {
        Self {
            source,
            input,
            pos: 0,
            base,
        }
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn rest(&self) -> &'r str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            message: message.into(),
            location: SourceLocation::from_offset(self.source, offset),
        }
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(c) => self.error(self.offset(), format!("unexpected `{}`", c)),
            None => self.error(self.offset(), "unexpected end of directive"),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'r str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn identifier(&mut self) -> Option<String> {
        if !self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
            return None;
        }
        Some(self.take_while(|c| c.is_ascii_alphanumeric() || c == '_').to_string())
    }

    fn index(&mut self) -> Result<usize, ParseError> {
        let at = self.offset();
        let digits = self.take_while(|c| c.is_ascii_digit());
        digits.parse().map_err(|_| self.error(at, "expected a sequence index"))
    }

    /// `Name ( . Name | . 0 | [0] )*`
    fn path(&mut self) -> Result<AttrPath, ParseError> {
        let head = self.identifier().ok_or_else(|| self.unexpected_in_path())?;
        let mut segments = vec![Segment::Field(head)];

        loop {
            if self.eat('.') {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    segments.push(Segment::Index(self.index()?));
                } else {
                    let field = self.identifier().ok_or_else(|| self.unexpected_in_path())?;
                    segments.push(Segment::Field(field));
                }
            } else if self.eat('[') {
                segments.push(Segment::Index(self.index()?));
                if !self.eat(']') {
                    return Err(self.error(self.offset(), "expected `]`"));
                }
            } else {
                break;
            }
        }
        Ok(AttrPath::new(segments))
    }

    fn unexpected_in_path(&self) -> ParseError {
        match self.peek() {
            Some(c) => self.error(self.offset(), format!("expected an attribute name, found `{}`", c)),
            None => self.error(self.offset(), "expected an attribute name"),
        }
    }

    fn filter_call(&mut self) -> Result<FilterCall, ParseError> {
        let start = self.offset();
        let name = self
            .identifier()
            .ok_or_else(|| self.error(start, "expected a filter name after `|`"))?;
        let filter = FilterKind::lookup(&name).ok_or_else(|| ParseError::UnknownFilter {
            suggestion: suggest_filter(&name),
            location: SourceLocation::from_offset(self.source, start),
            name: name.clone(),
        })?;

        self.skip_ws();
        let mut args = Vec::new();
        if self.eat('(') {
            self.skip_ws();
            if !self.eat(')') {
                loop {
                    self.skip_ws();
                    args.push(self.literal()?);
                    self.skip_ws();
                    if self.eat(')') {
                        break;
                    }
                    if !self.eat(',') {
                        return Err(self.unexpected());
                    }
                }
            }
        }
        let span = Span::new(start, self.offset());
        let location = SourceLocation::from_offset(self.source, start);

        let spec = filter.spec();
        if !spec.accepts_arity(args.len()) {
            return Err(ParseError::FilterArity {
                filter: spec.name,
                expected: spec.arity_description(),
                found: args.len(),
                location,
            });
        }
        spec.check_args(&args).map_err(|message| ParseError::FilterArgument {
            filter: spec.name,
            message,
            location,
        })?;

        Ok(FilterCall {
            filter,
            args,
            span,
        })
    }

    fn literal(&mut self) -> Result<Literal, ParseError> {
        let at = self.offset();
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some('\\') => match self.bump() {
                            Some(escaped) => value.push(escaped),
                            None => break,
                        },
                        Some(c) if c == quote => return Ok(Literal::Str(value)),
                        Some(c) => value.push(c),
                        None => break,
                    }
                }
                Err(self.error(at, "unterminated string literal"))
            }
            Some(c) if c.is_ascii_digit() || c == '-' => {
                let text = self.take_while(|c| c.is_ascii_digit() || c == '.' || c == '-');
                text.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(Literal::Number)
                    .ok_or_else(|| self.error(at, format!("invalid number `{}`", text)))
            }
            _ => Err(self.error(at, "expected a string or number literal")),
        }
    }
}

fn suggest_filter(name: &str) -> Option<String> {
    FilterKind::all()
        .map(|kind| kind.name())
        .map(|candidate| (candidate, levenshtein(name, candidate)))
        .filter(|(candidate, distance)| *distance * 100 <= candidate.len() * SIMILARITY_THRESHOLD_PERCENT)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate.to_string())
}
