//! Structural representation of a parsed template.
//!
//! The parser produces an [`Ast`]: an ordered list of [`Node`]s. Nodes are
//! immutable once built and carry the [`Span`] of the source they came from
//! so that diagnostics can point back at the template author's text.

use std::fmt;

/// Byte range in the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
        }
    }

    /// Resolve the start of this span to a line/column position in `source`.
    pub fn location(&self, source: &str) -> SourceLocation {
        SourceLocation::from_offset(source, self.start)
    }
}

/// Human-oriented position in the template source.
///
/// Lines and columns are 1-based; columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub const START: SourceLocation = SourceLocation {
        offset: 0,
        line: 1,
        column: 1,
    };

    /// Translate a location measured inside a body that begins at `origin`
    /// into the coordinates of the enclosing file.
    pub fn within(self, origin: SourceLocation) -> Self {
        let column = if self.line == 1 {
            origin.column + self.column - 1
        } else {
            self.column
        };
        Self {
            offset: origin.offset + self.offset,
            line: origin.line + self.line - 1,
            column,
        }
    }

    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;

        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One step of an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object field access (`Customer` in `Customer.Name`).
    Field(String),
    /// Sequence index (`0` in `Items.0` or `Items[0]`).
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => f.write_str(name),
            Segment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Dotted attribute path such as `Customer.Address.City`.
///
/// Always has at least one segment and the first segment is always a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttrPath {
    segments: Vec<Segment>,
}

impl AttrPath {
    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        debug_assert!(matches!(segments.first(), Some(Segment::Field(_))));
        Self {
            segments,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The top-level attribute name this path starts from.
    pub fn head(&self) -> &str {
        match self.segments.first() {
            Some(Segment::Field(name)) => name,
            _ => "",
        }
    }

    pub fn tail(&self) -> &[Segment] {
        self.segments.get(1..).unwrap_or(&[])
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Literal filter argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Number(f64),
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            Literal::Number(_) => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "'{}'", s),
            Literal::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A single `| name(args)` application in an expression pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub filter: super::filters::FilterKind,
    pub args: Vec<Literal>,
    pub span: Span,
}

/// Template AST node. The variant set is closed.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal passthrough text.
    Text {
        raw: String,
        span: Span,
    },
    /// `{{ path | filter ... }}`
    Expression {
        path: AttrPath,
        filters: Vec<FilterCall>,
        span: Span,
    },
    /// `{% if path %} ... {% else %} ... {% endif %}`
    Conditional {
        path: AttrPath,
        then_branch: Vec<Node>,
        else_branch: Option<Vec<Node>>,
        span: Span,
    },
    /// `{% for item in path %} ... {% endfor %}`
    Loop {
        collection: AttrPath,
        binding: String,
        body: Vec<Node>,
        span: Span,
    },
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Text {
                span,
                ..
            }
            | Node::Expression {
                span,
                ..
            }
            | Node::Conditional {
                span,
                ..
            }
            | Node::Loop {
                span,
                ..
            } => *span,
        }
    }
}

/// Parsed template tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ast {
    pub nodes: Vec<Node>,
}

impl Ast {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
        }
    }

    pub fn is_text_only(&self) -> bool {
        self.nodes.iter().all(|n| matches!(n, Node::Text { .. }))
    }

    /// Visit every path the template reads, paired with the loop bindings
    /// that are in scope at that point (innermost last).
    pub fn walk_paths<'a, F>(&'a self, mut visit: F)
    where
        F: FnMut(&'a AttrPath, &[&'a str]),
    {
        fn walk<'a, F>(nodes: &'a [Node], scope: &mut Vec<&'a str>, visit: &mut F)
        where
            F: FnMut(&'a AttrPath, &[&'a str]),
        {
            for node in nodes {
                match node {
                    Node::Text {
                        ..
                    } => {}
                    Node::Expression {
                        path,
                        ..
                    } => visit(path, scope),
                    Node::Conditional {
                        path,
                        then_branch,
                        else_branch,
                        ..
                    } => {
                        visit(path, scope);
                        walk(then_branch, scope, visit);
                        if let Some(else_branch) = else_branch {
                            walk(else_branch, scope, visit);
                        }
                    }
                    Node::Loop {
                        collection,
                        binding,
                        body,
                        ..
                    } => {
                        visit(collection, scope);
                        scope.push(binding);
                        walk(body, scope, visit);
                        scope.pop();
                    }
                }
            }
        }

        let mut scope = Vec::new();
        walk(&self.nodes, &mut scope, &mut visit);
    }
}
