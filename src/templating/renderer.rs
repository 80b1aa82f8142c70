//! Depth-first renderer.
//!
//! A render is a pure function of (AST, data context, format settings). It
//! never fails: problems with individual tokens are recorded as
//! [`Diagnostic`]s and the rest of the document still renders.

use serde::Serialize;
use std::fmt;

use super::ast::{Ast, AttrPath, FilterCall, Node, SourceLocation, Span};
use super::context::{DataContext, Scope};
use super::evaluator::evaluate;
use super::filters::FormatContext;
use super::value::{Resolved, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// An expression's path did not resolve and no `default` applied.
    UnresolvedPath,
    /// A filter rejected its input.
    FilterType,
    /// A `for` collection resolved to something other than a sequence.
    NotIterable,
    /// An expression resolved to an object, which has no text form.
    NotRenderable,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::UnresolvedPath => "unresolved path",
            DiagnosticKind::FilterType => "filter error",
            DiagnosticKind::NotIterable => "not iterable",
            DiagnosticKind::NotRenderable => "not renderable",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The attribute path involved, as written in the template.
    pub path: String,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl Diagnostic {
    /// Shift the position into a file whose template body begins at `origin`.
    pub fn relocate(&mut self, origin: SourceLocation) {
        let body = SourceLocation {
            offset: 0,
            line: self.line,
            column: self.column,
        };
        let file = body.within(origin);
        self.line = file.line;
        self.column = file.column;
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}: {}", self.line, self.column, self.kind, self.message)
    }
}

/// Rendered text plus everything that went wrong along the way.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RenderResult {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl RenderResult {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Render `ast` (parsed from `source`) against `context`.
pub fn render(ast: &Ast, source: &str, context: &DataContext, format: &FormatContext) -> RenderResult {
    let mut pass = RenderPass {
        source,
        format,
        scope: Scope::new(context),
        out: String::with_capacity(source.len()),
        diagnostics: Vec::new(),
    };
    pass.nodes(&ast.nodes);

    tracing::debug!(
        bytes = pass.out.len(),
        diagnostics = pass.diagnostics.len(),
        "rendered template"
    );

    RenderResult {
        text: pass.out,
        diagnostics: pass.diagnostics,
    }
}

struct RenderPass<'a, 's> {
    source: &'s str,
    format: &'s FormatContext,
    scope: Scope<'a>,
    out: String,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RenderPass<'a, '_> {
    fn nodes(&mut self, nodes: &'a [Node]) {
        for node in nodes {
            self.node(node);
        }
    }

    fn node(&mut self, node: &'a Node) {
        match node {
            Node::Text {
                raw,
                ..
            } => self.out.push_str(raw),
            Node::Expression {
                path,
                filters,
                span,
            } => self.expression(path, filters, *span),
            Node::Conditional {
                path,
                then_branch,
                else_branch,
                ..
            } => {
                if self.scope.resolve(path).is_truthy() {
                    self.nodes(then_branch);
                } else if let Some(else_branch) = else_branch {
                    self.nodes(else_branch);
                }
            }
            Node::Loop {
                collection,
                binding,
                body,
                span,
            } => match self.scope.lookup(collection) {
                None => {}
                Some(Value::Sequence(items)) => {
                    for item in items {
                        self.scope.push(binding, item);
                        self.nodes(body);
                        self.scope.pop();
                    }
                }
                Some(other) => self.diagnose(
                    DiagnosticKind::NotIterable,
                    collection,
                    *span,
                    format!("`{}` is a {}, not a sequence; loop skipped", collection, other.kind()),
                ),
            },
        }
    }

    fn expression(&mut self, path: &AttrPath, filters: &[FilterCall], span: Span) {
        let evaluation = evaluate(path, filters, &self.scope, self.format);

        if let Some(error) = evaluation.error {
            self.diagnose(DiagnosticKind::FilterType, path, span, error.to_string());
            return;
        }

        match evaluation.value {
            Resolved::Missing => self.diagnose(
                DiagnosticKind::UnresolvedPath,
                path,
                span,
                format!("`{}` did not resolve", path),
            ),
            Resolved::Present(value) => match value.as_ref() {
                Value::Scalar(scalar) => self.out.push_str(&scalar.to_string()),
                Value::Sequence(items) => match join_scalars(items) {
                    Some(joined) => self.out.push_str(&joined),
                    None => self.diagnose(
                        DiagnosticKind::NotRenderable,
                        path,
                        span,
                        format!("`{}` is a sequence of objects; iterate it with `for`", path),
                    ),
                },
                Value::Object(_) => self.diagnose(
                    DiagnosticKind::NotRenderable,
                    path,
                    span,
                    format!("`{}` is an object; select one of its fields", path),
                ),
            },
        }
    }

    fn diagnose(&mut self, kind: DiagnosticKind, path: &AttrPath, span: Span, message: String) {
        let SourceLocation {
            line,
            column,
            ..
        } = span.location(self.source);
        tracing::trace!(%kind, %path, line, column, "render diagnostic");
        self.diagnostics.push(Diagnostic {
            kind,
            path: path.to_string(),
            message,
            line,
            column,
        });
    }
}

fn join_scalars(items: &[Value]) -> Option<String> {
    let parts = items
        .iter()
        .filter(|item| !item.is_null())
        .map(|item| match item {
            Value::Scalar(scalar) => Some(scalar.to_string()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join(", "))
}
