//! Data context and scope chain used during rendering.
//!
//! A [`DataContext`] holds one bound record plus the render timestamp that
//! backs the reserved `_today` variable. It is never mutated by rendering.
//! Loop bindings live in a [`Scope`] layered on top of it; the innermost
//! binding shadows outer bindings, `_today` and record attributes of the
//! same name.

use chrono::{DateTime, FixedOffset, Local};

use super::ast::AttrPath;
use super::value::{Resolved, Value};

/// Name of the reserved render-timestamp variable.
pub const TODAY: &str = "_today";

#[derive(Debug, Clone, PartialEq)]
pub struct DataContext {
    record: Value,
    today: Value,
}

impl DataContext {
    /// Bind `record` with an explicit render timestamp.
    pub fn new(record: Value, today: DateTime<FixedOffset>) -> Self {
        Self {
            record,
            today: Value::from(today),
        }
    }

    pub fn from_json(record: serde_json::Value, today: DateTime<FixedOffset>) -> Self {
        Self::new(Value::from(record), today)
    }

    /// Bind `record`, capturing the current local time as `_today`.
    pub fn now(record: Value) -> Self {
        Self::new(record, Local::now().fixed_offset())
    }

    pub fn record(&self) -> &Value {
        &self.record
    }

    pub fn today(&self) -> &Value {
        &self.today
    }
}

/// Name resolution chain for one render pass.
#[derive(Debug)]
pub struct Scope<'a> {
    context: &'a DataContext,
    bindings: Vec<(&'a str, &'a Value)>,
}

impl<'a> Scope<'a> {
    pub fn new(context: &'a DataContext) -> Self {
        Self {
            context,
            bindings: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &'a str, value: &'a Value) {
        self.bindings.push((name, value));
    }

    pub fn pop(&mut self) {
        self.bindings.pop();
    }

    pub fn depth(&self) -> usize {
        self.bindings.len()
    }

    fn root(&self, name: &str) -> Option<&'a Value> {
        if let Some((_, value)) = self.bindings.iter().rev().find(|(bound, _)| *bound == name) {
            return Some(*value).filter(|v| !v.is_null());
        }
        if name == TODAY {
            return Some(&self.context.today);
        }
        match &self.context.record {
            Value::Object(fields) => fields.get(name).filter(|v| !v.is_null()),
            _ => None,
        }
    }

    pub fn lookup(&self, path: &AttrPath) -> Option<&'a Value> {
        self.root(path.head()).and_then(|root| root.lookup(path.tail()))
    }

    /// Resolve `path`; any absent step yields [`Resolved::Missing`].
    pub fn resolve(&self, path: &AttrPath) -> Resolved<'a> {
        self.lookup(path).map(Resolved::borrowed).unwrap_or(Resolved::Missing)
    }
}
