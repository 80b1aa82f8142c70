//! Expression evaluation: path resolution followed by the filter pipeline.

use super::ast::{AttrPath, FilterCall};
use super::context::Scope;
use super::error::FilterTypeError;
use super::filters::FormatContext;
use super::value::Resolved;

/// Outcome of evaluating one expression.
///
/// A filter type error stops the pipeline; `value` is then missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation<'a> {
    pub value: Resolved<'a>,
    pub error: Option<FilterTypeError>,
}

pub fn evaluate<'a>(
    path: &AttrPath,
    filters: &[FilterCall],
    scope: &Scope<'a>,
    format: &FormatContext,
) -> Evaluation<'a> {
    let resolved = scope.resolve(path);
    tracing::trace!(path = %path, missing = resolved.is_missing(), "resolved path");

    let piped = filters
        .iter()
        .try_fold(resolved, |value, call| call.filter.apply(value, &call.args, format));

    match piped {
        Ok(value) => Evaluation {
            value,
            error: None,
        },
        Err(error) => Evaluation {
            value: Resolved::Missing,
            error: Some(error),
        },
    }
}
