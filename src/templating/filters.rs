//! The closed filter catalogue.
//!
//! Filters are looked up by name at parse time and dispatched by
//! [`FilterKind`]; there is no way for a template to reach anything outside
//! this table. Every filter is a pure function of its input, its literal
//! arguments, and the [`FormatContext`].
//!
//! | filter | args | behaviour |
//! |---|---|---|
//! | `default` | optional literal | substitute when missing or empty |
//! | `currency` | optional ISO code | two-decimal amount with symbol |
//! | `date` | optional pattern | format a date |
//! | `datetime` | pattern | format a date-time |
//!
//! Only `default` turns a missing value into a present one. The others pass
//! missing through so a later `default` can still act.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write as _;
use std::str::FromStr;

use super::ast::Literal;
use super::error::FilterTypeError;
use super::value::{Resolved, Scalar, Value};

/// Currency used by `currency` when no code is given.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Pattern used by `date` when no pattern is given.
pub const DEFAULT_DATE_FORMAT: &str = "%B %-d, %Y";

/// Formatting settings shared by every filter in a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatContext {
    pub default_currency: String,
    pub date_format: String,
}

impl Default for FormatContext {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

/// Declared type of a filter parameter, checked at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Any literal, string or number.
    Literal,
    /// Three uppercase ASCII letters.
    CurrencyCode,
    /// A strftime pattern accepted by chrono.
    DatePattern,
}

type ApplyFn =
    for<'a> fn(Resolved<'a>, &[Literal], &FormatContext) -> Result<Resolved<'a>, FilterTypeError>;

pub struct FilterSpec {
    pub kind: FilterKind,
    pub name: &'static str,
    pub params: &'static [ParamType],
    /// Number of leading parameters that must be supplied.
    pub required: usize,
    apply: ApplyFn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Default,
    Currency,
    Date,
    DateTime,
}

static REGISTRY: [FilterSpec; 4] = [
    FilterSpec {
        kind: FilterKind::Default,
        name: "default",
        params: &[ParamType::Literal],
        required: 0,
        apply: apply_default,
    },
    FilterSpec {
        kind: FilterKind::Currency,
        name: "currency",
        params: &[ParamType::CurrencyCode],
        required: 0,
        apply: apply_currency,
    },
    FilterSpec {
        kind: FilterKind::Date,
        name: "date",
        params: &[ParamType::DatePattern],
        required: 0,
        apply: apply_date,
    },
    FilterSpec {
        kind: FilterKind::DateTime,
        name: "datetime",
        params: &[ParamType::DatePattern],
        required: 1,
        apply: apply_datetime,
    },
];

impl FilterKind {
    pub fn lookup(name: &str) -> Option<FilterKind> {
        REGISTRY.iter().find(|spec| spec.name == name).map(|spec| spec.kind)
    }

    pub fn spec(self) -> &'static FilterSpec {
        match self {
            FilterKind::Default => &REGISTRY[0],
            FilterKind::Currency => &REGISTRY[1],
            FilterKind::Date => &REGISTRY[2],
            FilterKind::DateTime => &REGISTRY[3],
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn all() -> impl Iterator<Item = FilterKind> {
        REGISTRY.iter().map(|spec| spec.kind)
    }

    pub fn apply<'a>(
        self,
        input: Resolved<'a>,
        args: &[Literal],
        format: &FormatContext,
    ) -> Result<Resolved<'a>, FilterTypeError> {
        (self.spec().apply)(input, args, format)
    }
}

impl FilterSpec {
    /// Human-readable arity, e.g. "0 or 1 arguments".
    pub fn arity_description(&self) -> String {
        let max = self.params.len();
        match (self.required, max) {
            (min, max) if min == max && max == 1 => "exactly 1 argument".to_string(),
            (min, max) if min == max => format!("exactly {} arguments", max),
            (min, max) => format!("{} to {} arguments", min, max),
        }
    }

    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.required && count <= self.params.len()
    }

    /// Validate literal arguments against the declared parameter types.
    pub fn check_args(&self, args: &[Literal]) -> Result<(), String> {
        for (param, arg) in self.params.iter().zip(args) {
            match param {
                ParamType::Literal => {}
                ParamType::CurrencyCode => {
                    let code = arg
                        .as_str()
                        .ok_or_else(|| format!("currency code must be a string, got {}", arg))?;
                    if !is_currency_code(code) {
                        return Err(format!(
                            "'{}' is not a currency code (expected three uppercase letters)",
                            code
                        ));
                    }
                }
                ParamType::DatePattern => {
                    let pattern = arg
                        .as_str()
                        .ok_or_else(|| format!("date pattern must be a string, got {}", arg))?;
                    validate_pattern(pattern)?;
                }
            }
        }
        Ok(())
    }
}

pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

/// Reject strftime patterns chrono cannot format.
pub fn validate_pattern(pattern: &str) -> Result<(), String> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(format!("'{}' is not a valid date pattern", pattern));
    }
    Ok(())
}

fn apply_default<'a>(
    input: Resolved<'a>,
    args: &[Literal],
    _format: &FormatContext,
) -> Result<Resolved<'a>, FilterTypeError> {
    if !input.is_missing_or_empty() {
        return Ok(input);
    }
    let replacement = match args.first() {
        Some(Literal::Str(s)) => Value::text(s.clone()),
        Some(Literal::Number(n)) => Value::from_f64(*n).unwrap_or_else(|| Value::text(n.to_string())),
        None => Value::text(""),
    };
    Ok(Resolved::owned(replacement))
}

fn apply_currency<'a>(
    input: Resolved<'a>,
    args: &[Literal],
    format: &FormatContext,
) -> Result<Resolved<'a>, FilterTypeError> {
    const NAME: &str = "currency";

    if is_empty_text(&input) {
        return Ok(input);
    }
    let Some(value) = input.value() else {
        return Ok(Resolved::Missing);
    };
    let out_of_range = |n: &str| FilterTypeError::new(NAME, format!("{} is outside the supported amount range", n));
    let amount = match value {
        Value::Scalar(Scalar::Number(n)) => {
            let n = n.to_string();
            parse_decimal(&n).ok_or_else(|| out_of_range(n.as_str()))?
        }
        Value::Scalar(Scalar::Text(s)) => match parse_decimal(s.trim()) {
            Some(amount) => amount,
            // Numeric text too large for an exact decimal.
            None if s.trim().parse::<f64>().is_ok_and(f64::is_finite) => return Err(out_of_range(s.trim())),
            None => return Err(FilterTypeError::mismatch(NAME, "a number", value)),
        },
        other => return Err(FilterTypeError::mismatch(NAME, "a number", other)),
    };

    let code = args.first().and_then(Literal::as_str).unwrap_or(&format.default_currency);
    Ok(Resolved::owned(Value::text(format_currency(amount, code))))
}

fn is_empty_text(input: &Resolved<'_>) -> bool {
    matches!(input.value(), Some(Value::Scalar(Scalar::Text(s))) if s.is_empty())
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok()
}

fn currency_prefix(code: &str) -> String {
    match code {
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "JPY" => "¥".to_string(),
        "INR" => "₹".to_string(),
        other => format!("{} ", other),
    }
}

/// Format `amount` as `-$1,234.50`: rounded half away from zero to two
/// places, with thousands separators.
pub fn format_currency(amount: Decimal, code: &str) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    rounded.set_sign_positive(true);
    rounded.rescale(2);

    let digits = rounded.to_string();
    let (whole, fraction) = digits.split_once('.').unwrap_or((&digits, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!(
        "{}{}{}.{}",
        if negative {
            "-"
        } else {
            ""
        },
        currency_prefix(code),
        grouped,
        fraction
    )
}

/// Calendar value accepted by the date filters.
enum Temporal {
    Date(NaiveDate),
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

impl Temporal {
    fn from_value(value: &Value) -> Option<Temporal> {
        match value {
            Value::Scalar(Scalar::Date(d)) => Some(Temporal::Date(*d)),
            Value::Scalar(Scalar::DateTime(dt)) => Some(Temporal::Zoned(*dt)),
            Value::Scalar(Scalar::Text(s)) => Self::parse(s.trim()),
            _ => None,
        }
    }

    fn parse(s: &str) -> Option<Temporal> {
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(Temporal::Date(d));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Temporal::Zoned(dt));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
            .map(Temporal::Naive)
    }

    fn with_time(self) -> Temporal {
        match self {
            Temporal::Date(d) => Temporal::Naive(d.and_time(NaiveTime::default())),
            other => other,
        }
    }

    fn format(&self, pattern: &str) -> Option<String> {
        let mut out = String::new();
        let written = match self {
            Temporal::Date(d) => write!(out, "{}", d.format(pattern)),
            Temporal::Naive(dt) => write!(out, "{}", dt.format(pattern)),
            Temporal::Zoned(dt) => write!(out, "{}", dt.format(pattern)),
        };
        written.ok().map(|_| out)
    }
}

fn format_temporal<'a>(
    name: &'static str,
    input: Resolved<'a>,
    pattern: &str,
    needs_time: bool,
) -> Result<Resolved<'a>, FilterTypeError> {
    if is_empty_text(&input) {
        return Ok(input);
    }
    let Some(value) = input.value() else {
        return Ok(Resolved::Missing);
    };

    let expected = if needs_time {
        "a date-time"
    } else {
        "a date"
    };
    let temporal =
        Temporal::from_value(value).ok_or_else(|| FilterTypeError::mismatch(name, expected, value))?;
    let temporal = if needs_time {
        temporal.with_time()
    } else {
        temporal
    };

    temporal.format(pattern).map(|s| Resolved::owned(Value::text(s))).ok_or_else(|| {
        FilterTypeError::new(
            name,
            format!("pattern '{}' needs fields the {} value does not have", pattern, value.kind()),
        )
    })
}

fn apply_date<'a>(
    input: Resolved<'a>,
    args: &[Literal],
    format: &FormatContext,
) -> Result<Resolved<'a>, FilterTypeError> {
    let pattern = args.first().and_then(Literal::as_str).unwrap_or(&format.date_format);
    format_temporal("date", input, pattern, false)
}

fn apply_datetime<'a>(
    input: Resolved<'a>,
    args: &[Literal],
    format: &FormatContext,
) -> Result<Resolved<'a>, FilterTypeError> {
    let pattern = args.first().and_then(Literal::as_str).unwrap_or(&format.date_format);
    format_temporal("datetime", input, pattern, true)
}
