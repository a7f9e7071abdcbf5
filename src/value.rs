//! Runtime values for filter evaluation.
//!
//! Every literal in a filter expression and every resolved property is a
//! [`Value`]. The model is deliberately small: strings, numbers, booleans,
//! date-times and null, plus one extra state for the raw EXIF dictionary.
//!
//! ## Untyped raw values
//!
//! Tags in `exif.raw` are stored upstream as plain strings with no declared
//! type. A `Rating` of `"5"` should compare as a number against `4`, while a
//! `Copyright` of `"Jane Doe"` should compare as text against a string
//! literal. [`Value::Untyped`] carries the raw string until the comparison
//! site decides what it should be, via [`Value::coerce`]. A failed coercion
//! produces [`Value::Null`], so an unparsable rating simply doesn't match.

use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::fmt;

/// A typed value produced by a literal, a property lookup or a function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// A raw EXIF dictionary string, typed on demand at the comparison site.
    Untyped(String),
    Null,
}

/// The kind of a [`Value`], used in type-mismatch diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Number,
    Bool,
    DateTime,
    Untyped,
    Null,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Bool => "boolean",
            ValueKind::DateTime => "date",
            ValueKind::Untyped => "raw value",
            ValueKind::Null => "null",
        };
        f.write_str(name)
    }
}

/// Date-time layouts accepted for string literals and raw EXIF values.
///
/// The last one is the native EXIF `DateTimeOriginal` layout.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y:%m:%d %H:%M:%S",
];

/// Parse a date or date-time string. Date-only input means midnight.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a decimal number. Rejects NaN and infinities.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Number(_) => ValueKind::Number,
            Value::Bool(_) => ValueKind::Bool,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Untyped(_) => ValueKind::Untyped,
            Value::Null => ValueKind::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text content of string-like values (`String` and `Untyped`).
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Untyped(s) => Some(s),
            _ => None,
        }
    }

    /// Convert an untyped raw value into `target`, or `Null` if it doesn't parse.
    ///
    /// Typed values are returned unchanged: only raw strings are coerced.
    pub fn coerce(self, target: ValueKind) -> Value {
        let raw = match self {
            Value::Untyped(raw) => raw,
            typed => return typed,
        };
        match target {
            ValueKind::String => Value::String(raw),
            ValueKind::Number => parse_number(&raw).map_or(Value::Null, Value::Number),
            ValueKind::Bool => parse_bool(&raw).map_or(Value::Null, Value::Bool),
            ValueKind::DateTime => parse_date(&raw).map_or(Value::Null, Value::DateTime),
            ValueKind::Untyped | ValueKind::Null => Value::Untyped(raw),
        }
    }

    /// Normalize a value for use as a sort key.
    ///
    /// Raw values that look numeric sort numerically (`"10"` after `"9"`);
    /// anything else sorts as text.
    pub fn into_sort_key(self) -> Value {
        match self {
            Value::Untyped(raw) => match parse_number(&raw) {
                Some(n) => Value::Number(n),
                None => Value::String(raw),
            },
            other => other,
        }
    }

    /// Group of a sort key; keys in different groups never compare by value.
    pub(crate) fn sort_rank(&self) -> u8 {
        match self {
            Value::DateTime(_) => 0,
            Value::Number(_) => 1,
            Value::String(_) | Value::Untyped(_) => 2,
            Value::Bool(_) => 3,
            Value::Null => 4,
        }
    }

    /// Total order over sort keys.
    ///
    /// Values of the same kind compare naturally (strings ordinally, numbers
    /// with [`f64::total_cmp`]). Values of different kinds, which happens when
    /// some images fall back to a differently-typed field, are grouped by kind:
    /// dates, then numbers, then text, then booleans.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (a, b) => match (a.as_text(), b.as_text()) {
                (Some(x), Some(y)) => x.cmp(y),
                _ => a.sort_rank().cmp(&b.sort_rank()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::Untyped(s) => write!(f, "'{s}'"),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::DateTime(d) => write!(f, "{}", d.format("%Y-%m-%dT%H:%M:%S")),
            Value::Null => f.write_str("null"),
        }
    }
}
