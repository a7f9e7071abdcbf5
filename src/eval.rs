//! Predicate evaluation against image records.
//!
//! ## Comparison semantics
//!
//! - `==` and `!=` work on any two values of the same kind, and between any
//!   value and `null`.
//! - `<`, `<=`, `>`, `>=` need two numbers or two dates. Against `null` they
//!   are simply false, so `exif.iso >= 800` skips photos with no ISO instead
//!   of failing the build.
//! - Any other pairing (`exif.make > 5`) is a type mismatch error.
//! - Raw EXIF values take the type of the other operand (see
//!   [`Value::coerce`]); a string literal compared with a date is read as a
//!   date (`dateTaken >= '2024-01-01'`).
//!
//! ## Failure policy
//!
//! [`filter`] evaluates every record. One evaluation error aborts the whole
//! gallery: a typo in a filter should fail loudly, not quietly drop photos.
//! Records are evaluated in parallel with rayon; the reported error is the
//! one for the earliest failing record in pool order, so diagnostics are
//! stable from run to run.

use crate::ast::{CompareOp, CompiledFilter, LogicalOp, Node, PipeStage};
use crate::record::ImageRecord;
use crate::resolve::{Property, resolve};
use crate::value::{Value, ValueKind, parse_date, parse_number};
use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Unknown property '{path}': '{root}' is not an image field or 'exif'")]
    UnknownRoot { root: String, path: String },
    #[error("Unknown property '{path}': there is no EXIF field '{field}'")]
    UnknownExifField { field: String, path: String },
    #[error("Unknown property '{path}': '{field}' has no sub-fields")]
    NotAnObject { field: String, path: String },
    #[error("Incomplete property path '{0}'")]
    IncompletePath(String),
    #[error("Type mismatch: cannot compare {left} {op} {right}")]
    TypeMismatch {
        op: CompareOp,
        left: ValueKind,
        right: ValueKind,
    },
    #[error("Cannot interpret '{0}' as a date")]
    InvalidDate(String),
    #[error("{context} expects a boolean, found {found}")]
    ExpectedBoolean {
        context: &'static str,
        found: ValueKind,
    },
    #[error("{function}(): {message}")]
    FunctionArgument {
        function: &'static str,
        message: String,
    },
    #[error("{source} (image '{filename}')")]
    InRecord {
        filename: String,
        source: Box<EvalError>,
    },
}

impl EvalError {
    fn in_record(self, record: &ImageRecord) -> Self {
        EvalError::InRecord {
            filename: record.filename.clone(),
            source: Box::new(self),
        }
    }
}

/// Evaluate `predicate` against one record.
pub fn evaluate(predicate: &Node, record: &ImageRecord) -> Result<bool, EvalError> {
    expect_bool(eval_node(predicate, record)?, "filter")
}

/// Keep the records of `pool` that satisfy `predicate`, in pool order.
pub fn filter<'a>(
    predicate: &Node,
    pool: &'a [ImageRecord],
) -> Result<Vec<&'a ImageRecord>, EvalError> {
    let outcomes: Vec<Result<bool, EvalError>> = pool
        .par_iter()
        .map(|record| evaluate(predicate, record))
        .collect();

    let mut matched = Vec::new();
    for (record, outcome) in pool.iter().zip(outcomes) {
        match outcome {
            Ok(true) => matched.push(record),
            Ok(false) => {}
            Err(e) => return Err(e.in_record(record)),
        }
    }
    Ok(matched)
}

/// Check that every property path in a compiled filter names a real field.
///
/// Catches `bogus.field == 1` even when the pool is empty or every image
/// would short-circuit past the bad reference.
pub fn check_properties(filter: &CompiledFilter) -> Result<(), EvalError> {
    let mut first_error = None;
    filter.predicate.for_each_property(&mut |path| {
        if first_error.is_none() {
            first_error = Property::parse(path).err();
        }
    });
    if let Some(e) = first_error {
        return Err(e);
    }
    for stage in &filter.pipeline {
        if let PipeStage::Sort { field, .. } = stage {
            Property::parse(field)?;
        }
    }
    Ok(())
}

fn expect_bool(value: Value, context: &'static str) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::ExpectedBoolean {
            context,
            found: other.kind(),
        }),
    }
}

fn eval_node(node: &Node, record: &ImageRecord) -> Result<Value, EvalError> {
    match node {
        Node::All => Ok(Value::Bool(true)),
        Node::Literal(v) => Ok(v.clone()),
        Node::Property(path) => resolve(path, record),
        Node::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| eval_node(arg, record))
                .collect::<Result<Vec<_>, _>>()?;
            function.call(&values)
        }
        Node::Not(inner) => Ok(Value::Bool(!expect_bool(eval_node(inner, record)?, "'not'")?)),
        Node::Compare { op, left, right } => {
            let left = eval_node(left, record)?;
            let right = eval_node(right, record)?;
            compare(*op, left, right).map(Value::Bool)
        }
        Node::Logical { op, left, right } => {
            let context = match op {
                LogicalOp::And => "'and'",
                LogicalOp::Or => "'or'",
            };
            let left = expect_bool(eval_node(left, record)?, context)?;
            match (op, left) {
                (LogicalOp::And, false) => Ok(Value::Bool(false)),
                (LogicalOp::Or, true) => Ok(Value::Bool(true)),
                _ => expect_bool(eval_node(right, record)?, context).map(Value::Bool),
            }
        }
    }
}

fn date_literal(text: String) -> Result<Value, EvalError> {
    parse_date(&text)
        .map(Value::DateTime)
        .ok_or(EvalError::InvalidDate(text))
}

/// Bring both operands to comparable kinds.
fn unify(left: Value, right: Value) -> Result<(Value, Value), EvalError> {
    Ok(match (left, right) {
        (Value::Untyped(a), Value::Untyped(b)) => {
            match (parse_number(&a), parse_number(&b)) {
                (Some(x), Some(y)) => (Value::Number(x), Value::Number(y)),
                _ => (Value::String(a), Value::String(b)),
            }
        }
        (raw @ Value::Untyped(_), other) => {
            let kind = other.kind();
            (raw.coerce(kind), other)
        }
        (other, raw @ Value::Untyped(_)) => {
            let kind = other.kind();
            (other, raw.coerce(kind))
        }
        (Value::String(s), date @ Value::DateTime(_)) => (date_literal(s)?, date),
        (date @ Value::DateTime(_), Value::String(s)) => (date, date_literal(s)?),
        pair => pair,
    })
}

fn compare(op: CompareOp, left: Value, right: Value) -> Result<bool, EvalError> {
    let (left, right) = unify(left, right)?;
    match (&left, &right) {
        (Value::Null, _) | (_, Value::Null) => {
            let both_null = left.is_null() && right.is_null();
            Ok(match op {
                CompareOp::Eq => both_null,
                CompareOp::Ne => !both_null,
                // ordering against a missing value never matches
                _ => false,
            })
        }
        (Value::Number(a), Value::Number(b)) => Ok(op.test(a.partial_cmp(b))),
        (Value::DateTime(a), Value::DateTime(b)) => Ok(op.test(Some(a.cmp(b)))),
        (Value::String(a), Value::String(b)) if !op.is_ordering() => {
            Ok(op.test(Some(a.cmp(b))))
        }
        (Value::Bool(a), Value::Bool(b)) if !op.is_ordering() => Ok(op.test(Some(a.cmp(b)))),
        _ => Err(EvalError::TypeMismatch {
            op,
            left: left.kind(),
            right: right.kind(),
        }),
    }
}
