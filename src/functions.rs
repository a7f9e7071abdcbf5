//! Built-in functions callable from filter expressions.
//!
//! The table is fixed: there are no user-defined functions. Names and
//! arities are checked when the filter is parsed, so `yaer(dateTaken)` is a
//! parse error. Argument kinds are checked at evaluation time.
//!
//! | Function | Arguments | Result | Null input |
//! |----------|-----------|--------|------------|
//! | `year`, `month`, `day` | date | number | null |
//! | `contains`, `starts_with`, `ends_with` | string, string | boolean | false |
//! | `lower`, `upper` | string | string | null |
//!
//! String functions are ordinal: no locale-sensitive comparison or folding,
//! so a build produces the same galleries on every machine.

use crate::eval::EvalError;
use crate::value::{Value, ValueKind, parse_date};
use chrono::Datelike;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Year,
    Month,
    Day,
    Contains,
    StartsWith,
    EndsWith,
    Lower,
    Upper,
}

impl Function {
    pub const ALL: [Function; 8] = [
        Function::Year,
        Function::Month,
        Function::Day,
        Function::Contains,
        Function::StartsWith,
        Function::EndsWith,
        Function::Lower,
        Function::Upper,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Year => "year",
            Function::Month => "month",
            Function::Day => "day",
            Function::Contains => "contains",
            Function::StartsWith => "starts_with",
            Function::EndsWith => "ends_with",
            Function::Lower => "lower",
            Function::Upper => "upper",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Function::Contains | Function::StartsWith | Function::EndsWith => 2,
            _ => 1,
        }
    }

    /// Invoke the function on already-evaluated arguments.
    pub fn call(self, args: &[Value]) -> Result<Value, EvalError> {
        if args.len() != self.arity() {
            return Err(self.error(format!(
                "expected {} argument(s), found {}",
                self.arity(),
                args.len()
            )));
        }
        match self {
            Function::Year => self.date_part(&args[0], |d| d.year() as f64),
            Function::Month => self.date_part(&args[0], |d| f64::from(d.month())),
            Function::Day => self.date_part(&args[0], |d| f64::from(d.day())),
            Function::Contains => self.text_test(args, |s, p| s.contains(p)),
            Function::StartsWith => self.text_test(args, |s, p| s.starts_with(p)),
            Function::EndsWith => self.text_test(args, |s, p| s.ends_with(p)),
            Function::Lower => self.text_map(&args[0], str::to_lowercase),
            Function::Upper => self.text_map(&args[0], str::to_uppercase),
        }
    }

    fn error(self, message: String) -> EvalError {
        EvalError::FunctionArgument {
            function: self.name(),
            message,
        }
    }

    fn mismatch(self, position: usize, expected: &str, found: ValueKind) -> EvalError {
        self.error(format!(
            "argument {position} must be a {expected}, found {found}"
        ))
    }

    fn date_part(
        self,
        arg: &Value,
        part: impl Fn(&chrono::NaiveDateTime) -> f64,
    ) -> Result<Value, EvalError> {
        match arg {
            Value::Null => Ok(Value::Null),
            Value::DateTime(d) => Ok(Value::Number(part(d))),
            // Raw EXIF dates that don't parse are absent, like any failed coercion
            Value::Untyped(raw) => {
                Ok(parse_date(raw).map_or(Value::Null, |d| Value::Number(part(&d))))
            }
            Value::String(s) => parse_date(s)
                .map(|d| Value::Number(part(&d)))
                .ok_or_else(|| self.error(format!("cannot interpret '{s}' as a date"))),
            other => Err(self.mismatch(1, "date", other.kind())),
        }
    }

    fn text_test(
        self,
        args: &[Value],
        test: impl Fn(&str, &str) -> bool,
    ) -> Result<Value, EvalError> {
        let needle = args[1]
            .as_text()
            .ok_or_else(|| self.mismatch(2, "string", args[1].kind()))?;
        match &args[0] {
            Value::Null => Ok(Value::Bool(false)),
            haystack => haystack
                .as_text()
                .map(|s| Value::Bool(test(s, needle)))
                .ok_or_else(|| self.mismatch(1, "string", haystack.kind())),
        }
    }

    fn text_map(self, arg: &Value, map: impl Fn(&str) -> String) -> Result<Value, EvalError> {
        match arg {
            Value::Null => Ok(Value::Null),
            other => other
                .as_text()
                .map(|s| Value::String(map(s)))
                .ok_or_else(|| self.mismatch(1, "string", other.kind())),
        }
    }
}
