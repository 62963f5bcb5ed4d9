//! Facet expression mini-language.
//!
//! An expression starts from `value` (the target column's cell value) and
//! chains zero or more transforms: `value.trim().to_lowercase()`. Evaluation
//! never panics; bad input yields `EvalValue::Error`, which facets track in
//! their own error bucket.

use std::fmt;

use gridworks_model::CellValue;

/// Result of evaluating an expression over one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Blank,
    Value(CellValue),
    Error(String),
}

impl EvalValue {
    pub fn from_cell(value: &CellValue) -> Self {
        if value.is_blank() {
            EvalValue::Blank
        } else {
            EvalValue::Value(value.clone())
        }
    }
}

/// Recoverable expression parse failure, surfaced as a per-facet error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transform {
    Trim,
    ToLowercase,
    ToUppercase,
    Length,
    ToNumber,
}

impl Transform {
    fn parse(name: &str) -> Result<Transform, ParseError> {
        match name {
            "trim" => Ok(Transform::Trim),
            "to_lowercase" => Ok(Transform::ToLowercase),
            "to_uppercase" => Ok(Transform::ToUppercase),
            "length" => Ok(Transform::Length),
            "to_number" => Ok(Transform::ToNumber),
            other => Err(ParseError(format!("unknown function: {other}()"))),
        }
    }
}

/// A parsed facet expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    transforms: Vec<Transform>,
}

impl Expression {
    /// Parse `value` optionally followed by `.name()` transform calls.
    pub fn parse(source: &str) -> Result<Expression, ParseError> {
        let source = source.trim();
        let mut parts = source.split('.');
        match parts.next() {
            Some("value") => {}
            Some(other) => {
                return Err(ParseError(format!(
                    "expression must start with 'value', found '{other}'"
                )))
            }
            None => return Err(ParseError("empty expression".into())),
        }

        let mut transforms = Vec::new();
        for part in parts {
            let name = part
                .strip_suffix("()")
                .ok_or_else(|| ParseError(format!("expected a call, found '{part}'")))?;
            transforms.push(Transform::parse(name)?);
        }
        Ok(Expression { transforms })
    }

    /// Evaluate over a cell value. Blank propagates through string
    /// transforms untouched.
    pub fn evaluate(&self, value: &CellValue) -> EvalValue {
        let mut current = EvalValue::from_cell(value);
        for transform in &self.transforms {
            current = match current {
                EvalValue::Blank => EvalValue::Blank,
                EvalValue::Error(_) => return current,
                EvalValue::Value(v) => apply(*transform, v),
            };
        }
        current
    }
}

fn apply(transform: Transform, value: CellValue) -> EvalValue {
    match transform {
        Transform::Trim => {
            let s = value.display();
            let trimmed = s.trim();
            if trimmed.is_empty() {
                EvalValue::Blank
            } else {
                EvalValue::Value(CellValue::Text(trimmed.to_string()))
            }
        }
        Transform::ToLowercase => EvalValue::Value(CellValue::Text(value.display().to_lowercase())),
        Transform::ToUppercase => EvalValue::Value(CellValue::Text(value.display().to_uppercase())),
        Transform::Length => {
            EvalValue::Value(CellValue::Number(value.display().chars().count() as f64))
        }
        Transform::ToNumber => match &value {
            CellValue::Number(_) => EvalValue::Value(value),
            CellValue::Boolean(b) => EvalValue::Value(CellValue::Number(if *b {
                1.0
            } else {
                0.0
            })),
            CellValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => EvalValue::Value(CellValue::Number(n)),
                _ => EvalValue::Error(format!("cannot parse '{s}' as a number")),
            },
            CellValue::Date(d) => EvalValue::Error(format!("cannot convert date {d} to a number")),
            CellValue::Blank => EvalValue::Blank,
        },
    }
}
