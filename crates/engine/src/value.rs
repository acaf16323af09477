//! Cell values and formula error categories.

use serde::{Deserialize, Serialize};

/// Category of a formula evaluation failure.
///
/// Formula errors are data: they are cached and displayed like any other
/// value, and never abort a sheet operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum FormulaError {
    /// Non-finite numeric result (division by zero, overflow).
    #[error("#ARITHM!")]
    Arithmetic,
    /// Reference to a cell outside the grid.
    #[error("#REF!")]
    Ref,
    /// Any other evaluation failure (e.g. text that is not a number).
    #[error("#VALUE!")]
    Value,
}

impl FormulaError {
    /// Display token, e.g. `#REF!`.
    pub fn token(&self) -> &'static str {
        match self {
            FormulaError::Arithmetic => "#ARITHM!",
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
        }
    }
}

/// What a cell shows: text, a number, or a formula error.
///
/// The default value is empty text, which is what Empty cells produce.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Text(String),
    Number(f64),
    Error(FormulaError),
}

impl Default for Value {
    fn default() -> Self {
        Value::Text(String::new())
    }
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<FormulaError> {
        match self {
            Value::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<FormulaError> for Value {
    fn from(e: FormulaError) -> Self {
        Value::Error(e)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Error(e) => f.write_str(e.token()),
        }
    }
}
