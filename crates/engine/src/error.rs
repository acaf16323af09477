//! Structural errors.
//!
//! These reject an operation outright and leave the sheet untouched. They are
//! distinct from [`FormulaError`](crate::value::FormulaError), which is a
//! cell value.

use crate::position::Position;

/// A formula that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse formula `{formula}`: {message}")]
pub struct FormulaParseError {
    /// Formula text without the leading `=`.
    pub formula: String,
    pub message: String,
}

impl FormulaParseError {
    pub fn new(formula: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            message: message.into(),
        }
    }
}

/// Error returned by mutating and addressing sheet operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SheetError {
    #[error("position ({}, {}) is outside the sheet", .0.row, .0.col)]
    InvalidPosition(Position),

    #[error("circular dependency: {position} would depend on itself")]
    CircularDependency { position: Position },

    #[error(transparent)]
    Parse(#[from] FormulaParseError),
}

impl SheetError {
    /// Stable machine-readable code, e.g. for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            SheetError::InvalidPosition(_) => "invalid_position",
            SheetError::CircularDependency { .. } => "circular_dependency",
            SheetError::Parse(_) => "formula_parse_error",
        }
    }
}
