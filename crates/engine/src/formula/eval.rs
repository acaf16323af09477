// Formula evaluator - evaluates a parsed AST against a cell lookup

use super::parser::{Expr, Op, UnaryOp};
use crate::position::Position;
use crate::value::{FormulaError, Value};

/// Read access to other cells' current values during evaluation.
///
/// Implementors are expected to evaluate (and cache) the referenced cell on
/// demand, so that a lookup always reflects current sheet state.
pub trait CellLookup {
    /// Value of the cell at `pos`, or `None` if no cell exists there.
    fn value_at(&self, pos: Position) -> Option<Value>;

    /// Called once per formula evaluation actually performed (cache misses
    /// only). Default does nothing.
    fn evaluation_performed(&self) {}
}

/// Evaluate an expression to a finite number or a formula error.
pub fn evaluate<L: CellLookup + ?Sized>(expr: &Expr, lookup: &L) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(n) => finite(*n),
        Expr::CellRef(pos) => {
            if !pos.is_valid() {
                return Err(FormulaError::Ref);
            }
            match lookup.value_at(*pos) {
                None => Ok(0.0),
                Some(value) => to_number(&value),
            }
        }
        Expr::Unary { op, operand } => {
            let v = evaluate(operand, lookup)?;
            Ok(match op {
                UnaryOp::Plus => v,
                UnaryOp::Minus => -v,
            })
        }
        Expr::BinaryOp { op, left, right } => {
            let left_val = evaluate(left, lookup)?;
            let right_val = evaluate(right, lookup)?;
            let result = match op {
                Op::Add => left_val + right_val,
                Op::Sub => left_val - right_val,
                Op::Mul => left_val * right_val,
                Op::Div => left_val / right_val,
            };
            finite(result)
        }
    }
}

fn finite(n: f64) -> Result<f64, FormulaError> {
    if n.is_finite() {
        Ok(n)
    } else {
        Err(FormulaError::Arithmetic)
    }
}

/// Numeric view of a referenced cell's value.
///
/// Empty text is zero; other text must parse as a whole as a finite number.
/// Errors propagate with their category intact.
fn to_number(value: &Value) -> Result<f64, FormulaError> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Text(s) if s.is_empty() => Ok(0.0),
        Value::Text(s) => match s.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(n),
            _ => Err(FormulaError::Value),
        },
        Value::Error(e) => Err(*e),
    }
}
