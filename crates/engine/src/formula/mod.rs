// Formula parsing and evaluation

pub mod eval;
pub mod parser;

use crate::error::FormulaParseError;
use crate::position::Position;
use crate::value::FormulaError;

pub use eval::CellLookup;

/// A parsed formula, owned by the cell that holds it.
#[derive(Debug, Clone)]
pub struct Formula {
    ast: parser::Expr,
    /// Canonical text, without the leading `=`.
    expression: String,
    /// Valid referenced positions, de-duplicated, first-seen order.
    referenced: Vec<Position>,
}

/// Parse formula text (the part after `=`).
pub fn parse_formula(expression: &str) -> Result<Formula, FormulaParseError> {
    let ast = parser::parse(expression)?;

    let mut expression = String::new();
    ast.write_canonical(&mut expression);

    let mut refs = Vec::new();
    ast.collect_refs(&mut refs);
    let mut referenced: Vec<Position> = Vec::with_capacity(refs.len());
    for pos in refs {
        if pos.is_valid() && !referenced.contains(&pos) {
            referenced.push(pos);
        }
    }

    Ok(Formula {
        ast,
        expression,
        referenced,
    })
}

impl Formula {
    pub fn evaluate<L: CellLookup + ?Sized>(&self, lookup: &L) -> Result<f64, FormulaError> {
        eval::evaluate(&self.ast, lookup)
    }

    pub fn referenced_cells(&self) -> &[Position] {
        &self.referenced
    }

    /// Canonical expression text, without the leading `=`.
    pub fn expression(&self) -> &str {
        &self.expression
    }
}
