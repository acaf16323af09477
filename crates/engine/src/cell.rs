use std::cell::RefCell;
use std::collections::BTreeSet;

use log::trace;

use crate::error::FormulaParseError;
use crate::formula::{self, CellLookup, Formula};
use crate::position::Position;
use crate::value::Value;

/// Marks the rest of a text cell as literal, e.g. `'=1+2`.
pub const ESCAPE_SIGN: char = '\'';
/// Leading character of formula input.
pub const FORMULA_SIGN: char = '=';

/// What the user put into a cell.
#[derive(Debug, Clone, Default)]
pub enum CellContent {
    #[default]
    Empty,
    /// Literal text as entered, escape sign included.
    Text(String),
    Formula(Formula),
}

/// Content kind without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Empty,
    Text,
    Formula,
}

impl CellContent {
    /// Classify raw input.
    ///
    /// - `""` is Empty
    /// - `"="` alone is Text
    /// - `=...` is a Formula (may fail to parse)
    /// - anything else is Text
    pub fn from_input(input: &str) -> Result<Self, FormulaParseError> {
        if input.is_empty() {
            return Ok(CellContent::Empty);
        }
        match input.strip_prefix(FORMULA_SIGN) {
            Some(expression) if !expression.is_empty() => {
                Ok(CellContent::Formula(formula::parse_formula(expression)?))
            }
            _ => Ok(CellContent::Text(input.to_string())),
        }
    }

    pub fn kind(&self) -> CellKind {
        match self {
            CellContent::Empty => CellKind::Empty,
            CellContent::Text(_) => CellKind::Text,
            CellContent::Formula(_) => CellKind::Formula,
        }
    }
}

/// A single cell: content, memoized value, and both directions of its
/// dependency edges.
///
/// The cell owns its forward edges (rebuilt from content on every `set`).
/// The reverse set is maintained by the owning sheet; the cell never edits it.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    content: CellContent,
    /// Cells this cell's formula reads, first-seen order.
    forward_deps: Vec<Position>,
    /// Cells whose formulas read this cell.
    reverse_deps: BTreeSet<Position>,
    cache: RefCell<Option<Value>>,
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace content from raw input.
    ///
    /// On parse failure the cell is left exactly as it was.
    pub fn set(&mut self, input: &str) -> Result<(), FormulaParseError> {
        let content = CellContent::from_input(input)?;
        self.forward_deps = match &content {
            CellContent::Formula(f) => f.referenced_cells().to_vec(),
            _ => Vec::new(),
        };
        self.content = content;
        self.cache.get_mut().take();
        Ok(())
    }

    /// Revert to Empty. Reverse edges are kept.
    pub fn clear(&mut self) {
        self.content = CellContent::Empty;
        self.forward_deps.clear();
        self.cache.get_mut().take();
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    pub fn kind(&self) -> CellKind {
        self.content.kind()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    /// Current value, evaluating and caching on a miss.
    pub fn value<L: CellLookup + ?Sized>(&self, lookup: &L) -> Value {
        if let Some(cached) = self.cache.borrow().as_ref() {
            trace!("cache hit");
            return cached.clone();
        }

        let value = match &self.content {
            CellContent::Empty => Value::default(),
            CellContent::Text(text) => {
                Value::Text(text.strip_prefix(ESCAPE_SIGN).unwrap_or(text).to_string())
            }
            CellContent::Formula(f) => {
                lookup.evaluation_performed();
                match f.evaluate(lookup) {
                    Ok(n) => Value::Number(n),
                    Err(e) => Value::Error(e),
                }
            }
        };

        *self.cache.borrow_mut() = Some(value.clone());
        value
    }

    /// Raw text: literal for Text (escape included), `=` + canonical
    /// expression for Formula, empty for Empty. Never evaluates.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(text) => text.clone(),
            CellContent::Formula(f) => format!("{}{}", FORMULA_SIGN, f.expression()),
        }
    }

    /// Positions this cell's formula references (empty unless Formula).
    pub fn referenced_cells(&self) -> &[Position] {
        &self.forward_deps
    }

    /// Positions whose formulas reference this cell.
    pub fn dependents(&self) -> &BTreeSet<Position> {
        &self.reverse_deps
    }

    pub fn is_referenced(&self) -> bool {
        !self.reverse_deps.is_empty()
    }

    pub(crate) fn dependents_mut(&mut self) -> &mut BTreeSet<Position> {
        &mut self.reverse_deps
    }

    pub fn has_cache(&self) -> bool {
        self.cache.borrow().is_some()
    }

    pub(crate) fn cached_value(&self) -> Option<Value> {
        self.cache.borrow().as_ref().cloned()
    }

    /// Drop the memoized value. Returns true if there was one.
    pub(crate) fn invalidate_cache(&mut self) -> bool {
        self.cache.get_mut().take().is_some()
    }
}
