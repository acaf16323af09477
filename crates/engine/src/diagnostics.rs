//! Structured dump of a sheet's cells and dependency edges.
//!
//! Building a report never evaluates anything: it shows cached values as
//! they are, so inspecting a sheet does not change which caches are warm.
//! The caller picks the sink (`Display` for humans, `to_json` for tools).

use serde::Serialize;

use crate::cell::CellKind;
use crate::position::{Position, Size};
use crate::sheet::Sheet;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellDiagnostic {
    pub position: Position,
    /// A1 rendering of `position`.
    pub address: String,
    pub kind: CellKind,
    pub text: String,
    /// Memoized value, if any.
    pub cached: Option<Value>,
    /// Cells this cell's formula reads.
    pub depends_on: Vec<Position>,
    /// Cells whose formulas read this cell.
    pub depended_by: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetDiagnostics {
    pub printable_size: Size,
    pub evaluations: u64,
    /// Sorted by position.
    pub cells: Vec<CellDiagnostic>,
}

impl Sheet {
    pub fn diagnostics(&self) -> SheetDiagnostics {
        let mut cells: Vec<CellDiagnostic> = self
            .cells()
            .map(|(position, cell)| CellDiagnostic {
                position,
                address: position.to_a1(),
                kind: cell.kind(),
                text: cell.text(),
                cached: cell.cached_value(),
                depends_on: cell.referenced_cells().to_vec(),
                depended_by: cell.dependents().iter().copied().collect(),
            })
            .collect();
        cells.sort_by_key(|c| c.position);

        SheetDiagnostics {
            printable_size: self.printable_size(),
            evaluations: self.evaluation_count(),
            cells,
        }
    }
}

impl SheetDiagnostics {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn join(positions: &[Position]) -> String {
    if positions.is_empty() {
        return "none".to_string();
    }
    positions
        .iter()
        .map(|p| p.to_a1())
        .collect::<Vec<_>>()
        .join(", ")
}

impl std::fmt::Display for CellDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            CellKind::Empty => "empty",
            CellKind::Text => "text",
            CellKind::Formula => "formula",
        };
        write!(f, "{} [{}]", self.address, kind)?;
        if !self.text.is_empty() {
            write!(f, " {:?}", self.text)?;
        }
        match &self.cached {
            Some(value) => write!(f, " cache={}", value)?,
            None => write!(f, " cache=none")?,
        }
        write!(
            f,
            " depends_on=[{}] depended_by=[{}]",
            join(&self.depends_on),
            join(&self.depended_by)
        )
    }
}

impl std::fmt::Display for SheetDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} cells, printable {}x{}, {} evaluations",
            self.cells.len(),
            self.printable_size.rows,
            self.printable_size.cols,
            self.evaluations
        )?;
        for cell in &self.cells {
            writeln!(f, "  {}", cell)?;
        }
        Ok(())
    }
}
