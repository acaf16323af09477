use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::cell::Cell;
use crate::error::SheetError;
use crate::formula::CellLookup;
use crate::position::{Position, Size};
use crate::settings::SheetSettings;
use crate::value::Value;

/// A grid of cells with a dependency graph and memoized values.
///
/// Every mutation either commits completely or returns an error with the
/// sheet unchanged. The dependency graph lives in the cells themselves
/// (forward and reverse edge sets); see `graph.rs` for the traversals.
///
/// Not thread-safe: reads memoize through interior mutability, so a host
/// sharing a sheet across threads must wrap it in its own lock.
#[derive(Debug, Default)]
pub struct Sheet {
    pub(crate) cells: FxHashMap<Position, Cell>,
    /// Bottom-right corner of the non-empty area; `None` if there is none.
    print_bounds: Option<Position>,
    pub(crate) settings: SheetSettings,
    /// Formula evaluations performed (cache misses).
    evaluations: std::cell::Cell<u64>,
}

impl CellLookup for Sheet {
    fn value_at(&self, pos: Position) -> Option<Value> {
        self.fill_caches(pos);
        self.cells.get(&pos).map(|cell| cell.value(self))
    }

    fn evaluation_performed(&self) {
        self.evaluations.set(self.evaluations.get() + 1);
    }
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SheetSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &SheetSettings {
        &self.settings
    }

    fn check_position(&self, pos: Position, op: &str) -> Result<(), SheetError> {
        if self.settings.accepts(pos) {
            Ok(())
        } else {
            warn!("{}: rejected invalid position ({}, {})", op, pos.row, pos.col);
            Err(SheetError::InvalidPosition(pos))
        }
    }

    /// Set a cell from raw input (text, `=formula`, or `""` for Empty).
    ///
    /// Fails without touching the sheet if the position is invalid, the
    /// formula does not parse, or the formula would close a cycle.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        self.check_position(pos, "set_cell")?;

        // Build the replacement off to the side first.
        let mut candidate = Cell::new();
        if let Err(e) = candidate.set(text) {
            warn!("set_cell {}: {}", pos, e);
            return Err(e.into());
        }

        if self.has_circular_dependency(pos, candidate.referenced_cells()) {
            warn!("set_cell {}: rejected circular formula {:?}", pos, text);
            return Err(SheetError::CircularDependency { position: pos });
        }

        // Dependents of this position survive a content change.
        let (old_deps, dependents, was_empty) = match self.cells.remove(&pos) {
            Some(mut old) => (
                old.referenced_cells().to_vec(),
                std::mem::take(old.dependents_mut()),
                old.is_empty(),
            ),
            None => (Vec::new(), Default::default(), true),
        };
        *candidate.dependents_mut() = dependents;

        let new_deps = candidate.referenced_cells().to_vec();
        let kind = candidate.kind();
        let is_empty = candidate.is_empty();
        self.cells.insert(pos, candidate);

        if self.settings.retract_stale_edges {
            let dropped: Vec<Position> = old_deps
                .into_iter()
                .filter(|d| !new_deps.contains(d))
                .collect();
            self.retract_edges(pos, &dropped);
        }

        for dep in &new_deps {
            self.cells.entry(*dep).or_default().dependents_mut().insert(pos);
        }

        let invalidated = self.invalidate_dependents(pos);

        if !is_empty {
            self.extend_print_bounds(pos);
        } else if !was_empty && self.on_print_boundary(pos) {
            self.recompute_print_bounds();
        }

        debug!(
            "set_cell {} ({:?}, {} refs), {} cached values invalidated",
            pos,
            kind,
            new_deps.len(),
            invalidated
        );
        Ok(())
    }

    /// Clear a cell.
    ///
    /// Dependents are invalidated first. The entry is removed from the sheet
    /// unless other formulas still reference it, in which case it stays as an
    /// Empty placeholder holding their reverse edges.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        self.check_position(pos, "clear_cell")?;

        if !self.cells.contains_key(&pos) {
            return Ok(());
        }

        let invalidated = self.invalidate_dependents(pos);

        let Some(mut cell) = self.cells.remove(&pos) else {
            return Ok(());
        };
        if self.settings.retract_stale_edges {
            let deps = cell.referenced_cells().to_vec();
            self.retract_edges(pos, &deps);
        }
        let kept_as_placeholder = cell.is_referenced();
        if kept_as_placeholder {
            cell.clear();
            self.cells.insert(pos, cell);
        }

        self.recompute_print_bounds();

        debug!(
            "clear_cell {} ({}), {} cached values invalidated",
            pos,
            if kept_as_placeholder { "placeholder kept" } else { "removed" },
            invalidated
        );
        Ok(())
    }

    /// The cell at `pos`, including Empty placeholders; `None` if absent.
    pub fn cell(&self, pos: Position) -> Result<Option<&Cell>, SheetError> {
        self.check_position(pos, "cell")?;
        Ok(self.cells.get(&pos))
    }

    /// Current value at `pos`; absent cells yield the default empty value.
    pub fn value(&self, pos: Position) -> Result<Value, SheetError> {
        self.check_position(pos, "value")?;
        Ok(self.value_at(pos).unwrap_or_default())
    }

    /// Raw text at `pos`; absent cells yield `""`.
    pub fn text(&self, pos: Position) -> Result<String, SheetError> {
        Ok(self.cell(pos)?.map(Cell::text).unwrap_or_default())
    }

    /// True if an entry (possibly an Empty placeholder) exists at `pos`.
    pub fn contains(&self, pos: Position) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Number of cell entries, placeholders included.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All entries, in no particular order.
    pub fn cells(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    /// Smallest size covering every non-empty cell, `{0, 0}` if none.
    pub fn printable_size(&self) -> Size {
        match self.print_bounds {
            Some(corner) => Size::new(corner.row + 1, corner.col + 1),
            None => Size::default(),
        }
    }

    /// Formula evaluations performed so far (cache misses only).
    pub fn evaluation_count(&self) -> u64 {
        self.evaluations.get()
    }

    fn extend_print_bounds(&mut self, pos: Position) {
        self.print_bounds = Some(match self.print_bounds {
            Some(corner) => Position::new(corner.row.max(pos.row), corner.col.max(pos.col)),
            None => pos,
        });
    }

    fn on_print_boundary(&self, pos: Position) -> bool {
        self.print_bounds
            .is_some_and(|corner| corner.row == pos.row || corner.col == pos.col)
    }

    fn recompute_print_bounds(&mut self) {
        self.print_bounds = self
            .cells
            .iter()
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(pos, _)| *pos)
            .fold(None, |bounds: Option<Position>, pos| {
                Some(match bounds {
                    Some(corner) => {
                        Position::new(corner.row.max(pos.row), corner.col.max(pos.col))
                    }
                    None => pos,
                })
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellKind;
    use crate::value::FormulaError;

    fn pos(a1: &str) -> Position {
        Position::from_a1(a1).unwrap()
    }

    fn num(sheet: &Sheet, a1: &str) -> f64 {
        sheet.value(pos(a1)).unwrap().as_number().unwrap()
    }

    #[test]
    fn test_never_set_position_is_absent() {
        let sheet = Sheet::new();
        assert!(sheet.cell(pos("C3")).unwrap().is_none());
        assert_eq!(sheet.value(pos("C3")).unwrap(), Value::default());
        assert_eq!(sheet.text(pos("C3")).unwrap(), "");
    }

    #[test]
    fn test_invalid_position_rejected() {
        let mut sheet = Sheet::new();
        let bad = Position::new(crate::position::MAX_ROWS, 0);
        assert_eq!(sheet.set_cell(bad, "x"), Err(SheetError::InvalidPosition(bad)));
        assert_eq!(sheet.clear_cell(bad), Err(SheetError::InvalidPosition(bad)));
        assert!(sheet.cell(bad).is_err());
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_settings_limit_positions() {
        let mut sheet = Sheet::with_settings(SheetSettings {
            max_rows: 10,
            max_cols: 10,
            ..SheetSettings::default()
        });
        assert!(sheet.set_cell(Position::new(9, 9), "ok").is_ok());
        assert!(matches!(
            sheet.set_cell(Position::new(10, 0), "no"),
            Err(SheetError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_formula_reads_other_cell() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1+1").unwrap();
        sheet.set_cell(pos("B1"), "=5").unwrap();
        assert_eq!(num(&sheet, "A1"), 6.0);

        sheet.set_cell(pos("B1"), "=10").unwrap();
        assert_eq!(num(&sheet, "A1"), 11.0);
    }

    #[test]
    fn test_referenced_position_gets_placeholder() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B2").unwrap();
        let placeholder = sheet.cell(pos("B2")).unwrap().unwrap();
        assert_eq!(placeholder.kind(), CellKind::Empty);
        assert!(placeholder.dependents().contains(&pos("A1")));
        // Placeholders are not part of the printable area
        assert_eq!(sheet.printable_size(), Size::new(1, 1));
    }

    #[test]
    fn test_self_reference_rejected() {
        let mut sheet = Sheet::new();
        assert_eq!(
            sheet.set_cell(pos("A1"), "=A1"),
            Err(SheetError::CircularDependency { position: pos("A1") })
        );
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_indirect_cycle_rejected_and_old_cell_kept() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.set_cell(pos("B1"), "=C1").unwrap();
        sheet.set_cell(pos("C1"), "7").unwrap();

        let err = sheet.set_cell(pos("C1"), "=A1*2").unwrap_err();
        assert_eq!(err, SheetError::CircularDependency { position: pos("C1") });
        assert_eq!(sheet.text(pos("C1")).unwrap(), "7");
        assert_eq!(num(&sheet, "A1"), 7.0);
        assert!(!sheet.contains(pos("A2")));
    }

    #[test]
    fn test_parse_error_leaves_sheet_untouched() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "keep").unwrap();
        let err = sheet.set_cell(pos("A1"), "=1+").unwrap_err();
        assert!(matches!(err, SheetError::Parse(_)));
        assert_eq!(sheet.text(pos("A1")).unwrap(), "keep");
    }

    #[test]
    fn test_reverse_edges_survive_replacement() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1*2").unwrap();
        sheet.set_cell(pos("B1"), "1").unwrap();
        assert_eq!(num(&sheet, "A1"), 2.0);

        // Replacing B1 (text -> formula -> text) must keep A1 wired to it.
        sheet.set_cell(pos("B1"), "=3").unwrap();
        assert_eq!(num(&sheet, "A1"), 6.0);
        sheet.set_cell(pos("B1"), "4").unwrap();
        assert_eq!(num(&sheet, "A1"), 8.0);
    }

    #[test]
    fn test_transitive_invalidation() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "1").unwrap();
        sheet.set_cell(pos("A2"), "=A1+1").unwrap();
        sheet.set_cell(pos("A3"), "=A2+1").unwrap();
        sheet.set_cell(pos("A4"), "=A3+A2").unwrap();
        assert_eq!(num(&sheet, "A4"), 5.0);

        sheet.set_cell(pos("A1"), "10").unwrap();
        assert_eq!(num(&sheet, "A4"), 23.0);
    }

    #[test]
    fn test_stale_edge_retracted() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.set_cell(pos("A1"), "=C1").unwrap();
        let b1 = sheet.cell(pos("B1")).unwrap().unwrap();
        assert!(!b1.dependents().contains(&pos("A1")));
        let c1 = sheet.cell(pos("C1")).unwrap().unwrap();
        assert!(c1.dependents().contains(&pos("A1")));
    }

    #[test]
    fn test_stale_edge_kept_when_retraction_disabled() {
        let mut sheet = Sheet::with_settings(SheetSettings {
            retract_stale_edges: false,
            ..SheetSettings::default()
        });
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.set_cell(pos("A1"), "=C1").unwrap();
        let b1 = sheet.cell(pos("B1")).unwrap().unwrap();
        assert!(b1.dependents().contains(&pos("A1")));
        // Values stay correct, the stale edge only over-invalidates.
        sheet.set_cell(pos("C1"), "3").unwrap();
        assert_eq!(num(&sheet, "A1"), 3.0);
    }

    #[test]
    fn test_set_empty_keeps_placeholder_with_dependents() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.set_cell(pos("B1"), "5").unwrap();
        assert_eq!(num(&sheet, "A1"), 5.0);

        sheet.set_cell(pos("B1"), "").unwrap();
        let b1 = sheet.cell(pos("B1")).unwrap().unwrap();
        assert!(b1.is_empty());
        assert!(b1.dependents().contains(&pos("A1")));
        assert_eq!(num(&sheet, "A1"), 0.0);
    }

    #[test]
    fn test_clear_cell_invalidates_dependents() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1+1").unwrap();
        sheet.set_cell(pos("B1"), "41").unwrap();
        assert_eq!(num(&sheet, "A1"), 42.0);

        sheet.clear_cell(pos("B1")).unwrap();
        assert_eq!(num(&sheet, "A1"), 1.0);

        // The edge survives the clear, so setting B1 again is seen by A1.
        sheet.set_cell(pos("B1"), "9").unwrap();
        assert_eq!(num(&sheet, "A1"), 10.0);
    }

    #[test]
    fn test_clear_unreferenced_cell_removes_entry() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.clear_cell(pos("A1")).unwrap();
        assert!(!sheet.contains(pos("A1")));
        // A1's edge into B1 was retracted along with it.
        assert!(!sheet.cell(pos("B1")).unwrap().unwrap().is_referenced());
    }

    #[test]
    fn test_clear_missing_cell_is_noop() {
        let mut sheet = Sheet::new();
        assert!(sheet.clear_cell(pos("Z9")).is_ok());
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_printable_size() {
        let mut sheet = Sheet::new();
        assert_eq!(sheet.printable_size(), Size::new(0, 0));

        sheet.set_cell(pos("B2"), "x").unwrap();
        assert_eq!(sheet.printable_size(), Size::new(2, 2));
        sheet.set_cell(pos("D1"), "y").unwrap();
        assert_eq!(sheet.printable_size(), Size::new(2, 4));

        sheet.clear_cell(pos("D1")).unwrap();
        assert_eq!(sheet.printable_size(), Size::new(2, 2));
        sheet.clear_cell(pos("B2")).unwrap();
        assert_eq!(sheet.printable_size(), Size::new(0, 0));
    }

    #[test]
    fn test_printable_size_shrinks_when_boundary_set_empty() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "x").unwrap();
        sheet.set_cell(pos("C3"), "y").unwrap();
        sheet.set_cell(pos("C3"), "").unwrap();
        assert_eq!(sheet.printable_size(), Size::new(1, 1));
    }

    #[test]
    fn test_value_read_is_memoized() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1+C1").unwrap();
        sheet.set_cell(pos("B1"), "=2").unwrap();
        sheet.set_cell(pos("C1"), "3").unwrap();

        let first = sheet.value(pos("A1")).unwrap();
        let after_first = sheet.evaluation_count();
        assert_eq!(after_first, 2); // A1 and B1
        let second = sheet.value(pos("A1")).unwrap();
        assert_eq!(first, second);
        assert_eq!(sheet.evaluation_count(), after_first);
    }

    #[test]
    fn test_error_values_cached_and_propagated() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=1/0").unwrap();
        sheet.set_cell(pos("A2"), "=A1+1").unwrap();
        sheet.set_cell(pos("A3"), "text").unwrap();
        sheet.set_cell(pos("A4"), "=A3*2").unwrap();
        assert_eq!(sheet.value(pos("A2")).unwrap(), Value::Error(FormulaError::Arithmetic));
        assert_eq!(sheet.value(pos("A4")).unwrap(), Value::Error(FormulaError::Value));

        sheet.set_cell(pos("A1"), "=4").unwrap();
        assert_eq!(num(&sheet, "A2"), 5.0);
    }
}
