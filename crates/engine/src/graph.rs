//! Dependency graph traversals over a sheet's cells.
//!
//! The graph is not a separate structure: it is the union of every cell's
//! edge sets.
//!
//! # Edge Direction
//!
//! ```text
//! forward:  A → B  means  "A's formula reads B"   (Cell::referenced_cells)
//! reverse:  B → A  means  "B is read by A"        (Cell::dependents)
//! ```
//!
//! Cycle detection and cache filling walk forward edges; cache invalidation
//! walks reverse edges. All three are iterative worklists with a visited set,
//! so they touch each position at most once and never recurse.

use std::collections::VecDeque;

use log::trace;
use rustc_hash::FxHashSet;

use crate::cell::CellKind;
use crate::position::Position;
use crate::sheet::Sheet;

impl Sheet {
    /// Would giving `pos` the forward edges `candidate_deps` close a cycle?
    ///
    /// Breadth-first over the *existing* forward edges, seeded with
    /// `candidate_deps`. Positions without a cell are dead ends.
    pub fn has_circular_dependency(&self, pos: Position, candidate_deps: &[Position]) -> bool {
        if candidate_deps.is_empty() {
            return false;
        }

        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut queue: VecDeque<Position> = VecDeque::new();
        for &dep in candidate_deps {
            if dep == pos {
                return true;
            }
            if visited.insert(dep) {
                queue.push_back(dep);
            }
        }

        while let Some(current) = queue.pop_front() {
            let Some(cell) = self.cells.get(&current) else {
                continue;
            };
            for &next in cell.referenced_cells() {
                if next == pos {
                    trace!("cycle: {} is reachable through {}", pos, current);
                    return true;
                }
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        false
    }

    /// Evaluate every uncached formula that `pos` transitively reads,
    /// dependencies first, then `pos` itself.
    ///
    /// Afterwards each formula on the way has its inputs cached, so evaluating
    /// it reads one level deep no matter how long the chain below is.
    pub(crate) fn fill_caches(&self, pos: Position) {
        let mut expanded: FxHashSet<Position> = FxHashSet::default();
        // (position, dependencies already pushed)
        let mut stack: Vec<(Position, bool)> = vec![(pos, false)];

        while let Some((current, ready)) = stack.pop() {
            let Some(cell) = self.cells.get(&current) else {
                continue;
            };
            if cell.kind() != CellKind::Formula || cell.has_cache() {
                continue;
            }
            if ready {
                cell.value(self);
                continue;
            }
            if !expanded.insert(current) {
                continue;
            }
            stack.push((current, true));
            for &dep in cell.referenced_cells() {
                if !expanded.contains(&dep) {
                    stack.push((dep, false));
                }
            }
        }
    }

    /// Drop the cached value of every cell that transitively depends on
    /// `pos`. Returns the number of caches actually dropped.
    ///
    /// `pos` itself is not touched. Reverse edges pointing at positions that
    /// no longer have a cell are skipped. A dependent that holds no cache is
    /// not walked past: whatever reads it cached nothing since it was last
    /// invalidated.
    pub(crate) fn invalidate_dependents(&mut self, pos: Position) -> usize {
        let Some(start) = self.cells.get(&pos) else {
            return 0;
        };

        let mut visited: FxHashSet<Position> = FxHashSet::default();
        visited.insert(pos);
        let mut worklist: Vec<Position> = start.dependents().iter().copied().collect();
        let mut dropped = 0;

        while let Some(current) = worklist.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(cell) = self.cells.get_mut(&current) else {
                continue;
            };
            if !cell.invalidate_cache() {
                continue;
            }
            dropped += 1;
            worklist.extend(
                cell.dependents()
                    .iter()
                    .copied()
                    .filter(|p| !visited.contains(p)),
            );
        }

        dropped
    }

    /// Remove `from` from the reverse set of each of `targets`.
    pub(crate) fn retract_edges(&mut self, from: Position, targets: &[Position]) {
        for target in targets {
            if let Some(cell) = self.cells.get_mut(target) {
                cell.dependents_mut().remove(&from);
            }
        }
    }

    /// Every position that transitively depends on `pos`, sorted.
    pub fn transitive_dependents(&self, pos: Position) -> Vec<Position> {
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        let mut worklist: Vec<Position> = match self.cells.get(&pos) {
            Some(cell) => cell.dependents().iter().copied().collect(),
            None => return Vec::new(),
        };
        while let Some(current) = worklist.pop() {
            if current == pos || !visited.insert(current) {
                continue;
            }
            if let Some(cell) = self.cells.get(&current) {
                worklist.extend(cell.dependents().iter().copied());
            }
        }
        let mut out: Vec<Position> = visited.into_iter().collect();
        out.sort();
        out
    }
}
