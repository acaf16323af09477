// Sheet settings
// Stored as JSON, e.g. sheet.json next to the host application's data

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::position::{Position, MAX_COLS, MAX_ROWS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSettings {
    /// Rows addressable in this sheet (clamped to `MAX_ROWS`)
    pub max_rows: usize,

    /// Columns addressable in this sheet (clamped to `MAX_COLS`)
    pub max_cols: usize,

    /// Remove `pos` from the reverse set of cells its formula no longer
    /// references. When false, stale reverse edges are kept and only cause
    /// extra invalidation.
    pub retract_stale_edges: bool,
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self {
            max_rows: MAX_ROWS,
            max_cols: MAX_COLS,
            retract_stale_edges: true,
        }
    }
}

impl SheetSettings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from a JSON file. Missing or malformed files fall back to defaults.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Ignoring malformed sheet settings {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }
        let contents = self
            .to_json()
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(path, contents).map_err(|e| format!("Failed to write settings: {}", e))
    }

    /// Effective row limit.
    pub fn row_limit(&self) -> usize {
        self.max_rows.min(MAX_ROWS)
    }

    /// Effective column limit.
    pub fn col_limit(&self) -> usize {
        self.max_cols.min(MAX_COLS)
    }

    /// True if `pos` is a valid grid position within the configured limits.
    pub fn accepts(&self, pos: Position) -> bool {
        pos.is_valid() && pos.row < self.row_limit() && pos.col < self.col_limit()
    }
}
