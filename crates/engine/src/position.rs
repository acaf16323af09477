//! Grid coordinates.
//!
//! A `Position` addresses one cell of a sheet. Positions are plain values:
//! copyable, hashable and totally ordered (row-major), so they double as map
//! keys and graph nodes.

use serde::{Deserialize, Serialize};

/// Number of addressable rows in a sheet.
pub const MAX_ROWS: usize = 16384;
/// Number of addressable columns in a sheet.
pub const MAX_COLS: usize = 16384;

/// Zero-based cell coordinate.
///
/// Ordering is row-major: `(0, 5) < (1, 0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
}

impl Position {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// True if both coordinates lie in `[0, MAX)`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.row < MAX_ROWS && self.col < MAX_COLS
    }

    /// Parse A1 notation (`"A1"`, `"AB12"`).
    ///
    /// Only uppercase column letters are accepted. Returns `None` for malformed
    /// input and for references outside the grid.
    pub fn from_a1(s: &str) -> Option<Self> {
        let pos = parse_a1_unchecked(s)?;
        pos.is_valid().then_some(pos)
    }

    /// A1 rendering of this position, e.g. `B3`.
    pub fn to_a1(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", col_to_letters(self.col), self.row.saturating_add(1))
    }
}

/// Parse A1 notation without checking the grid bounds.
///
/// Coordinates that overflow `usize` saturate, so the result is still a
/// (necessarily invalid) position rather than a parse failure. The formula
/// parser relies on this to turn far-away references into `#REF!`.
pub(crate) fn parse_a1_unchecked(s: &str) -> Option<Position> {
    let letters = s.bytes().take_while(|b| b.is_ascii_uppercase()).count();
    if letters == 0 {
        return None;
    }
    let (col_str, row_str) = s.split_at(letters);
    if row_str.is_empty() || !row_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // A=1, ..., Z=26, AA=27 (bijective base 26)
    let col = col_str.bytes().fold(0usize, |acc, b| {
        acc.saturating_mul(26).saturating_add((b - b'A' + 1) as usize)
    });
    let row = row_str.bytes().fold(0usize, |acc, b| {
        acc.saturating_mul(10).saturating_add((b - b'0') as usize)
    });
    if row == 0 {
        return None;
    }

    Some(Position::new(row - 1, col - 1))
}

/// Convert 0-based column index to Excel-style letter(s).
fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Extent of a grid region, in rows and columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub rows: usize,
    pub cols: usize,
}

impl Size {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}
