pub mod cell;
pub mod diagnostics;
pub mod error;
pub mod formula;
pub mod graph;
pub mod position;
pub mod render;
pub mod settings;
pub mod sheet;
pub mod value;

pub use cell::{Cell, CellContent, CellKind};
pub use error::{FormulaParseError, SheetError};
pub use position::{Position, Size};
pub use sheet::Sheet;
pub use value::{FormulaError, Value};
