//! Tab-separated text rendering of the printable area.
//!
//! Rows are emitted top to bottom over `[0, printable_size)`, columns joined
//! by `\t`, each row terminated by `\n`. Absent and Empty cells render as
//! nothing. Error values render as their token (`#ARITHM!`, `#REF!`,
//! `#VALUE!`), which downstream tools may parse.

use std::io::{self, Write};

use crate::cell::Cell;
use crate::position::Position;
use crate::sheet::Sheet;

/// Write every cell's current value.
pub fn print_values<W: Write>(sheet: &Sheet, out: &mut W) -> io::Result<()> {
    print_grid(sheet, out, |cell| cell.value(sheet).to_string())
}

/// Write every cell's raw text.
pub fn print_texts<W: Write>(sheet: &Sheet, out: &mut W) -> io::Result<()> {
    print_grid(sheet, out, Cell::text)
}

pub fn values_to_string(sheet: &Sheet) -> String {
    let mut buf = Vec::new();
    // Writing to a Vec cannot fail
    let _ = print_values(sheet, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

pub fn texts_to_string(sheet: &Sheet) -> String {
    let mut buf = Vec::new();
    let _ = print_texts(sheet, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

fn print_grid<W, F>(sheet: &Sheet, out: &mut W, render: F) -> io::Result<()>
where
    W: Write,
    F: Fn(&Cell) -> String,
{
    let size = sheet.printable_size();
    for row in 0..size.rows {
        for col in 0..size.cols {
            if col > 0 {
                out.write_all(b"\t")?;
            }
            if let Some(cell) = sheet.cells.get(&Position::new(row, col)) {
                if !cell.is_empty() {
                    out.write_all(render(cell).as_bytes())?;
                }
            }
        }
        out.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(a1: &str) -> Position {
        Position::from_a1(a1).unwrap()
    }

    #[test]
    fn test_empty_sheet_renders_nothing() {
        let sheet = Sheet::new();
        assert_eq!(values_to_string(&sheet), "");
        assert_eq!(texts_to_string(&sheet), "");
    }

    #[test]
    fn test_values_and_texts() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=(1+2)*2").unwrap();
        sheet.set_cell(pos("B1"), "=1/0").unwrap();
        sheet.set_cell(pos("A2"), "'=quoted").unwrap();
        sheet.set_cell(pos("C2"), "=A1/4").unwrap();

        assert_eq!(values_to_string(&sheet), "6\t#ARITHM!\t\n=quoted\t\t1.5\n");
        assert_eq!(texts_to_string(&sheet), "=(1+2)*2\t=1/0\t\n'=quoted\t\t=A1/4\n");
    }

    #[test]
    fn test_placeholders_render_empty() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("B1"), "=A1+A2").unwrap();
        sheet.set_cell(pos("B2"), "x").unwrap();
        assert_eq!(values_to_string(&sheet), "\t0\n\tx\n");
    }

    #[test]
    fn test_error_tokens_rendered() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=ZZZZ1").unwrap();
        sheet.set_cell(pos("B1"), "word").unwrap();
        sheet.set_cell(pos("C1"), "=B1+1").unwrap();
        assert_eq!(values_to_string(&sheet), "#REF!\tword\t#VALUE!\n");
        assert_eq!(texts_to_string(&sheet), "=#REF!\tword\t=B1+1\n");
    }
}
