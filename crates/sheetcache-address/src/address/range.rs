//! Range parsing.
//!
//! Handles bounded rectangles (`A1:B5`), single cells (`A1`), and the
//! open-ended forms the remote API also accepts:
//! - whole columns: `A:C`
//! - whole rows: `2:5`
//! - half-open: `A2:C` (from row 2 down to the last row)
//!
//! Open bounds are resolved against a sheet extent with [`GridRange::resolve`].

use super::cell_ref::{CellRef, parse_row_number};
use super::AddressError;

/// A rectangular range with inclusive, 0-based bounds.
/// `None` means the side is open: start bounds default to 0, end bounds to the sheet extent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridRange {
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
    pub start_col: Option<usize>,
    pub end_col: Option<usize>,
}

/// One side of a range: optional column letters followed by an optional row number.
fn parse_endpoint(part: &str) -> Option<(Option<usize>, Option<usize>)> {
    let split = part
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(part.len());
    let (letters, digits) = part.split_at(split);
    if letters.is_empty() && digits.is_empty() {
        return None;
    }

    let col = if letters.is_empty() {
        None
    } else {
        Some(CellRef::letters_to_col(letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        Some(parse_row_number(digits)?)
    };
    Some((col, row))
}

fn invalid(range: &str, reason: &str) -> AddressError {
    AddressError::InvalidRange {
        range: range.to_string(),
        reason: reason.to_string(),
    }
}

impl GridRange {
    /// Parse a range label in any supported form.
    pub fn parse(range: &str) -> Result<GridRange, AddressError> {
        let parts: Vec<&str> = range.split(':').collect();
        let (start, end) = match parts.as_slice() {
            [single] => {
                let cell = CellRef::parse(single).map_err(|_| invalid(range, "malformed cell"))?;
                return Ok(GridRange::from_cells(cell, cell));
            }
            [start, end] => (*start, *end),
            _ => return Err(invalid(range, "expected START:END")),
        };

        let (start_col, start_row) =
            parse_endpoint(start).ok_or_else(|| invalid(range, "malformed start"))?;
        let (end_col, end_row) =
            parse_endpoint(end).ok_or_else(|| invalid(range, "malformed end"))?;

        if let (Some(s), Some(e)) = (start_row, end_row)
            && s > e
        {
            return Err(invalid(range, "rows are inverted"));
        }
        if let (Some(s), Some(e)) = (start_col, end_col)
            && s > e
        {
            return Err(invalid(range, "columns are inverted"));
        }

        Ok(GridRange {
            start_row,
            end_row,
            start_col,
            end_col,
        })
    }

    pub fn from_cells(top_left: CellRef, bottom_right: CellRef) -> GridRange {
        GridRange {
            start_row: Some(top_left.row),
            end_row: Some(bottom_right.row),
            start_col: Some(top_left.col),
            end_col: Some(bottom_right.col),
        }
    }

    /// Both corners, if every side is bounded.
    pub fn bounded(&self) -> Option<(CellRef, CellRef)> {
        Some((
            CellRef::new(self.start_row?, self.start_col?),
            CellRef::new(self.end_row?, self.end_col?),
        ))
    }

    /// Resolve open sides against a sheet extent of `rows` x `cols` cells.
    /// Returns None when the resolved range is empty.
    pub fn resolve(&self, rows: usize, cols: usize) -> Option<(CellRef, CellRef)> {
        let start_row = self.start_row.unwrap_or(0);
        let start_col = self.start_col.unwrap_or(0);
        let end_row = match self.end_row {
            Some(r) => r,
            None => rows.checked_sub(1)?,
        };
        let end_col = match self.end_col {
            Some(c) => c,
            None => cols.checked_sub(1)?,
        };
        if start_row > end_row || start_col > end_col {
            return None;
        }
        Some((
            CellRef::new(start_row, start_col),
            CellRef::new(end_row, end_col),
        ))
    }
}

/// Parse a bounded range like "A1:B5" and return its (top-left, bottom-right) corners.
/// A single cell "A1" is the degenerate range "A1:A1".
pub fn parse_range(range: &str) -> Result<(CellRef, CellRef), AddressError> {
    GridRange::parse(range)?
        .bounded()
        .ok_or_else(|| invalid(range, "range must be bounded on every side"))
}
