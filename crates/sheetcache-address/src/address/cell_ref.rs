//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between A1-style cell labels
//! (e.g., "A1", "B2", "AA100") and zero-indexed row/column coordinates.
//!
//! Labels are accepted case-insensitively but always printed in canonical
//! form (uppercase letters, row number without leading zeros), so
//! `CellRef::parse(label)?.to_string() == label` holds for every canonical label.
//!
//! # Examples
//!
//! ```
//! use sheetcache_address::CellRef;
//!
//! let cell = CellRef::parse("B3").unwrap();
//! assert_eq!(cell.col, 1);  // 0-indexed
//! assert_eq!(cell.row, 2);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use super::AddressError;

/// A reference to a cell by row and column indices (0-indexed).
///
/// Ordering is row-major, which is the order cells are batched and persisted in.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell label in A1 notation (e.g., "A1", "b2", "AA10").
    pub fn parse(label: &str) -> Result<CellRef, AddressError> {
        parse_a1(label).ok_or_else(|| AddressError::InvalidLabel(label.to_string()))
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }

    /// Convert spreadsheet-style letters to a column index (A -> 0, AA -> 26).
    /// Returns None for empty input, non-letters, or a column past `usize::MAX`.
    pub fn letters_to_col(letters: &str) -> Option<usize> {
        if letters.is_empty() {
            return None;
        }
        // Widened so the letters for `usize::MAX` (one past it, 1-based) still fit.
        let mut col_acc = 0u128;
        for c in letters.bytes() {
            if !c.is_ascii_alphabetic() {
                return None;
            }
            let digit = u128::from(c.to_ascii_uppercase() - b'A') + 1;
            col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
        }
        usize::try_from(col_acc - 1).ok()
    }
}

fn a1_re() -> &'static Regex {
    static A1_RE: OnceLock<Regex> = OnceLock::new();
    A1_RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[1-9][0-9]*)$")
            .expect("A1 label regex must compile")
    })
}

fn parse_a1(label: &str) -> Option<CellRef> {
    let caps = a1_re().captures(label)?;
    let col = CellRef::letters_to_col(&caps["letters"])?;
    let row = parse_row_number(&caps["numbers"])?;
    Some(CellRef::new(row, col))
}

/// Parse a row number as written in a label ("1" -> 0). Leading zeros are rejected.
pub(crate) fn parse_row_number(digits: &str) -> Option<usize> {
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    usize::try_from(digits.parse::<u128>().ok()? - 1).ok()
}

impl std::str::FromStr for CellRef {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellRef::parse(s)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row as u128 + 1)
    }
}
