//! Grid coordinates and A1-style address strings.
//!
//! A [`Coord`] is always inside the grid limits of the output surface
//! (2^20 rows, 2^14 columns). Arithmetic that may leave the grid goes through
//! [`Coord::checked`], which the movement resolver uses after every cursor
//! transition.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of addressable rows (Excel limit).
pub const MAX_ROWS: u32 = 1 << 20;
/// Number of addressable columns (Excel limit).
pub const MAX_COLS: u16 = 1 << 14;

/// A zero-based (row, column) position on the grid.
///
/// Ordering is row-major: row first, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub row: u32,
    pub col: u16,
}

impl Coord {
    pub const ORIGIN: Coord = Coord { row: 0, col: 0 };

    pub const fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Build a coordinate from signed values, `None` if it falls off the grid.
    pub fn checked(row: i64, col: i64) -> Option<Self> {
        if !(0..i64::from(MAX_ROWS)).contains(&row) || !(0..i64::from(MAX_COLS)).contains(&col) {
            return None;
        }
        Some(Self {
            row: row as u32,
            col: col as u16,
        })
    }

    /// Whether this coordinate lies inside the grid limits.
    pub fn in_bounds(&self) -> bool {
        self.row < MAX_ROWS && self.col < MAX_COLS
    }

    /// Offset by a signed delta, `None` if the result leaves the grid.
    pub fn offset(&self, rows: i64, cols: i64) -> Option<Self> {
        Self::checked(i64::from(self.row) + rows, i64::from(self.col) + cols)
    }

    /// Relative A1 address, e.g. `B5`.
    pub fn a1(&self) -> String {
        format!("{}{}", col_to_letter(self.col), self.row + 1)
    }

    /// Absolute A1 address, e.g. `$B$5`.
    pub fn a1_abs(&self) -> String {
        format!("${}${}", col_to_letter(self.col), self.row + 1)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(u32, u16)> for Coord {
    fn from((row, col): (u32, u16)) -> Self {
        Self::new(row, col)
    }
}

/// Convert column index to Excel column letter (0 = A, 25 = Z, 26 = AA, etc.)
pub fn col_to_letter(col: u16) -> String {
    let mut result = String::new();
    let mut n = col as usize;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Absolute range address such as `$A$1:$C$4`.
///
/// A single-cell range collapses to the cell address (`$A$1`).
pub fn range_abs(first: Coord, last: Coord) -> String {
    if first == last {
        first.a1_abs()
    } else {
        format!("{}:{}", first.a1_abs(), last.a1_abs())
    }
}

/// Quote a sheet name for use inside a formula when it needs quoting.
///
/// Plain identifiers pass through; anything with spaces, punctuation or a
/// leading digit is wrapped in single quotes with embedded quotes doubled.
pub fn quote_sheet_name(name: &str) -> String {
    if name.starts_with('\'') && name.ends_with('\'') && name.len() > 1 {
        return name.to_string();
    }
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Sheet-qualified absolute range, e.g. `Sheet1!$A$1:$D$1`.
pub fn range_formula(sheet: &str, first: Coord, last: Coord) -> String {
    format!("{}!{}", quote_sheet_name(sheet), range_abs(first, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_to_letter() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(701), "ZZ");
        assert_eq!(col_to_letter(702), "AAA");
        assert_eq!(col_to_letter(MAX_COLS - 1), "XFD");
    }

    #[test]
    fn test_checked_bounds() {
        assert_eq!(Coord::checked(0, 0), Some(Coord::ORIGIN));
        assert_eq!(Coord::checked(-1, 0), None);
        assert_eq!(Coord::checked(0, -1), None);
        assert_eq!(Coord::checked(i64::from(MAX_ROWS), 0), None);
        assert_eq!(Coord::checked(0, i64::from(MAX_COLS)), None);
        assert_eq!(
            Coord::checked(i64::from(MAX_ROWS) - 1, i64::from(MAX_COLS) - 1),
            Some(Coord::new(MAX_ROWS - 1, MAX_COLS - 1))
        );
    }

    #[test]
    fn test_row_major_ordering() {
        let mut coords = vec![Coord::new(1, 0), Coord::new(0, 5), Coord::new(0, 1)];
        coords.sort();
        assert_eq!(coords, vec![Coord::new(0, 1), Coord::new(0, 5), Coord::new(1, 0)]);
    }

    #[test]
    fn test_addresses() {
        assert_eq!(Coord::new(4, 1).a1(), "B5");
        assert_eq!(Coord::new(4, 1).a1_abs(), "$B$5");
        assert_eq!(range_abs(Coord::new(0, 0), Coord::new(0, 2)), "$A$1:$C$1");
        assert_eq!(range_abs(Coord::new(3, 3), Coord::new(3, 3)), "$D$4");
    }

    #[test]
    fn test_range_formula_quoting() {
        assert_eq!(
            range_formula("TestSheet", Coord::new(0, 0), Coord::new(0, 3)),
            "TestSheet!$A$1:$D$1"
        );
        assert_eq!(
            range_formula("My Sheet", Coord::new(0, 0), Coord::new(10, 10)),
            "'My Sheet'!$A$1:$K$11"
        );
        assert_eq!(quote_sheet_name("O'Brien"), "'O''Brien'");
        assert_eq!(quote_sheet_name("2024"), "'2024'");
        assert_eq!(quote_sheet_name("'Already'"), "'Already'");
    }

    #[test]
    fn test_display() {
        assert_eq!(Coord::new(0, 1).to_string(), "(0, 1)");
    }
}
