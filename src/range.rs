//! A1-style range addressing for the tabular store.
//!
//! Ranges are kept 0-based internally and rendered in the familiar spreadsheet
//! notation (`A1:ZZ`, `B2:B10`, `A5:5`) when displayed. Either end of a range may
//! leave its row or column open, which means "to the end of the sheet".

use std::fmt;

/// Last column index the wide tables are addressed with (`ZZ`).
pub const WIDE_LAST_COLUMN: usize = 701;

/// Last column index used when reading fixed-schema tables (`Z`).
pub const NARROW_LAST_COLUMN: usize = 25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: Option<usize>,
    pub end_col: Option<usize>,
}

impl Range {
    /// Every row of columns `first..=last`, e.g. `A1:ZZ`.
    pub fn columns(first: usize, last: usize) -> Self {
        Range {
            start_row: 0,
            start_col: first,
            end_row: None,
            end_col: Some(last),
        }
    }

    /// Rows from `first_row` downwards, columns `A..=last_col`, e.g. `A2:E`.
    pub fn rows_from(first_row: usize, last_col: usize) -> Self {
        Range {
            start_row: first_row,
            start_col: 0,
            end_row: None,
            end_col: Some(last_col),
        }
    }

    /// A single sheet row, starting at column A and open to the right.
    pub fn row(row: usize) -> Self {
        Range {
            start_row: row,
            start_col: 0,
            end_row: Some(row),
            end_col: None,
        }
    }

    /// A block anchored at `(row, A)` with no bounds, used for multi-row rewrites.
    pub fn anchor(row: usize) -> Self {
        Range {
            start_row: row,
            start_col: 0,
            end_row: None,
            end_col: None,
        }
    }

    /// One column between two sheet rows (inclusive).
    pub fn column_segment(col: usize, first_row: usize, last_row: usize) -> Self {
        Range {
            start_row: first_row,
            start_col: col,
            end_row: Some(last_row),
            end_col: Some(col),
        }
    }

    /// Fully bounded block, e.g. `A1:Z1000`.
    pub fn block(first_row: usize, first_col: usize, last_row: usize, last_col: usize) -> Self {
        Range {
            start_row: first_row,
            start_col: first_col,
            end_row: Some(last_row),
            end_col: Some(last_col),
        }
    }

    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.start_row && self.end_row.is_none_or(|end| row <= end)
    }

    pub fn contains_col(&self, col: usize) -> bool {
        col >= self.start_col && self.end_col.is_none_or(|end| col <= end)
    }
}

/// Convert a 0-based column index to its letter name (0 = A, 26 = AA).
pub fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut name = String::new();

    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    name
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.start_col), self.start_row + 1)?;

        match (self.end_col, self.end_row) {
            (None, None) => Ok(()),
            (Some(col), Some(row)) => write!(f, ":{}{}", column_name(col), row + 1),
            (Some(col), None) => write!(f, ":{}", column_name(col)),
            (None, Some(row)) => write!(f, ":{}", row + 1),
        }
    }
}
