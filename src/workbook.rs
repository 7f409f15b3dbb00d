//! In-memory workbook: named sheets of string rows, with the range semantics the
//! ledgers expect from a spreadsheet backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::range::{NARROW_LAST_COLUMN, Range, WIDE_LAST_COLUMN};
use crate::store::StoreError;

pub type Row = Vec<String>;

pub const MEMBERS_SHEET: &str = "Members";
pub const DONATIONS_SHEET: &str = "Donations";
pub const ATTENDANCE_SHEET: &str = "Attendance";
pub const EXPENSES_SHEET: &str = "Expenses";
pub const USER_STATUS_SHEET: &str = "UserStatus";
pub const DELETED_DONATIONS_SHEET: &str = "DeletedDonations";

pub const ROLL_NUMBER: &str = "RollNumber";

pub const MEMBER_HEADERS: [&str; 10] = [
    ROLL_NUMBER,
    "Name",
    "LastName",
    "PhoneNumber",
    "Address",
    "Photo",
    "isAdmin",
    "isSuperAdmin",
    "loginId",
    "password",
];
pub const WIDE_HEADERS: [&str; 1] = [ROLL_NUMBER];
pub const EXPENSE_HEADERS: [&str; 5] = ["ID", "Year", "Month", "Amount", "Description"];
pub const USER_STATUS_HEADERS: [&str; 3] = [ROLL_NUMBER, "loginId", "password"];
pub const DELETED_DONATION_HEADERS: [&str; 4] = [ROLL_NUMBER, "Name", "TotalDonation", "Timestamp"];

/// Members are read as `A1:Z`.
pub fn members_range() -> Range {
    Range::columns(0, NARROW_LAST_COLUMN)
}

/// Donations and Attendance are read as `A1:ZZ`.
pub fn wide_range() -> Range {
    Range::columns(0, WIDE_LAST_COLUMN)
}

/// Expenses are read as `A1:E`.
pub fn expenses_range() -> Range {
    Range::columns(0, EXPENSE_HEADERS.len() - 1)
}

/// UserStatus is read as `A1:C`.
pub fn user_status_range() -> Range {
    Range::columns(0, USER_STATUS_HEADERS.len() - 1)
}

/// DeletedDonations rows are appended starting at `A1:D`.
pub fn deleted_donations_range() -> Range {
    Range::columns(0, DELETED_DONATION_HEADERS.len() - 1)
}

pub fn header_row(names: &[&str]) -> Row {
    names.iter().map(|name| name.to_string()).collect()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    sheets: BTreeMap<String, Vec<Row>>,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook::default()
    }

    /// A workbook holding every sheet the ledgers use, each with its header row.
    pub fn seeded() -> Self {
        let mut workbook = Workbook::new();
        workbook.add_sheet(MEMBERS_SHEET, header_row(&MEMBER_HEADERS));
        workbook.add_sheet(DONATIONS_SHEET, header_row(&WIDE_HEADERS));
        workbook.add_sheet(ATTENDANCE_SHEET, header_row(&WIDE_HEADERS));
        workbook.add_sheet(EXPENSES_SHEET, header_row(&EXPENSE_HEADERS));
        workbook.add_sheet(USER_STATUS_SHEET, header_row(&USER_STATUS_HEADERS));
        workbook.add_sheet(DELETED_DONATIONS_SHEET, header_row(&DELETED_DONATION_HEADERS));
        workbook
    }

    /// Adds (or replaces) a sheet holding just `header`. An empty header gives an empty sheet.
    pub fn add_sheet(&mut self, name: &str, header: Row) {
        let rows = if header.is_empty() { Vec::new() } else { vec![header] };
        self.sheets.insert(name.to_string(), rows);
    }

    pub fn set_rows(&mut self, name: &str, rows: Vec<Row>) {
        self.sheets.insert(name.to_string(), rows);
    }

    /// Raw rows of a sheet, untrimmed.
    pub fn rows(&self, name: &str) -> Result<&[Row], StoreError> {
        self.sheets
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::MissingSheet(name.to_string()))
    }

    fn rows_mut(&mut self, name: &str) -> Result<&mut Vec<Row>, StoreError> {
        self.sheets
            .get_mut(name)
            .ok_or_else(|| StoreError::MissingSheet(name.to_string()))
    }

    /// Reads a range the way the spreadsheet API does: trailing empty cells are
    /// dropped from each row and trailing empty rows are dropped altogether.
    pub fn read(&self, sheet: &str, range: &Range) -> Result<Vec<Row>, StoreError> {
        let rows = self.rows(sheet)?;
        let row_end = range.end_row.map_or(rows.len(), |end| (end + 1).min(rows.len()));

        let mut values: Vec<Row> = rows
            .iter()
            .take(row_end)
            .skip(range.start_row)
            .map(|row| {
                let col_end = range.end_col.map_or(row.len(), |end| (end + 1).min(row.len()));
                let mut cells = if range.start_col < col_end {
                    row[range.start_col..col_end].to_vec()
                } else {
                    Vec::new()
                };
                trim_trailing_blanks(&mut cells);
                cells
            })
            .collect();

        while values.last().is_some_and(|row| row.is_empty()) {
            values.pop();
        }

        Ok(values)
    }

    /// Writes `values` with their top-left cell at the range start. Data that does
    /// not fit a bounded range is rejected before anything is written.
    pub fn write(&mut self, sheet: &str, range: &Range, values: &[Row]) -> Result<(), StoreError> {
        let fits = values.iter().enumerate().all(|(offset, row)| {
            range.contains_row(range.start_row + offset)
                && (row.is_empty() || range.contains_col(range.start_col + row.len() - 1))
        });
        if !fits {
            return Err(StoreError::InvalidRange(format!(
                "{sheet}!{range} is too small for {} row(s) of data",
                values.len()
            )));
        }

        let rows = self.rows_mut(sheet)?;
        for (offset, values) in values.iter().enumerate() {
            let index = range.start_row + offset;
            if rows.len() <= index {
                rows.resize_with(index + 1, Vec::new);
            }
            let row = &mut rows[index];
            let needed = range.start_col + values.len();
            if row.len() < needed {
                row.resize(needed, String::new());
            }
            for (col, value) in values.iter().enumerate() {
                row[range.start_col + col] = value.clone();
            }
        }

        Ok(())
    }

    /// Appends below the last row holding any content; returns the 0-based row index.
    pub fn append(&mut self, sheet: &str, range: &Range, values: &[String]) -> Result<usize, StoreError> {
        let rows = self.rows_mut(sheet)?;
        let index = rows
            .iter()
            .rposition(|row| row.iter().any(|cell| !cell.is_empty()))
            .map_or(0, |last| last + 1);

        let anchored = Range {
            start_row: index,
            start_col: range.start_col,
            end_row: None,
            end_col: range.end_col,
        };
        self.write(sheet, &anchored, &[values.to_vec()])?;
        Ok(index)
    }

    pub fn clear(&mut self, sheet: &str, range: &Range) -> Result<(), StoreError> {
        let rows = self.rows_mut(sheet)?;
        for (index, row) in rows.iter_mut().enumerate() {
            if !range.contains_row(index) {
                continue;
            }
            for (col, cell) in row.iter_mut().enumerate() {
                if range.contains_col(col) {
                    cell.clear();
                }
            }
        }
        Ok(())
    }

    pub fn delete_row(&mut self, sheet: &str, index: usize) -> Result<(), StoreError> {
        let rows = self.rows_mut(sheet)?;
        if index >= rows.len() {
            return Err(StoreError::RowOutOfBounds {
                sheet: sheet.to_string(),
                index,
            });
        }
        rows.remove(index);
        Ok(())
    }
}

fn trim_trailing_blanks(cells: &mut Row) {
    while cells.last().is_some_and(|cell| cell.is_empty()) {
        cells.pop();
    }
}
