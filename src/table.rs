//! A header-plus-rows view over a range read from the store.

use std::collections::BTreeMap;

use crate::keys::RollNumber;
use crate::workbook::{Row, header_row};

/// One row rendered as `{header: cell}`.
pub type Record = BTreeMap<String, String>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub headers: Row,
    pub rows: Vec<Row>,
}

impl Table {
    /// Splits raw rows into header and data. An empty read yields an empty table.
    pub fn from_rows(mut rows: Vec<Row>) -> Self {
        if rows.is_empty() {
            return Table::default();
        }
        let headers = rows.remove(0);
        Table { headers, rows }
    }

    /// Like [`Table::from_rows`], but a sheet without a header gets `default`.
    pub fn from_rows_or(rows: Vec<Row>, default: &[&str]) -> Self {
        let mut table = Table::from_rows(rows);
        if table.headers.is_empty() {
            table.headers = header_row(default);
        }
        table
    }

    /// Sheet row index of data row `index`.
    pub fn sheet_row(index: usize) -> usize {
        index + 1
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn row(&self, index: usize) -> &[String] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, index: usize, col: usize) -> &str {
        self.row(index).get(col).map(String::as_str).unwrap_or("")
    }

    /// First data row keyed by `roll`.
    pub fn find_row(&self, roll: &RollNumber) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.first().is_some_and(|key| roll.matches(key)))
    }

    /// First data row whose cell in `col` equals `value` exactly.
    pub fn find_by(&self, col: usize, value: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get(col).is_some_and(|cell| cell == value))
    }

    /// First data row with no key and no content, free to hold a new record.
    pub fn find_empty_row(&self) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.iter().all(|cell| cell.trim().is_empty()))
    }

    /// Whether every cell but the key is blank (a cleared record).
    pub fn is_blank_record(&self, index: usize) -> bool {
        self.row(index).iter().skip(1).all(|cell| cell.trim().is_empty())
    }

    /// Data row `index` padded with empty cells to at least `width` cells.
    pub fn padded_row(&self, index: usize, width: usize) -> Row {
        let mut row = self.row(index).to_vec();
        if row.len() < width {
            row.resize(width, String::new());
        }
        row
    }

    /// A cleared record for `roll`, wide enough to overwrite data row `index`.
    pub fn blank_row(&self, index: usize, roll: &RollNumber) -> Row {
        let width = self.width().max(self.row(index).len()).max(1);
        let mut row = vec![String::new(); width];
        row[0] = roll.to_string();
        row
    }

    pub fn record(&self, index: usize) -> Record {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| (header.clone(), self.cell(index, col).to_string()))
            .collect()
    }

    pub fn records(&self) -> Vec<Record> {
        (0..self.rows.len()).map(|index| self.record(index)).collect()
    }

    /// The whole table as it would be written back, header first.
    pub fn to_rows(&self) -> Vec<Row> {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(self.headers.clone());
        rows.extend(self.rows.iter().cloned());
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> Table {
        Table::from_rows(rows.iter().map(|r| header_row(r)).collect())
    }

    #[test]
    fn finds_rows_by_trimmed_key() {
        let t = table(&[&["RollNumber", "Name"], &["1", "A"], &[" 2 ", "B"]]);
        assert_eq!(t.find_row(&RollNumber::new("2").unwrap()), Some(1));
        assert_eq!(t.find_row(&RollNumber::new("3").unwrap()), None);
    }

    #[test]
    fn empty_row_requires_blank_key() {
        let t = table(&[&["RollNumber", "Name"], &["1"], &[], &["", "x"], &["", ""]]);
        assert_eq!(t.find_empty_row(), Some(1));
        assert!(t.is_blank_record(0));
        assert!(!t.is_blank_record(2));
    }

    #[test]
    fn blank_row_covers_stray_cells() {
        let t = table(&[&["RollNumber", "Name"], &["1", "A", "stray"]]);
        assert_eq!(t.blank_row(0, &RollNumber::new("1").unwrap()), header_row(&["1", "", ""]));
    }

    #[test]
    fn missing_header_falls_back_to_default() {
        let t = Table::from_rows_or(Vec::new(), &["RollNumber"]);
        assert_eq!(t.headers, header_row(&["RollNumber"]));
        assert!(t.rows.is_empty());
    }

    #[test]
    fn records_map_headers_to_cells() {
        let t = table(&[&["RollNumber", "Name", "Photo"], &["1", "A"]]);
        let record = t.record(0);
        assert_eq!(record["Name"], "A");
        assert_eq!(record["Photo"], "");
    }
}
