//! Encoding of per-member monthly series as `"Year Month"` columns.
//!
//! A wide table keeps the roll number in column 0 and one column per month,
//! headed `"<Year> <Month>"`. Columns are appended the first time a month is
//! written to. Year and month are free-form tokens; they are never validated
//! as calendar values.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

lazy_static! {
    static ref MONTH_HEADER: Regex = Regex::new(r"^([^ ]+) ([^ ]+)$").unwrap();
}

/// `{year: {month: cell}}`
pub type MonthGrid = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MonthKey {
    pub year: String,
    pub month: String,
}

impl MonthKey {
    /// Builds a key from request input. Both parts must be single non-empty tokens,
    /// otherwise the header would not decode back to the same month.
    pub fn new(year: &str, month: &str) -> Option<Self> {
        let (year, month) = (year.trim(), month.trim());
        let single_token = |part: &str| !part.is_empty() && !part.contains(char::is_whitespace);

        if single_token(year) && single_token(month) {
            Some(MonthKey {
                year: year.to_string(),
                month: month.to_string(),
            })
        } else {
            None
        }
    }

    /// Parses a header cell. Anything but exactly two space-separated tokens is `None`.
    pub fn parse(header: &str) -> Option<Self> {
        let caps = MONTH_HEADER.captures(header.trim())?;
        Some(MonthKey {
            year: caps[1].to_string(),
            month: caps[2].to_string(),
        })
    }

    pub fn header(&self) -> String {
        format!("{} {}", self.year, self.month)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.year, self.month)
    }
}

/// Which cells survive decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellFilter {
    /// Attendance: any non-empty cell.
    NonEmpty,
    /// Donations: non-empty and not the literal `"0"`.
    NonZero,
}

impl CellFilter {
    fn keeps(self, cell: &str) -> bool {
        match self {
            CellFilter::NonEmpty => !cell.is_empty(),
            CellFilter::NonZero => !cell.is_empty() && cell != "0",
        }
    }
}

pub fn decode_wide_row(headers: &[String], row: &[String], filter: CellFilter) -> MonthGrid {
    let mut grid = MonthGrid::new();

    for (index, header) in headers.iter().enumerate().skip(1) {
        let Some(key) = MonthKey::parse(header) else {
            continue;
        };
        let cell = row.get(index).map(String::as_str).unwrap_or("");
        if !filter.keeps(cell) {
            continue;
        }
        // First occurrence of a duplicated header wins.
        grid.entry(key.year)
            .or_default()
            .entry(key.month)
            .or_insert_with(|| cell.to_string());
    }

    grid
}

/// First column headed exactly `"{year} {month}"`.
pub fn locate_column(headers: &[String], key: &MonthKey) -> Option<usize> {
    let wanted = key.header();
    headers.iter().position(|header| *header == wanted)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnSlot {
    pub index: usize,
    pub created: bool,
}

/// Finds the month column, appending a new header when it does not exist yet.
///
/// A created column must be persisted (header plus an empty cell in every data
/// row) before any data row is written to it.
pub fn locate_or_create_column(headers: &mut Vec<String>, key: &MonthKey) -> ColumnSlot {
    if let Some(index) = locate_column(headers, key) {
        return ColumnSlot {
            index,
            created: false,
        };
    }

    headers.push(key.header());
    ColumnSlot {
        index: headers.len() - 1,
        created: true,
    }
}

/// Month headers that appear more than once.
pub fn duplicate_month_headers(headers: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates = Vec::new();

    for header in headers.iter().skip(1) {
        if MonthKey::parse(header).is_some() && !seen.insert(header.as_str()) && !duplicates.contains(header) {
            duplicates.push(header.clone());
        }
    }

    duplicates
}

/// Parse-as-float-or-zero, used for every stored amount.
///
/// The whole trimmed cell must be a number. A cell with trailing text such as
/// `"100 INR"` counts as 0, not as its leading 100.
pub fn parse_amount(cell: &str) -> f64 {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Strict variant for request input.
pub fn parse_input_amount(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Renders an amount without a trailing `.0`; zero is always `"0"`.
pub fn format_amount(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value}")
    }
}

/// Sum of every non-key cell of a wide row.
pub fn row_total(row: &[String]) -> f64 {
    row.iter().skip(1).map(|cell| parse_amount(cell)).sum()
}

/// Splits an attendance cell into trimmed, non-empty date tokens.
pub fn split_dates(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_dates(dates: &[String]) -> String {
    dates.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn month_key_parses_two_tokens_only() {
        assert_eq!(
            MonthKey::parse("2025 March"),
            Some(MonthKey { year: "2025".into(), month: "March".into() })
        );
        assert_eq!(MonthKey::parse(" 2025 March "), MonthKey::new("2025", "March"));
        assert_eq!(MonthKey::parse("Notes"), None);
        assert_eq!(MonthKey::parse("2025-March"), None);
        assert_eq!(MonthKey::parse("2025  March"), None);
        assert_eq!(MonthKey::parse("2025 March Extra"), None);
    }

    #[test]
    fn month_key_rejects_multi_word_input() {
        assert!(MonthKey::new("2025", "Mar ch").is_none());
        assert!(MonthKey::new("", "March").is_none());
        assert_eq!(MonthKey::new(" 2025", "April ").unwrap().header(), "2025 April");
    }

    #[test]
    fn decode_skips_non_month_headers() {
        let headers = strings(&["RollNumber", "Notes", "2025-March", "2025 March", "2025 April"]);
        let row = strings(&["7", "hello", "12", "100", "50"]);

        let grid = decode_wide_row(&headers, &row, CellFilter::NonEmpty);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid["2025"].len(), 2);
        assert_eq!(grid["2025"]["March"], "100");
        assert_eq!(grid["2025"]["April"], "50");
    }

    #[test]
    fn decode_drops_empty_and_zero_donations() {
        let headers = strings(&["RollNumber", "2024 May", "2025 March", "2025 April"]);
        let row = strings(&["7", "0", "", "25"]);

        let grid = decode_wide_row(&headers, &row, CellFilter::NonZero);
        assert!(!grid.contains_key("2024"));
        assert_eq!(grid["2025"].len(), 1);

        let grid = decode_wide_row(&headers, &row, CellFilter::NonEmpty);
        assert_eq!(grid["2024"]["May"], "0");
    }

    #[test]
    fn decode_handles_short_rows_and_duplicate_headers() {
        let headers = strings(&["RollNumber", "2025 March", "2025 March", "2025 April"]);
        let row = strings(&["7", "first", "second"]);

        let grid = decode_wide_row(&headers, &row, CellFilter::NonEmpty);
        assert_eq!(grid["2025"]["March"], "first");
        assert!(!grid["2025"].contains_key("April"));
        assert_eq!(duplicate_month_headers(&headers), strings(&["2025 March"]));
    }

    #[test]
    fn locate_or_create_appends_missing_columns_once() {
        let mut headers = strings(&["RollNumber", "2025 March"]);
        let key = MonthKey::new("2025", "April").unwrap();

        let slot = locate_or_create_column(&mut headers, &key);
        assert_eq!(slot, ColumnSlot { index: 2, created: true });

        let slot = locate_or_create_column(&mut headers, &key);
        assert_eq!(slot, ColumnSlot { index: 2, created: false });
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn amounts_parse_leniently_and_render_compactly() {
        assert_eq!(parse_amount(" 12.5 "), 12.5);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("inf"), 0.0);
        assert_eq!(parse_input_amount("x"), None);
        assert_eq!(format_amount(120.0), "120");
        assert_eq!(format_amount(12.5), "12.5");
        assert_eq!(format_amount(-0.0), "0");
        assert_eq!(row_total(&strings(&["7", "100", "x", "", "20"])), 120.0);
    }

    #[test]
    fn amounts_with_trailing_text_count_as_zero() {
        assert_eq!(parse_amount("100 INR"), 0.0);
        assert_eq!(parse_amount("12abc"), 0.0);
        assert_eq!(row_total(&strings(&["7", "100 INR", "20"])), 20.0);
    }

    #[test]
    fn dates_split_and_join() {
        assert_eq!(split_dates(" 1, 5,,9 "), strings(&["1", "5", "9"]));
        assert!(split_dates("").is_empty());
        assert_eq!(join_dates(&strings(&["1", "5"])), "1,5");
    }
}
