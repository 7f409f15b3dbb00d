//! Attendance dates per member and month.

use log::info;

use crate::donations::WideRecord;
use crate::error::{AppError, AppResult};
use crate::keys::RollNumber;
use crate::store::TabularStore;
use crate::table::Table;
use crate::transaction::Transaction;
use crate::wide::{CellFilter, MonthKey, join_dates, locate_column, split_dates};
use crate::workbook::{ATTENDANCE_SHEET, WIDE_HEADERS, wide_range};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkOutcome {
    pub column_created: bool,
    pub updated: usize,
    pub appended: usize,
    pub unchanged: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnmarkOutcome {
    pub updated: usize,
    pub skipped: usize,
}

pub struct AttendanceLedger<'a> {
    store: &'a dyn TabularStore,
}

impl<'a> AttendanceLedger<'a> {
    pub fn new(store: &'a dyn TabularStore) -> Self {
        AttendanceLedger { store }
    }

    fn table(&self) -> AppResult<Table> {
        let rows = self.store.read_range(ATTENDANCE_SHEET, &wide_range())?;
        Ok(Table::from_rows_or(rows, &WIDE_HEADERS))
    }

    pub fn list(&self) -> AppResult<Vec<WideRecord>> {
        let table = self.table()?;
        Ok((0..table.rows.len())
            .map(|index| WideRecord::decode(&table, index, CellFilter::NonEmpty))
            .collect())
    }

    pub fn get(&self, roll: &RollNumber) -> AppResult<WideRecord> {
        let table = self.table()?;
        let index = table
            .find_row(roll)
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;
        Ok(WideRecord::decode(&table, index, CellFilter::NonEmpty))
    }

    /// Adds `date` to each member's list for the month. Marking twice is a no-op;
    /// members without a row get one holding just this date.
    pub fn mark(&self, key: &MonthKey, date: &str, rolls: &[RollNumber]) -> AppResult<MarkOutcome> {
        let date = date.trim();
        if date.is_empty() || date.contains(',') {
            return Err(AppError::Validation("Date must be a single non-empty value".to_string()));
        }

        let mut table = self.table()?;
        let mut tx = Transaction::new(self.store, "mark attendance");
        let staged_before = tx.len();
        let col = tx.ensure_month_column(ATTENDANCE_SHEET, &mut table, key)?;

        let mut outcome = MarkOutcome {
            column_created: tx.len() > staged_before,
            ..MarkOutcome::default()
        };

        for roll in rolls {
            match table.find_row(roll) {
                Some(index) => {
                    let mut dates = split_dates(table.cell(index, col));
                    if dates.iter().any(|d| d == date) {
                        outcome.unchanged += 1;
                        continue;
                    }
                    dates.push(date.to_string());

                    let previous = table.row(index).to_vec();
                    let mut row = table.padded_row(index, table.width());
                    row[col] = join_dates(&dates);
                    tx.write_row(ATTENDANCE_SHEET, Table::sheet_row(index), row.clone(), previous);
                    table.rows[index] = row;
                    outcome.updated += 1;
                }
                None => {
                    let mut row = vec![String::new(); table.width()];
                    row[0] = roll.to_string();
                    row[col] = date.to_string();
                    tx.append(ATTENDANCE_SHEET, wide_range(), row.clone());
                    // Later entries for the same roll number see this row.
                    table.rows.push(row);
                    outcome.appended += 1;
                }
            }
        }

        tx.commit()?;
        info!("Attendance {date} in {key}: {outcome:?}");
        Ok(outcome)
    }

    /// Removes `date` from each listed member's list. The month column must exist
    /// already; members without a row are skipped.
    pub fn unmark(&self, key: &MonthKey, date: &str, rolls: &[RollNumber]) -> AppResult<UnmarkOutcome> {
        let date = date.trim();
        let mut table = self.table()?;
        let col = locate_column(&table.headers, key)
            .ok_or_else(|| AppError::NotFound(format!("Column '{key}' does not exist.")))?;

        let mut tx = Transaction::new(self.store, "unmark attendance");
        let mut outcome = UnmarkOutcome::default();

        for roll in rolls {
            let Some(index) = table.find_row(roll) else {
                outcome.skipped += 1;
                continue;
            };

            let current = table.cell(index, col).to_string();
            let remaining: Vec<String> = split_dates(&current).into_iter().filter(|d| d != date).collect();
            let joined = join_dates(&remaining);
            if joined == current {
                continue;
            }

            let previous = table.row(index).to_vec();
            let mut row = table.padded_row(index, table.width().max(col + 1));
            row[col] = joined;
            tx.write_row(ATTENDANCE_SHEET, Table::sheet_row(index), row.clone(), previous);
            table.rows[index] = row;
            outcome.updated += 1;
        }

        tx.commit()?;
        info!("Attendance {date} removed in {key}: {outcome:?}");
        Ok(outcome)
    }
}
