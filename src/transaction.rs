//! Staged writes committed in order, with compensation on partial failure.
//!
//! Ledger operations read what they need, stage every write here together with
//! the contents it overwrites, then commit. If write `k` fails, writes `0..=k`
//! are undone in reverse order before the error is returned; rewriting the
//! previous contents of `k` is harmless if it never landed. There is no
//! isolation: a concurrent writer can still interleave with a commit.

use log::{error, warn};

use crate::range::{Range, WIDE_LAST_COLUMN};
use crate::store::{StoreError, TabularStore};
use crate::table::Table;
use crate::wide::{MonthKey, duplicate_month_headers, locate_or_create_column};
use crate::workbook::Row;

#[derive(Debug)]
enum Change {
    Write {
        sheet: String,
        range: Range,
        rows: Vec<Row>,
        previous: Vec<Row>,
    },
    Append {
        sheet: String,
        range: Range,
        row: Row,
    },
    Clear {
        sheet: String,
        range: Range,
        previous: Vec<Row>,
    },
}

#[derive(Debug)]
enum Undo {
    Rewrite {
        sheet: String,
        range: Range,
        rows: Vec<Row>,
    },
    Remove {
        sheet: String,
        index: usize,
    },
}

pub struct Transaction<'a> {
    store: &'a dyn TabularStore,
    label: &'static str,
    changes: Vec<Change>,
}

impl<'a> Transaction<'a> {
    pub fn new(store: &'a dyn TabularStore, label: &'static str) -> Self {
        Transaction {
            store,
            label,
            changes: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.changes.len()
    }

    /// Stages `rows` at `range`; `previous` is what those cells held before.
    pub fn write(&mut self, sheet: &str, range: Range, rows: Vec<Row>, previous: Vec<Row>) {
        self.changes.push(Change::Write {
            sheet: sheet.to_string(),
            range,
            rows,
            previous,
        });
    }

    /// Stages a full-row rewrite of sheet row `sheet_row`.
    pub fn write_row(&mut self, sheet: &str, sheet_row: usize, row: Row, previous: Row) {
        self.write(sheet, Range::row(sheet_row), vec![row], vec![previous]);
    }

    pub fn append(&mut self, sheet: &str, range: Range, row: Row) {
        self.changes.push(Change::Append {
            sheet: sheet.to_string(),
            range,
            row,
        });
    }

    pub fn clear(&mut self, sheet: &str, range: Range, previous: Vec<Row>) {
        self.changes.push(Change::Clear {
            sheet: sheet.to_string(),
            range,
            previous,
        });
    }

    /// Finds the month column in `table`, staging the header write and the
    /// empty-cell backfill of every data row when the column is new.
    ///
    /// `table` is updated in place so later row writes see the new column.
    pub fn ensure_month_column(
        &mut self,
        sheet: &str,
        table: &mut Table,
        key: &MonthKey,
    ) -> Result<usize, StoreError> {
        let duplicates = duplicate_month_headers(&table.headers);
        if !duplicates.is_empty() {
            warn!("{sheet} has duplicate month columns {duplicates:?}; using the first of each");
        }

        let previous_header = table.headers.clone();
        let slot = locate_or_create_column(&mut table.headers, key);
        if !slot.created {
            return Ok(slot.index);
        }

        if slot.index > WIDE_LAST_COLUMN {
            table.headers.pop();
            return Err(StoreError::InvalidRange(format!(
                "{sheet} has no room left for column '{key}'"
            )));
        }

        self.write_row(sheet, 0, table.headers.clone(), previous_header);

        if !table.rows.is_empty() {
            let range = Range::column_segment(slot.index, 1, table.rows.len());
            let blanks = vec![vec![String::new()]; table.rows.len()];
            let previous = table
                .rows
                .iter()
                .map(|row| vec![row.get(slot.index).cloned().unwrap_or_default()])
                .collect();
            self.write(sheet, range, blanks, previous);
        }

        for row in &mut table.rows {
            if row.len() <= slot.index {
                row.resize(slot.index + 1, String::new());
            }
        }

        Ok(slot.index)
    }

    pub fn commit(self) -> Result<(), StoreError> {
        let Transaction {
            store,
            label,
            changes,
        } = self;
        let mut applied: Vec<Undo> = Vec::with_capacity(changes.len());

        for change in changes {
            match apply(store, change) {
                Ok(undo) => applied.push(undo),
                Err((err, undo)) => {
                    error!("{label}: write {} failed: {err}", applied.len() + 1);
                    // The store may have kept part of the failed write.
                    applied.extend(undo);
                    rollback(store, label, applied);
                    return Err(err);
                }
            }
        }

        Ok(())
    }
}

/// Applies one change. On failure the error comes back with the undo for a
/// rewrite, since restoring cells that were never touched is harmless.
fn apply(store: &dyn TabularStore, change: Change) -> Result<Undo, (StoreError, Option<Undo>)> {
    match change {
        Change::Write {
            sheet,
            range,
            rows,
            previous,
        } => {
            let result = store.write_range(&sheet, &range, &rows);
            let undo = Undo::Rewrite {
                rows: restore_rows(&rows, previous),
                sheet,
                range,
            };
            match result {
                Ok(()) => Ok(undo),
                Err(err) => Err((err, Some(undo))),
            }
        }
        Change::Append { sheet, range, row } => match store.append_row(&sheet, &range, &row) {
            Ok(index) => Ok(Undo::Remove { sheet, index }),
            Err(err) => Err((err, None)),
        },
        Change::Clear {
            sheet,
            range,
            previous,
        } => {
            let result = store.clear_range(&sheet, &range);
            let undo = Undo::Rewrite {
                sheet,
                range,
                rows: previous,
            };
            match result {
                Ok(()) => Ok(undo),
                Err(err) => Err((err, Some(undo))),
            }
        }
    }
}

/// Previous contents padded to cover every cell the write touched.
fn restore_rows(written: &[Row], mut previous: Vec<Row>) -> Vec<Row> {
    previous.resize_with(written.len().max(previous.len()), Vec::new);
    for (row, written) in previous.iter_mut().zip(written) {
        if row.len() < written.len() {
            row.resize(written.len(), String::new());
        }
    }
    previous
}

fn rollback(store: &dyn TabularStore, label: &str, applied: Vec<Undo>) {
    for undo in applied.into_iter().rev() {
        let result = match &undo {
            Undo::Rewrite { sheet, range, rows } => store.write_range(sheet, range, rows),
            Undo::Remove { sheet, index } => store.delete_row(sheet, *index),
        };
        if let Err(err) = result {
            error!("{label}: rollback step {undo:?} failed: {err}");
        }
    }
}
