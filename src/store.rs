//! The tabular store abstraction and its in-memory implementation.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::range::Range;
use crate::workbook::{Row, Workbook};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unable to parse range: {0}")]
    MissingSheet(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Row {index} is out of bounds for sheet {sheet}")]
    RowOutOfBounds { sheet: String, index: usize },

    #[error("Workbook I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook encoding failed: {0}")]
    Encoding(String),

    #[error("Workbook lock poisoned")]
    Poisoned,
}

/// A key-range addressable store of string tables.
///
/// Row indices are 0-based and count the header row, so data row `i` of a
/// table lives at sheet row `i + 1`. A mutation that returns an error leaves
/// the store as it was.
pub trait TabularStore: Send + Sync {
    fn read_range(&self, sheet: &str, range: &Range) -> Result<Vec<Row>, StoreError>;

    fn write_range(&self, sheet: &str, range: &Range, rows: &[Row]) -> Result<(), StoreError>;

    /// Appends `row` after the last non-empty row and returns where it landed.
    fn append_row(&self, sheet: &str, range: &Range, row: &[String]) -> Result<usize, StoreError>;

    fn clear_range(&self, sheet: &str, range: &Range) -> Result<(), StoreError>;

    fn delete_row(&self, sheet: &str, index: usize) -> Result<(), StoreError>;
}

/// Process-local store; contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    workbook: RwLock<Workbook>,
}

impl MemoryStore {
    pub fn new(workbook: Workbook) -> Self {
        MemoryStore {
            workbook: RwLock::new(workbook),
        }
    }

    pub fn seeded() -> Self {
        MemoryStore::new(Workbook::seeded())
    }

    /// Runs `change` under the write lock. `change` is responsible for leaving
    /// the workbook untouched when it fails.
    pub(crate) fn update<T>(
        &self,
        change: impl FnOnce(&mut Workbook) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut workbook = self.write()?;
        change(&mut *workbook)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Workbook>, StoreError> {
        self.workbook.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Workbook>, StoreError> {
        self.workbook.write().map_err(|_| StoreError::Poisoned)
    }
}

impl TabularStore for MemoryStore {
    fn read_range(&self, sheet: &str, range: &Range) -> Result<Vec<Row>, StoreError> {
        self.read()?.read(sheet, range)
    }

    fn write_range(&self, sheet: &str, range: &Range, rows: &[Row]) -> Result<(), StoreError> {
        self.write()?.write(sheet, range, rows)
    }

    fn append_row(&self, sheet: &str, range: &Range, row: &[String]) -> Result<usize, StoreError> {
        self.write()?.append(sheet, range, row)
    }

    fn clear_range(&self, sheet: &str, range: &Range) -> Result<(), StoreError> {
        self.write()?.clear(sheet, range)
    }

    fn delete_row(&self, sheet: &str, index: usize) -> Result<(), StoreError> {
        self.write()?.delete_row(sheet, index)
    }
}
