#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use ledger::keys::RollNumber;
use ledger::range::Range;
use ledger::store::{MemoryStore, StoreError, TabularStore};
use ledger::wide::MonthKey;
use ledger::workbook::{Row, wide_range};

pub fn roll(raw: &str) -> RollNumber {
    RollNumber::new(raw).expect("test roll numbers are non-empty")
}

pub fn month(year: &str, month: &str) -> MonthKey {
    MonthKey::new(year, month).expect("test months are single tokens")
}

pub fn strings(cells: &[&str]) -> Row {
    cells.iter().map(|cell| cell.to_string()).collect()
}

/// Whole sheet as the store returns it (trailing blanks trimmed).
pub fn sheet(store: &dyn TabularStore, name: &str) -> Vec<Row> {
    store.read_range(name, &wide_range()).expect("sheet should be readable")
}

/// Passes everything through to a [`MemoryStore`] except the `fail_at`-th
/// mutation (1-based), which fails with an I/O error. By default the failing
/// mutation is not applied; [`FailingStore::after_apply`] applies it first, the
/// way a store that writes but cannot confirm would.
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_at: usize,
    apply_first: bool,
    mutations: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: MemoryStore, fail_at: usize) -> Self {
        FailingStore {
            inner,
            fail_at,
            apply_first: false,
            mutations: AtomicUsize::new(0),
        }
    }

    pub fn after_apply(inner: MemoryStore, fail_at: usize) -> Self {
        FailingStore {
            apply_first: true,
            ..FailingStore::new(inner, fail_at)
        }
    }

    fn mutate<T>(&self, op: impl FnOnce(&MemoryStore) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let n = self.mutations.fetch_add(1, Ordering::SeqCst) + 1;
        if n != self.fail_at {
            return op(&self.inner);
        }
        if self.apply_first {
            op(&self.inner)?;
        }
        Err(StoreError::Io(io::Error::other("injected failure")))
    }
}

impl TabularStore for FailingStore {
    fn read_range(&self, sheet: &str, range: &Range) -> Result<Vec<Row>, StoreError> {
        self.inner.read_range(sheet, range)
    }

    fn write_range(&self, sheet: &str, range: &Range, rows: &[Row]) -> Result<(), StoreError> {
        self.mutate(|store| store.write_range(sheet, range, rows))
    }

    fn append_row(&self, sheet: &str, range: &Range, row: &[String]) -> Result<usize, StoreError> {
        self.mutate(|store| store.append_row(sheet, range, row))
    }

    fn clear_range(&self, sheet: &str, range: &Range) -> Result<(), StoreError> {
        self.mutate(|store| store.clear_range(sheet, range))
    }

    fn delete_row(&self, sheet: &str, index: usize) -> Result<(), StoreError> {
        self.mutate(|store| store.delete_row(sheet, index))
    }
}
