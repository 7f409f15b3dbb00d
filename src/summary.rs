//! Organisation-wide totals.

use log::warn;
use serde::Serialize;

use crate::error::AppResult;
use crate::range::Range;
use crate::store::TabularStore;
use crate::wide::{parse_amount, row_total};
use crate::workbook::{
    DELETED_DONATION_HEADERS, DELETED_DONATIONS_SHEET, DONATIONS_SHEET, EXPENSE_HEADERS, EXPENSES_SHEET,
    wide_range,
};

const EXPENSE_AMOUNT_COL: usize = 3;
const DELETED_TOTAL_COL: usize = 2;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_donations: f64,
    pub total_expenses: f64,
    /// Informational only; not part of the balance.
    pub total_deleted_donations: f64,
    pub balance: f64,
}

pub struct SummaryAggregator<'a> {
    store: &'a dyn TabularStore,
}

impl<'a> SummaryAggregator<'a> {
    pub fn new(store: &'a dyn TabularStore) -> Self {
        SummaryAggregator { store }
    }

    pub fn compute_summary(&self) -> AppResult<Summary> {
        let donations = self.store.read_range(DONATIONS_SHEET, &wide_range())?;
        let total_donations: f64 = donations.iter().skip(1).map(|row| row_total(row)).sum();

        let expenses = self
            .store
            .read_range(EXPENSES_SHEET, &Range::rows_from(1, EXPENSE_HEADERS.len() - 1))?;
        let total_expenses = column_sum(&expenses, EXPENSE_AMOUNT_COL);

        let deleted = self
            .store
            .read_range(DELETED_DONATIONS_SHEET, &Range::rows_from(1, DELETED_DONATION_HEADERS.len() - 1));
        let total_deleted_donations = match deleted {
            Ok(rows) => column_sum(&rows, DELETED_TOTAL_COL),
            Err(err) => {
                warn!("DeletedDonations sheet not readable, counting it as empty: {err}");
                0.0
            }
        };

        Ok(Summary {
            total_donations,
            total_expenses,
            total_deleted_donations,
            balance: total_donations - total_expenses,
        })
    }
}

fn column_sum(rows: &[Vec<String>], col: usize) -> f64 {
    rows.iter()
        .map(|row| row.get(col).map_or(0.0, |cell| parse_amount(cell)))
        .sum()
}
