//! Monthly donation totals per member.

use log::info;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::keys::RollNumber;
use crate::store::TabularStore;
use crate::table::Table;
use crate::transaction::Transaction;
use crate::wide::{
    CellFilter, MonthGrid, MonthKey, decode_wide_row, format_amount, locate_column, parse_amount,
    parse_input_amount,
};
use crate::workbook::{DONATIONS_SHEET, WIDE_HEADERS, wide_range};

/// One member's series as served to clients: the key plus `{year: {month: value}}`.
#[derive(Clone, Debug, Serialize)]
pub struct WideRecord {
    #[serde(rename = "RollNumber")]
    pub roll_number: String,
    #[serde(flatten)]
    pub months: MonthGrid,
}

impl WideRecord {
    pub(crate) fn decode(table: &Table, index: usize, filter: CellFilter) -> Self {
        WideRecord {
            roll_number: table.cell(index, 0).to_string(),
            months: decode_wide_row(&table.headers, table.row(index), filter),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DonationReceipt {
    pub key: MonthKey,
    pub total: f64,
    pub created_row: bool,
}

impl DonationReceipt {
    pub fn message(&self) -> String {
        if self.created_row {
            "Donation added successfully".to_string()
        } else {
            format!(
                "Donation updated successfully. Total for {} is {}",
                self.key,
                format_amount(self.total)
            )
        }
    }
}

pub struct DonationLedger<'a> {
    store: &'a dyn TabularStore,
}

impl<'a> DonationLedger<'a> {
    pub fn new(store: &'a dyn TabularStore) -> Self {
        DonationLedger { store }
    }

    fn table(&self) -> AppResult<Table> {
        let rows = self.store.read_range(DONATIONS_SHEET, &wide_range())?;
        Ok(Table::from_rows_or(rows, &WIDE_HEADERS))
    }

    pub fn list(&self) -> AppResult<Vec<WideRecord>> {
        let table = self.table()?;
        Ok((0..table.rows.len())
            .map(|index| WideRecord::decode(&table, index, CellFilter::NonZero))
            .collect())
    }

    pub fn get(&self, roll: &RollNumber) -> AppResult<WideRecord> {
        let table = self.table()?;
        let index = table
            .find_row(roll)
            .ok_or_else(|| AppError::NotFound("RollNumber not found".to_string()))?;
        Ok(WideRecord::decode(&table, index, CellFilter::NonZero))
    }

    /// Adds `amount` to the member's total for the month, creating the month
    /// column and the member's row as needed. A new row stores `amount` verbatim.
    pub fn add_or_update(&self, roll: &RollNumber, key: &MonthKey, amount: &str) -> AppResult<DonationReceipt> {
        let delta = parse_input_amount(amount)
            .ok_or_else(|| AppError::Validation("Amount must be a number".to_string()))?;

        let mut table = self.table()?;
        let mut tx = Transaction::new(self.store, "donation add");
        let col = tx.ensure_month_column(DONATIONS_SHEET, &mut table, key)?;

        let receipt = match table.find_row(roll) {
            Some(index) => {
                let total = parse_amount(table.cell(index, col)) + delta;
                let mut row = table.padded_row(index, table.width());
                row[col] = format_amount(total);
                tx.write_row(DONATIONS_SHEET, Table::sheet_row(index), row, table.row(index).to_vec());
                DonationReceipt {
                    key: key.clone(),
                    total,
                    created_row: false,
                }
            }
            None => {
                let mut row = vec![String::new(); table.width()];
                row[0] = roll.to_string();
                row[col] = amount.trim().to_string();
                tx.append(DONATIONS_SHEET, wide_range(), row);
                DonationReceipt {
                    key: key.clone(),
                    total: delta,
                    created_row: true,
                }
            }
        };

        tx.commit()?;
        info!("Donation for {roll} in {key}: total {}", format_amount(receipt.total));
        Ok(receipt)
    }

    /// Subtracts `amount` from an existing monthly total, never going below zero.
    pub fn delete(&self, roll: &RollNumber, key: &MonthKey, amount: &str) -> AppResult<f64> {
        let delta = parse_input_amount(amount)
            .ok_or_else(|| AppError::Validation("Amount must be a number".to_string()))?;

        let table = self.table()?;
        let col = locate_column(&table.headers, key)
            .ok_or_else(|| AppError::NotFound(format!("Month \"{key}\" not found in sheet")))?;
        let index = table
            .find_row(roll)
            .ok_or_else(|| AppError::NotFound("RollNumber not found".to_string()))?;

        let existing = parse_amount(table.cell(index, col));
        if existing == 0.0 {
            return Err(AppError::Validation(
                "No donation exists for this date to delete".to_string(),
            ));
        }

        let remaining = (existing - delta).max(0.0);
        let mut row = table.padded_row(index, table.width());
        row[col] = format_amount(remaining);

        let mut tx = Transaction::new(self.store, "donation delete");
        tx.write_row(DONATIONS_SHEET, Table::sheet_row(index), row, table.row(index).to_vec());
        tx.commit()?;

        info!("Donation for {roll} in {key} reduced to {}", format_amount(remaining));
        Ok(remaining)
    }
}
