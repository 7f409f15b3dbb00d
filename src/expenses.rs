//! Expense entries, one row each, identified by a generated ID.

use log::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::TabularStore;
use crate::table::{Record, Table};
use crate::transaction::Transaction;
use crate::wide::parse_input_amount;
use crate::workbook::{EXPENSES_SHEET, expenses_range};

#[derive(Clone, Debug, Default)]
pub struct NewExpense<'a> {
    pub year: &'a str,
    pub month: &'a str,
    pub amount: &'a str,
    pub description: &'a str,
}

pub struct ExpenseLedger<'a> {
    store: &'a dyn TabularStore,
}

impl<'a> ExpenseLedger<'a> {
    pub fn new(store: &'a dyn TabularStore) -> Self {
        ExpenseLedger { store }
    }

    pub fn list(&self) -> AppResult<Vec<Record>> {
        let rows = self.store.read_range(EXPENSES_SHEET, &expenses_range())?;
        Ok(Table::from_rows(rows).records())
    }

    /// Appends the expense and returns its new ID.
    pub fn add(&self, expense: &NewExpense<'_>) -> AppResult<String> {
        if parse_input_amount(expense.amount).is_none() {
            return Err(AppError::Validation("Amount must be a number".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let row = vec![
            id.clone(),
            expense.year.trim().to_string(),
            expense.month.trim().to_string(),
            expense.amount.trim().to_string(),
            expense.description.to_string(),
        ];

        let mut tx = Transaction::new(self.store, "expense add");
        tx.append(EXPENSES_SHEET, expenses_range(), row);
        tx.commit()?;

        info!("Expense {id} added");
        Ok(id)
    }

    /// Physically removes the expense row.
    pub fn delete(&self, id: &str) -> AppResult<()> {
        let rows = self.store.read_range(EXPENSES_SHEET, &expenses_range())?;
        if rows.is_empty() {
            return Err(AppError::NotFound("No data found".to_string()));
        }

        let table = Table::from_rows(rows);
        let id_col = table
            .column("ID")
            .ok_or_else(|| AppError::Internal("ID column not found in sheet".to_string()))?;
        let index = table
            .find_by(id_col, id)
            .ok_or_else(|| AppError::NotFound("Expense with this ID not found".to_string()))?;

        self.store.delete_row(EXPENSES_SHEET, Table::sheet_row(index))?;
        info!("Expense {id} deleted");
        Ok(())
    }
}
