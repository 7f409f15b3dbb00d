//! Signup, approval and login.
//!
//! A signup lands in the UserStatus sheet as a pending row. Approving it copies
//! the credentials onto the member's row in Members and removes the pending
//! row; rejecting only removes the pending row. Login is checked against
//! Members.

use log::info;

use crate::error::{AppError, AppResult};
use crate::keys::RollNumber;
use crate::range::Range;
use crate::store::TabularStore;
use crate::table::{Record, Table};
use crate::transaction::Transaction;
use crate::workbook::{
    MEMBERS_SHEET, ROLL_NUMBER, USER_STATUS_HEADERS, USER_STATUS_SHEET, members_range, user_status_range,
};

/// Area cleared before the UserStatus sheet is rewritten.
fn user_status_clear_range() -> Range {
    Range::block(0, 0, 999, 25)
}

/// Credentials submitted at login.
#[derive(Debug, Clone)]
pub struct UserCredentials<'a> {
    pub login_id: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Approval {
    /// False when no Members row matched; the pending row is removed regardless.
    pub member_updated: bool,
}

struct Pending {
    table: Table,
    has_header: bool,
    roll_col: usize,
    login_col: usize,
    password_col: usize,
}

impl Pending {
    fn find(&self, roll: &RollNumber) -> Option<usize> {
        self.table
            .rows
            .iter()
            .position(|row| row.get(self.roll_col).is_some_and(|cell| roll.matches(cell)))
    }
}

pub struct AuthGate<'a> {
    store: &'a dyn TabularStore,
}

impl<'a> AuthGate<'a> {
    pub fn new(store: &'a dyn TabularStore) -> Self {
        AuthGate { store }
    }

    fn pending_table(&self) -> AppResult<Pending> {
        let rows = self.store.read_range(USER_STATUS_SHEET, &user_status_range())?;
        let has_header = !rows.is_empty();
        let table = Table::from_rows_or(rows, &USER_STATUS_HEADERS);
        Ok(Pending {
            has_header,
            roll_col: table.column(ROLL_NUMBER).unwrap_or(0),
            login_col: table.column("loginId").unwrap_or(1),
            password_col: table.column("password").unwrap_or(2),
            table,
        })
    }

    pub fn pending(&self) -> AppResult<Vec<Record>> {
        let rows = self.store.read_range(USER_STATUS_SHEET, &user_status_range())?;
        Ok(Table::from_rows(rows).records())
    }

    /// Queues a signup for approval. Rejected when a pending row already uses
    /// the same login ID or roll number.
    pub fn signup(&self, roll: &RollNumber, login_id: &str, password: &str) -> AppResult<()> {
        let pending = self.pending_table()?;
        let taken = pending.table.rows.iter().any(|row| {
            row.get(pending.login_col).is_some_and(|cell| cell == login_id)
                || row.get(pending.roll_col).is_some_and(|cell| roll.matches(cell))
        });
        if taken {
            return Err(AppError::Conflict("User already exists in UserStatus".to_string()));
        }

        let mut tx = Transaction::new(self.store, "signup");
        if !pending.has_header {
            tx.write_row(USER_STATUS_SHEET, 0, pending.table.headers.clone(), Vec::new());
        }

        let mut row = vec![String::new(); pending.table.width().max(3)];
        row[pending.roll_col] = roll.to_string();
        row[pending.login_col] = login_id.to_string();
        row[pending.password_col] = password.to_string();
        tx.append(USER_STATUS_SHEET, user_status_range(), row);
        tx.commit()?;

        info!("Signup for {roll} queued for approval");
        Ok(())
    }

    /// Moves the pending credentials onto the member row and strips its admin flags.
    pub fn approve(&self, roll: &RollNumber) -> AppResult<Approval> {
        let pending = self.pending_table()?;
        let pending_index = pending
            .find(roll)
            .ok_or_else(|| AppError::NotFound("User not found in UserStatus".to_string()))?;

        let members = Table::from_rows(self.store.read_range(MEMBERS_SHEET, &members_range())?);
        let mut tx = Transaction::new(self.store, "approve user");

        let member_index = members.find_row(roll);
        if let Some(index) = member_index {
            let (Some(login_col), Some(password_col)) = (members.column("loginId"), members.column("password"))
            else {
                return Err(AppError::Internal(
                    "loginId or password columns not found in Members sheet".to_string(),
                ));
            };
            let admin_cols: Vec<usize> = ["isAdmin", "isSuperAdmin"]
                .iter()
                .filter_map(|name| members.column(name))
                .collect();

            let width = admin_cols
                .iter()
                .copied()
                .chain([login_col, password_col])
                .max()
                .map_or(members.width(), |max| (max + 1).max(members.width()));
            let mut row = members.padded_row(index, width);
            row[login_col] = pending.table.cell(pending_index, pending.login_col).to_string();
            row[password_col] = pending.table.cell(pending_index, pending.password_col).to_string();
            for col in admin_cols {
                row[col] = "false".to_string();
            }
            tx.write_row(MEMBERS_SHEET, Table::sheet_row(index), row, members.row(index).to_vec());
        } else {
            info!("Approving {roll} without a Members row; only the pending entry is removed");
        }

        stage_pending_removal(&mut tx, &pending.table, pending_index);
        tx.commit()?;

        info!("User {roll} approved");
        Ok(Approval {
            member_updated: member_index.is_some(),
        })
    }

    pub fn reject(&self, roll: &RollNumber) -> AppResult<()> {
        let pending = self.pending_table()?;
        let index = pending
            .find(roll)
            .ok_or_else(|| AppError::NotFound("User not found in UserStatus".to_string()))?;

        let mut tx = Transaction::new(self.store, "reject user");
        stage_pending_removal(&mut tx, &pending.table, index);
        tx.commit()?;

        info!("Pending signup for {roll} removed");
        Ok(())
    }

    /// Plaintext match on both columns. Any mismatch is the same error, so the
    /// response never tells which half was wrong.
    pub fn login(&self, credentials: &UserCredentials<'_>) -> AppResult<Record> {
        let members = Table::from_rows(self.store.read_range(MEMBERS_SHEET, &members_range())?);
        let (Some(login_col), Some(password_col)) = (members.column("loginId"), members.column("password")) else {
            return Err(AppError::Internal(
                "loginId or password columns not found in Members sheet".to_string(),
            ));
        };

        let index = members
            .rows
            .iter()
            .position(|row| {
                row.get(login_col).is_some_and(|cell| cell == credentials.login_id)
                    && row.get(password_col).is_some_and(|cell| cell == credentials.password)
            })
            .ok_or(AppError::Unauthorized)?;

        let mut user = members.record(index);
        if let Some(roll) = user.remove(ROLL_NUMBER) {
            user.insert("rollNumber".to_string(), roll);
        }

        info!("Login for {}", credentials.login_id);
        Ok(user)
    }
}

/// Rewrites UserStatus without data row `index`: clear, then header plus the rest.
fn stage_pending_removal(tx: &mut Transaction<'_>, table: &Table, index: usize) {
    let previous = table.to_rows();
    let mut remaining = table.clone();
    remaining.rows.remove(index);

    tx.clear(USER_STATUS_SHEET, user_status_clear_range(), previous);
    tx.write(USER_STATUS_SHEET, Range::anchor(0), remaining.to_rows(), Vec::new());
}
