/*!
# Sangha Ledger

Backend for a small membership organisation: members, monthly donations,
attendance, expenses and a signup/approval flow, all kept in a workbook of
named sheets.

## Overview

Every table is a sheet of string rows with a header row. Members, Expenses,
UserStatus and DeletedDonations are narrow tables keyed by their first column.
Donations and Attendance are wide tables: the roll number in column 0 and one
column per month, headed `"<Year> <Month>"`, added the first time that month is
written.

## Architecture

### Storage Layer
- **TabularStore**: A1-range reads and writes, append, clear and row delete
- **MemoryStore**: in-process workbook behind a `RwLock`
- **FileStore**: the same workbook saved as gzip-compressed bincode after each write

### Ledger Layer
- **MemberLedger**: add/update, delete (with donation archive), roll number change
- **DonationLedger**: monthly totals, add and subtract
- **AttendanceLedger**: comma-separated date lists per month
- **ExpenseLedger**: expense rows keyed by generated ID
- **SummaryAggregator**: donation, expense and archived totals
- **AuthGate**: pending signups, approval and plaintext login

Multi-sheet changes are staged in a [`transaction::Transaction`] and undone in
reverse when a write fails part way.

### Web Layer (feature `web`)
- axum router under `/api`, photo uploads served from `/uploads`

## Modules

- **range**: 0-based ranges rendered in A1 notation
- **workbook**: sheets, default headers and spreadsheet-style range semantics
- **store**: the store trait and the in-memory store
- **saving**: workbook persistence and the file-backed store
- **keys**: roll numbers and loosely typed request values
- **wide**: month column codec and amount/date helpers
- **table**: header-indexed view over a sheet
- **transaction**: staged writes with compensation
- **members**, **donations**, **attendance**, **expenses**, **summary**, **login**: the ledgers
- **uploads**: member photo files
- **config**: environment configuration
- **error**: request errors and their HTTP mapping
- **app**: routing and handlers
*/

pub mod attendance;
pub mod config;
pub mod donations;
pub mod error;
pub mod expenses;
pub mod keys;
pub mod login;
pub mod members;
pub mod range;
pub mod saving;
pub mod store;
pub mod summary;
pub mod table;
pub mod transaction;
pub mod uploads;
pub mod wide;
pub mod workbook;

#[cfg(feature = "web")]
pub mod app;

pub use error::{AppError, AppResult};
pub use keys::RollNumber;
pub use store::{MemoryStore, StoreError, TabularStore};
