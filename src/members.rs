//! Members, Donations and Attendance handled as one record per roll number.

use chrono::Local;
use log::info;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::keys::RollNumber;
use crate::store::TabularStore;
use crate::table::{Record, Table};
use crate::transaction::Transaction;
use crate::uploads::Uploads;
use crate::wide::{CellFilter, MonthGrid, decode_wide_row, format_amount, row_total};
use crate::workbook::{
    ATTENDANCE_SHEET, DELETED_DONATIONS_SHEET, DONATIONS_SHEET, MEMBER_HEADERS, MEMBERS_SHEET, ROLL_NUMBER,
    WIDE_HEADERS, deleted_donations_range, members_range, wide_range,
};

/// Profile fields accepted from the add form. Anything else is ignored.
#[derive(Clone, Debug, Default)]
pub struct MemberFields {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl MemberFields {
    /// Picks the recognised fields out of form input.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut fields = MemberFields::default();
        for (name, value) in pairs {
            let slot = match name {
                "Name" => &mut fields.name,
                "LastName" => &mut fields.last_name,
                "PhoneNumber" => &mut fields.phone_number,
                "Address" => &mut fields.address,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        fields
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Updated,
    ReusedEmptyRow,
    Appended,
}

impl Placement {
    pub fn message(self) -> &'static str {
        match self {
            Placement::Updated => "Member updated successfully",
            Placement::ReusedEmptyRow => "Member added successfully in empty row",
            Placement::Appended => "Member added successfully",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteOutcome {
    pub member_cleared: bool,
    pub donations_cleared: bool,
    pub attendance_cleared: bool,
    /// Donation total archived to DeletedDonations, when it was nonzero.
    pub archived_total: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenameOutcome {
    pub donations_moved: bool,
    pub attendance_moved: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct MemberProfile {
    #[serde(rename = "RollNumber")]
    pub roll_number: String,
    pub member: Record,
    pub donations: MonthGrid,
    pub attendance: MonthGrid,
}

pub struct MemberLedger<'a> {
    store: &'a dyn TabularStore,
    uploads: Option<&'a Uploads>,
}

impl<'a> MemberLedger<'a> {
    pub fn new(store: &'a dyn TabularStore) -> Self {
        MemberLedger { store, uploads: None }
    }

    /// Photo files are removed from `uploads` when a member's photo is dropped.
    pub fn with_uploads(mut self, uploads: &'a Uploads) -> Self {
        self.uploads = Some(uploads);
        self
    }

    fn members(&self) -> AppResult<Table> {
        let rows = self.store.read_range(MEMBERS_SHEET, &members_range())?;
        Ok(Table::from_rows(rows))
    }

    fn wide(&self, sheet: &str) -> AppResult<Table> {
        let rows = self.store.read_range(sheet, &wide_range())?;
        Ok(Table::from_rows_or(rows, &WIDE_HEADERS))
    }

    pub fn list(&self) -> AppResult<Vec<Record>> {
        Ok(self.members()?.records())
    }

    pub fn profile(&self, roll: &RollNumber) -> AppResult<MemberProfile> {
        let members = self.members()?;
        let index = members
            .find_row(roll)
            .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

        let mut member = members.record(index);
        member.remove(ROLL_NUMBER);

        let donations = self.wide(DONATIONS_SHEET)?;
        let attendance = self.wide(ATTENDANCE_SHEET)?;
        let decode = |table: &Table, filter| {
            table
                .find_row(roll)
                .map(|i| decode_wide_row(&table.headers, table.row(i), filter))
                .unwrap_or_default()
        };

        Ok(MemberProfile {
            roll_number: roll.to_string(),
            member,
            donations: decode(&donations, CellFilter::NonZero),
            attendance: decode(&attendance, CellFilter::NonEmpty),
        })
    }

    /// Writes the member's row, rebuilt from the header.
    ///
    /// The admin flags are written as `"False"` on every call, updates included.
    /// Login credentials are not part of the form and are carried over on update.
    pub fn add_or_update(
        &self,
        roll: &RollNumber,
        fields: &MemberFields,
        photo: Option<&str>,
    ) -> AppResult<Placement> {
        let mut members = self.members()?;
        let mut tx = Transaction::new(self.store, "member add");

        if members.headers.is_empty() {
            members.headers = MEMBER_HEADERS.iter().map(|h| h.to_string()).collect();
            tx.write_row(MEMBERS_SHEET, 0, members.headers.clone(), Vec::new());
        }

        let existing = members.find_row(roll);
        let carried = existing.map(|i| members.row(i));

        let mut row: Vec<String> = members
            .headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let value = match header.as_str() {
                    "Name" => fields.name.as_deref(),
                    "LastName" => fields.last_name.as_deref(),
                    "PhoneNumber" => fields.phone_number.as_deref(),
                    "Address" => fields.address.as_deref(),
                    "Photo" => photo,
                    "isAdmin" | "isSuperAdmin" => Some("False"),
                    "loginId" | "password" => carried.and_then(|r| r.get(col)).map(String::as_str),
                    _ => None,
                };
                value.unwrap_or("").to_string()
            })
            .collect();
        if row.is_empty() {
            row.push(String::new());
        }
        row[0] = roll.to_string();

        let (index, placement) = match (existing, members.find_empty_row()) {
            (Some(index), _) => (index, Placement::Updated),
            (None, Some(index)) => (index, Placement::ReusedEmptyRow),
            (None, None) => {
                tx.append(MEMBERS_SHEET, members_range(), row);
                tx.commit()?;
                info!("Member {roll} appended");
                return Ok(Placement::Appended);
            }
        };

        // Cover any stray cells past the header so the slot holds only this record.
        let previous = members.row(index).to_vec();
        if row.len() < previous.len() {
            row.resize(previous.len(), String::new());
        }
        tx.write_row(MEMBERS_SHEET, Table::sheet_row(index), row, previous);
        tx.commit()?;

        info!("Member {roll} written at row {}: {placement:?}", Table::sheet_row(index) + 1);
        Ok(placement)
    }

    /// Clears the member's cells in Members, Donations and Attendance, archiving
    /// a nonzero donation total first. Each table is looked up on its own.
    pub fn delete(&self, roll: &RollNumber) -> AppResult<DeleteOutcome> {
        let members = self.members()?;
        let donations = self.wide(DONATIONS_SHEET)?;
        let attendance = self.wide(ATTENDANCE_SHEET)?;

        let member_index = members.find_row(roll);
        let donation_index = donations.find_row(roll);
        let attendance_index = attendance.find_row(roll);

        if member_index.is_none() && donation_index.is_none() && attendance_index.is_none() {
            return Err(AppError::NotFound("RollNumber not found in any sheet".to_string()));
        }

        let mut tx = Transaction::new(self.store, "member delete");
        let mut outcome = DeleteOutcome::default();

        let name_col = members.column("Name").unwrap_or(1);
        let name = member_index.map(|i| members.cell(i, name_col)).unwrap_or("");
        let photo = member_index
            .zip(members.column("Photo"))
            .map(|(i, col)| members.cell(i, col))
            .filter(|photo| !photo.is_empty())
            .map(str::to_string);

        if let Some(index) = donation_index {
            let total = row_total(donations.row(index));
            if total != 0.0 {
                let archived = vec![
                    roll.to_string(),
                    name.to_string(),
                    format_amount(total),
                    Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
                ];
                tx.append(DELETED_DONATIONS_SHEET, deleted_donations_range(), archived);
                outcome.archived_total = Some(total);
            }
            tx.write_row(
                DONATIONS_SHEET,
                Table::sheet_row(index),
                donations.blank_row(index, roll),
                donations.row(index).to_vec(),
            );
            outcome.donations_cleared = true;
        }

        if let Some(index) = member_index {
            tx.write_row(
                MEMBERS_SHEET,
                Table::sheet_row(index),
                members.blank_row(index, roll),
                members.row(index).to_vec(),
            );
            outcome.member_cleared = true;
        }

        if let Some(index) = attendance_index {
            tx.write_row(
                ATTENDANCE_SHEET,
                Table::sheet_row(index),
                attendance.blank_row(index, roll),
                attendance.row(index).to_vec(),
            );
            outcome.attendance_cleared = true;
        }

        tx.commit()?;
        info!(
            "Member {roll} deleted (members: {}, donations: {}, attendance: {}, archived: {:?})",
            outcome.member_cleared, outcome.donations_cleared, outcome.attendance_cleared, outcome.archived_total
        );

        if let (Some(photo), Some(uploads)) = (photo, self.uploads) {
            uploads.remove(&photo);
        }

        Ok(outcome)
    }

    /// Moves a member into the empty slot already reserved for `new`.
    ///
    /// Both roll numbers must exist in Members and `new` must hold no data. The
    /// photo is not carried over. Donations and Attendance move only when both
    /// roll numbers have a row in that sheet.
    pub fn change_roll_number(&self, old: &RollNumber, new: &RollNumber) -> AppResult<RenameOutcome> {
        if old == new {
            return Err(AppError::Validation(
                "oldRollNumber and newRollNumber must differ".to_string(),
            ));
        }

        let members = self.members()?;
        let (Some(old_index), Some(new_index)) = (members.find_row(old), members.find_row(new)) else {
            return Err(AppError::NotFound(format!(
                "RollNumber {old} or {new} not found in Members sheet"
            )));
        };

        if !members.is_blank_record(new_index) {
            return Err(AppError::Conflict(format!("First delete RollNumber {new}")));
        }

        let photo_col = members.column("Photo");
        let photo = photo_col
            .map(|col| members.cell(old_index, col))
            .filter(|photo| !photo.is_empty())
            .map(str::to_string);

        let mut tx = Transaction::new(self.store, "change roll number");
        stage_move(&mut tx, MEMBERS_SHEET, &members, old_index, new_index, new, photo_col);

        let mut outcome = RenameOutcome::default();
        for sheet in [DONATIONS_SHEET, ATTENDANCE_SHEET] {
            let table = self.wide(sheet)?;
            if let (Some(from), Some(to)) = (table.find_row(old), table.find_row(new)) {
                stage_move(&mut tx, sheet, &table, from, to, new, None);
                if sheet == DONATIONS_SHEET {
                    outcome.donations_moved = true;
                } else {
                    outcome.attendance_moved = true;
                }
            } else {
                info!("{sheet}: {old} -> {new} skipped, both rows are not present");
            }
        }

        tx.commit()?;
        info!("RollNumber {old} moved to {new}: {outcome:?}");

        if let (Some(photo), Some(uploads)) = (photo, self.uploads) {
            uploads.remove(&photo);
        }

        Ok(outcome)
    }
}

/// Copies data row `from` into row `to` under key `new`, then clears `from`.
fn stage_move(
    tx: &mut Transaction<'_>,
    sheet: &str,
    table: &Table,
    from: usize,
    to: usize,
    new: &RollNumber,
    skip_col: Option<usize>,
) {
    let width = table.width().max(table.row(from).len()).max(table.row(to).len()).max(1);

    let mut moved = table.padded_row(from, width);
    moved[0] = new.to_string();
    if let Some(col) = skip_col {
        moved[col].clear();
    }
    tx.write_row(sheet, Table::sheet_row(to), moved, table.row(to).to_vec());

    let old_key = table.cell(from, 0).trim().to_string();
    let mut cleared = vec![String::new(); width];
    cleared[0] = old_key;
    tx.write_row(sheet, Table::sheet_row(from), cleared, table.row(from).to_vec());
}
