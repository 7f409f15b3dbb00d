use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use log::info;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::attendance::AttendanceLedger;
use crate::config::{Config, StoreKind};
use crate::donations::DonationLedger;
use crate::error::{AppError, AppResult, JsonError};
use crate::expenses::{ExpenseLedger, NewExpense};
use crate::keys::{Loose, RollNumber, required};
use crate::login::{AuthGate, UserCredentials};
use crate::members::{MemberFields, MemberLedger};
use crate::saving::FileStore;
use crate::store::{MemoryStore, TabularStore};
use crate::summary::SummaryAggregator;
use crate::uploads::Uploads;
use crate::wide::{MonthKey, format_amount};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TabularStore>,
    pub uploads: Uploads,
}

impl AppState {
    pub fn new(store: Arc<dyn TabularStore>, uploads: Uploads) -> Self {
        AppState { store, uploads }
    }

    fn store(&self) -> &dyn TabularStore {
        self.store.as_ref()
    }
}

#[derive(Deserialize)]
struct RollRequest {
    #[serde(rename = "RollNumber")]
    roll_number: Option<Loose>,
}

#[derive(Deserialize)]
struct ChangeRollRequest {
    #[serde(rename = "oldRollNumber")]
    old: Option<Loose>,
    #[serde(rename = "newRollNumber")]
    new: Option<Loose>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DonationRequest {
    roll_number: Option<Loose>,
    year: Option<Loose>,
    month: Option<Loose>,
    amount: Option<Loose>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttendanceRequest {
    year: Option<Loose>,
    month: Option<Loose>,
    date: Option<Loose>,
    roll_number: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExpenseRequest {
    year: Option<Loose>,
    month: Option<Loose>,
    amount: Option<Loose>,
    description: Option<Loose>,
}

#[derive(Deserialize)]
struct ExpenseIdRequest {
    id: Option<Loose>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    roll_number: Option<Loose>,
    login_id: Option<Loose>,
    password: Option<Loose>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    login_id: Option<Loose>,
    password: Option<Loose>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest {
    roll_number: Option<Loose>,
    action: Option<Loose>,
}

pub fn router(state: AppState) -> Router {
    let members = Router::new()
        .route("/", get(list_members))
        .route("/add", post(add_member))
        .route("/delete", post(delete_member))
        .route("/change-roll-number", post(change_roll_number))
        .route("/:rollNumber", get(get_member));

    let donations = Router::new()
        .route("/", get(list_donations))
        .route("/add", post(add_donation))
        .route("/delete", post(delete_donation))
        .route("/:rollNumber", get(get_donation));

    let attendance = Router::new()
        .route("/", get(list_attendance))
        .route("/mark-attendance", post(mark_attendance))
        .route("/delete-attendance", post(delete_attendance))
        .route("/:rollNumber", get(get_attendance));

    let expenses = Router::new()
        .route("/", get(list_expenses))
        .route("/add", post(add_expense))
        .route("/delete", post(delete_expense));

    let user = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/status", post(update_status))
        .route("/user-status", get(user_status));

    let api = Router::new()
        .nest("/members", members)
        .nest("/donations", donations)
        .nest("/attendance", attendance)
        .nest("/expenses", expenses)
        .nest("/user", user)
        .route("/summary", get(summary));

    Router::new()
        .route("/ping", get(ping))
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(state.uploads.dir()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn TabularStore> = match config.store {
        StoreKind::File => Arc::new(FileStore::open(&config.workbook_path)?),
        StoreKind::Memory => {
            info!("Using an in-memory workbook; data is lost on exit");
            Arc::new(MemoryStore::seeded())
        }
    };

    let uploads = Uploads::new(&config.uploads_dir);
    uploads.ensure_dir()?;

    let app = router(AppState::new(store, uploads));

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    info!("Server running on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ping() -> &'static str {
    "Server is alive"
}

fn roll_from_path(raw: &str) -> AppResult<RollNumber> {
    RollNumber::new(raw).ok_or_else(|| AppError::Validation("RollNumber is required".to_string()))
}

fn month_key(year: &str, month: &str) -> AppResult<MonthKey> {
    MonthKey::new(year, month)
        .ok_or_else(|| AppError::Validation("Year and Month must each be a single word".to_string()))
}

// Members

async fn list_members(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(MemberLedger::new(state.store()).list()?))
}

async fn get_member(
    Path(roll): Path<String>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let roll = roll_from_path(&roll)?;
    Ok(Json(MemberLedger::new(state.store()).profile(&roll)?))
}

async fn add_member(State(state): State<AppState>, mut multipart: Multipart) -> AppResult<String> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut photo: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "Photo" && field.file_name().is_some() {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| AppError::Validation(e.to_string()))?;
            if !bytes.is_empty() {
                photo = Some((file_name, bytes.to_vec()));
            }
        } else {
            let value = field.text().await.map_err(|e| AppError::Validation(e.to_string()))?;
            pairs.push((name, value));
        }
    }

    let roll = pairs
        .iter()
        .find(|(name, _)| name == "RollNumber")
        .and_then(|(_, value)| RollNumber::new(value))
        .ok_or_else(|| AppError::Validation("RollNumber is required".to_string()))?;
    let fields = MemberFields::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let photo_name = match photo {
        Some((original, bytes)) => {
            let name = Uploads::photo_name(&roll, original.as_deref());
            state
                .uploads
                .save(&name, &bytes)
                .map_err(|e| AppError::Internal(format!("Could not store photo: {e}")))?;
            Some(name)
        }
        None => None,
    };

    let placement = MemberLedger::new(state.store()).add_or_update(&roll, &fields, photo_name.as_deref())?;
    Ok(placement.message().to_string())
}

async fn delete_member(
    State(state): State<AppState>,
    Json(body): Json<RollRequest>,
) -> AppResult<String> {
    let roll = body
        .roll_number
        .and_then(|r| r.to_roll_number())
        .ok_or_else(|| AppError::Validation("RollNumber is required".to_string()))?;

    MemberLedger::new(state.store()).with_uploads(&state.uploads).delete(&roll)?;
    Ok("Member deleted successfully.".to_string())
}

async fn change_roll_number(
    State(state): State<AppState>,
    Json(body): Json<ChangeRollRequest>,
) -> AppResult<String> {
    let (Some(old), Some(new)) = (
        body.old.and_then(|r| r.to_roll_number()),
        body.new.and_then(|r| r.to_roll_number()),
    ) else {
        return Err(AppError::Validation(
            "Both oldRollNumber and newRollNumber are required".to_string(),
        ));
    };

    MemberLedger::new(state.store())
        .with_uploads(&state.uploads)
        .change_roll_number(&old, &new)?;
    Ok(format!(
        "Roll number data moved from {old} to {new} successfully (old data cleared and photo removed)"
    ))
}

// Donations

async fn list_donations(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(DonationLedger::new(state.store()).list()?))
}

async fn get_donation(
    Path(roll): Path<String>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let roll = roll_from_path(&roll)?;
    Ok(Json(DonationLedger::new(state.store()).get(&roll)?))
}

fn donation_input(body: &DonationRequest) -> AppResult<(RollNumber, MonthKey, &str)> {
    let (Some(roll), Some(year), Some(month), Some(amount)) = (
        required(&body.roll_number).and_then(RollNumber::new),
        required(&body.year),
        required(&body.month),
        required(&body.amount),
    ) else {
        return Err(AppError::Validation(
            "RollNumber, Year, Month, and Amount are required".to_string(),
        ));
    };
    Ok((roll, month_key(year, month)?, amount))
}

async fn add_donation(
    State(state): State<AppState>,
    Json(body): Json<DonationRequest>,
) -> AppResult<String> {
    let (roll, key, amount) = donation_input(&body)?;
    let receipt = DonationLedger::new(state.store()).add_or_update(&roll, &key, amount)?;
    Ok(receipt.message())
}

async fn delete_donation(
    State(state): State<AppState>,
    Json(body): Json<DonationRequest>,
) -> AppResult<String> {
    let (roll, key, amount) = donation_input(&body)?;
    let remaining = DonationLedger::new(state.store()).delete(&roll, &key, amount)?;
    Ok(format!(
        "Donation deleted successfully. Remaining for {key} is {}",
        format_amount(remaining)
    ))
}

// Attendance

async fn list_attendance(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(AttendanceLedger::new(state.store()).list()?))
}

async fn get_attendance(
    Path(roll): Path<String>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let roll = roll_from_path(&roll)?;
    Ok(Json(AttendanceLedger::new(state.store()).get(&roll)?))
}

fn attendance_input(body: &AttendanceRequest) -> AppResult<(MonthKey, &str, Vec<RollNumber>)> {
    let missing = || AppError::Validation("Year, Month, Date, and RollNumber array are required.".to_string());

    let (Some(year), Some(month), Some(date), Some(Value::Array(values))) = (
        required(&body.year),
        required(&body.month),
        required(&body.date),
        body.roll_number.as_ref(),
    ) else {
        return Err(missing());
    };

    let rolls = values
        .iter()
        .map(|value| Loose::from_json(value).and_then(|v| v.to_roll_number()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| AppError::Validation("RollNumber array may only hold roll numbers".to_string()))?;

    Ok((month_key(year, month)?, date, rolls))
}

async fn mark_attendance(
    State(state): State<AppState>,
    Json(body): Json<AttendanceRequest>,
) -> AppResult<String> {
    let (key, date, rolls) = attendance_input(&body)?;
    AttendanceLedger::new(state.store()).mark(&key, date, &rolls)?;
    Ok("Attendance marked successfully.".to_string())
}

async fn delete_attendance(
    State(state): State<AppState>,
    Json(body): Json<AttendanceRequest>,
) -> AppResult<String> {
    let (key, date, rolls) = attendance_input(&body)?;
    AttendanceLedger::new(state.store()).unmark(&key, date, &rolls)?;
    Ok("Attendance date removed successfully.".to_string())
}

// Expenses

async fn list_expenses(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(ExpenseLedger::new(state.store()).list()?))
}

async fn add_expense(
    State(state): State<AppState>,
    Json(body): Json<ExpenseRequest>,
) -> AppResult<String> {
    let (Some(year), Some(month), Some(amount), Some(description)) = (
        required(&body.year),
        required(&body.month),
        required(&body.amount),
        required(&body.description),
    ) else {
        return Err(AppError::Validation(
            "Year, Month, Amount, and Description are required".to_string(),
        ));
    };

    ExpenseLedger::new(state.store()).add(&NewExpense {
        year,
        month,
        amount,
        description,
    })?;
    Ok("Expense added successfully".to_string())
}

async fn delete_expense(
    State(state): State<AppState>,
    Json(body): Json<ExpenseIdRequest>,
) -> AppResult<String> {
    let id = required(&body.id).ok_or_else(|| AppError::Validation("ID is required".to_string()))?;
    ExpenseLedger::new(state.store()).delete(id.trim())?;
    Ok("Expense deleted successfully".to_string())
}

// Summary

async fn summary(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(SummaryAggregator::new(state.store()).compute_summary()?))
}

// User

async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<Json<Value>, JsonError> {
    let (Some(roll), Some(login_id), Some(password)) = (
        required(&body.roll_number).and_then(RollNumber::new),
        required(&body.login_id),
        required(&body.password),
    ) else {
        return Err(AppError::Validation("All fields required".to_string()).into());
    };

    AuthGate::new(state.store()).signup(&roll, login_id, password)?;
    Ok(Json(json!({
        "success": true,
        "message": "Signup successful, waiting for approval",
    })))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, JsonError> {
    let (Some(login_id), Some(password)) = (required(&body.login_id), required(&body.password)) else {
        return Err(AppError::Validation("loginId and password required".to_string()).into());
    };

    let user = AuthGate::new(state.store()).login(&UserCredentials { login_id, password })?;
    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "user": user,
    })))
}

async fn update_status(
    State(state): State<AppState>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<Value>, JsonError> {
    let (Some(roll), Some(action)) = (
        required(&body.roll_number).and_then(RollNumber::new),
        required(&body.action),
    ) else {
        return Err(AppError::Validation("rollNumber and action (approve/delete) required".to_string()).into());
    };

    let gate = AuthGate::new(state.store());
    let message = match action {
        "approve" => {
            gate.approve(&roll)?;
            "User approved, credentials moved, and admin roles set to false"
        }
        "delete" => {
            gate.reject(&roll)?;
            "User deleted from UserStatus"
        }
        _ => {
            return Err(AppError::Validation("Invalid action. Use 'approve' or 'delete'.".to_string()).into());
        }
    };

    Ok(Json(json!({ "success": true, "message": message })))
}

async fn user_status(State(state): State<AppState>) -> Result<Json<Value>, JsonError> {
    let data = AuthGate::new(state.store()).pending()?;
    Ok(Json(json!({ "success": true, "data": data })))
}
