#![cfg(feature = "web")]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use ledger::app::{AppState, router};
use ledger::store::MemoryStore;
use ledger::uploads::Uploads;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "ledger-test-boundary";

fn app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(Arc::new(MemoryStore::seeded()), Uploads::new(dir.path()));
    (router(state), dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, String) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

fn multipart_body(fields: &[(&str, &str)], photo: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = photo {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"Photo\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_member(app: &Router, fields: &[(&str, &str)], photo: Option<(&str, &[u8])>) -> (StatusCode, String) {
    let request = Request::post("/api/members/add")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(fields, photo)))
        .unwrap();
    send(app, request).await
}

#[tokio::test]
async fn test_ping() {
    let (app, _dir) = app();
    let (status, body) = get(&app, "/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Server is alive");
}

#[tokio::test]
async fn test_member_add_with_photo_and_profile() {
    let (app, dir) = app();

    let (status, body) = post_member(
        &app,
        &[("RollNumber", "101"), ("Name", "Asha"), ("Unknown", "ignored")],
        Some(("me.PNG", b"png-bytes".as_slice())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Member added successfully");
    assert!(dir.path().join("101.png").exists(), "photo stored under the roll number");

    let (status, body) = get(&app, "/api/members/101").await;
    assert_eq!(status, StatusCode::OK);
    let profile: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(profile["RollNumber"], "101");
    assert_eq!(profile["member"]["Name"], "Asha");
    assert_eq!(profile["member"]["Photo"], "101.png");
    assert_eq!(profile["donations"], json!({}));

    let (status, body) = get(&app, "/uploads/101.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "png-bytes");

    let (status, body) = get(&app, "/api/members").await;
    assert_eq!(status, StatusCode::OK);
    let list: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(list.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_member_add_requires_roll_number() {
    let (app, _dir) = app();
    let (status, body) = post_member(&app, &[("Name", "Asha")], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "RollNumber is required");
}

#[tokio::test]
async fn test_member_delete_and_rename_messages() {
    let (app, _dir) = app();
    post_member(&app, &[("RollNumber", "101"), ("Name", "Asha")], None).await;
    post_member(&app, &[("RollNumber", "102"), ("Name", "Ravi")], None).await;

    let (status, body) = post_json(&app, "/api/members/delete", json!({ "RollNumber": 102 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Member deleted successfully.");

    let (status, body) = post_json(&app, "/api/members/change-roll-number", json!({ "oldRollNumber": "101" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Both oldRollNumber and newRollNumber are required");

    let (status, body) = post_json(
        &app,
        "/api/members/change-roll-number",
        json!({ "oldRollNumber": "101", "newRollNumber": "102" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("Roll number data moved from 101 to 102 successfully"));

    let (status, _) = post_json(&app, "/api/members/delete", json!({ "RollNumber": "999" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_donation_routes() {
    let (app, _dir) = app();
    let add = json!({ "RollNumber": 101, "Year": 2025, "Month": "March", "Amount": "50" });

    let (status, body) = post_json(&app, "/api/donations/add", add.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Donation added successfully");

    let (status, body) = post_json(&app, "/api/donations/add", add).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Donation updated successfully. Total for 2025 March is 100");

    let (status, body) = get(&app, "/api/donations/101").await;
    assert_eq!(status, StatusCode::OK);
    let record: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(record, json!({ "RollNumber": "101", "2025": { "March": "100" } }));

    let (status, body) = post_json(
        &app,
        "/api/donations/delete",
        json!({ "RollNumber": "101", "Year": "2025", "Month": "March", "Amount": 150 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Donation deleted successfully. Remaining for 2025 March is 0");

    let (status, body) = post_json(&app, "/api/donations/add", json!({ "RollNumber": "101" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "RollNumber, Year, Month, and Amount are required");

    let (status, _) = get(&app, "/api/donations/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attendance_routes() {
    let (app, _dir) = app();
    let mark = json!({ "Year": "2025", "Month": "March", "Date": "2025-03-02", "RollNumber": ["101", 102] });

    let (status, body) = post_json(&app, "/api/attendance/mark-attendance", mark).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Attendance marked successfully.");

    let (status, body) = get(&app, "/api/attendance").await;
    assert_eq!(status, StatusCode::OK);
    let list: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(list[1], json!({ "RollNumber": "102", "2025": { "March": "2025-03-02" } }));

    let (status, body) = post_json(
        &app,
        "/api/attendance/mark-attendance",
        json!({ "Year": "2025", "Month": "March", "Date": "2025-03-02", "RollNumber": "101" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Year, Month, Date, and RollNumber array are required.");

    let (status, body) = post_json(
        &app,
        "/api/attendance/delete-attendance",
        json!({ "Year": "2025", "Month": "April", "Date": "2025-04-06", "RollNumber": ["101"] }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Column '2025 April' does not exist.");

    let (status, body) = post_json(
        &app,
        "/api/attendance/delete-attendance",
        json!({ "Year": "2025", "Month": "March", "Date": "2025-03-02", "RollNumber": ["101"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Attendance date removed successfully.");
}

#[tokio::test]
async fn test_expenses_and_summary() {
    let (app, _dir) = app();
    post_json(
        &app,
        "/api/donations/add",
        json!({ "RollNumber": "101", "Year": "2025", "Month": "March", "Amount": "200" }),
    )
    .await;

    let (status, body) = post_json(
        &app,
        "/api/expenses/add",
        json!({ "Year": "2025", "Month": "March", "Amount": 75, "Description": "Lamp oil" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Expense added successfully");

    let (_, body) = get(&app, "/api/expenses").await;
    let list: Value = serde_json::from_str(&body).unwrap();
    let id = list[0]["ID"].as_str().unwrap().to_string();

    let (_, body) = get(&app, "/api/summary").await;
    let summary: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(summary["totalDonations"], 200.0);
    assert_eq!(summary["totalExpenses"], 75.0);
    assert_eq!(summary["balance"], 125.0);

    let (status, body) = post_json(&app, "/api/expenses/delete", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "ID is required");

    let (status, body) = post_json(&app, "/api/expenses/delete", json!({ "id": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Expense deleted successfully");
}

#[tokio::test]
async fn test_user_flow() {
    let (app, _dir) = app();
    post_member(&app, &[("RollNumber", "55"), ("Name", "Asha")], None).await;

    let signup = json!({ "rollNumber": "55", "loginId": "asha55", "password": "pw" });
    let (status, body) = post_json(&app, "/api/user/signup", signup.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let reply: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(reply, json!({ "success": true, "message": "Signup successful, waiting for approval" }));

    let (status, body) = post_json(&app, "/api/user/signup", signup).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let reply: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(reply["success"], false);

    let (_, body) = get(&app, "/api/user/user-status").await;
    let reply: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(reply["data"][0]["loginId"], "asha55");

    let (status, _) = post_json(&app, "/api/user/status", json!({ "rollNumber": "55", "action": "promote" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(&app, "/api/user/status", json!({ "rollNumber": 55, "action": "approve" })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&app, "/api/user/login", json!({ "loginId": "asha55", "password": "nope" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let reply: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(reply, json!({ "success": false, "message": "Invalid credentials" }));

    let (status, body) = post_json(&app, "/api/user/login", json!({ "loginId": "asha55", "password": "pw" })).await;
    assert_eq!(status, StatusCode::OK);
    let reply: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(reply["message"], "Login successful");
    assert_eq!(reply["user"]["rollNumber"], "55");
    assert_eq!(reply["user"]["isAdmin"], "false");
}
