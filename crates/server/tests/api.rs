use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Engine, NotificationSink, ReminderEvent, TokenIssuer};
use migration::MigratorTrait;
use server::{ServerState, router};

const SECRET: &str = "integration-secret-with-at-least-32-chars";

#[derive(Default)]
struct RecordingSink(Mutex<Vec<ReminderEvent>>);

impl NotificationSink for RecordingSink {
    fn notify(&self, event: &ReminderEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

async fn app() -> (Router, DatabaseConnection, Arc<RecordingSink>) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    let sink = Arc::new(RecordingSink::default());
    let state = ServerState {
        engine: Arc::new(engine),
        tokens: Arc::new(TokenIssuer::new(SECRET, Duration::minutes(30)).unwrap()),
        sink: sink.clone(),
    };
    (router(state), db, sink)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Registers `login` and returns `(user_id, token)`.
async fn signup(app: &Router, login: &str) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "first_name": "Test",
            "last_name": login,
            "login": login,
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, token) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "login": login, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(token["token_type"], "bearer");
    (
        body["id"].as_str().unwrap().to_string(),
        token["access_token"].as_str().unwrap().to_string(),
    )
}

async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let (app, _db, _sink) = app().await;
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_login_and_me() {
    let (app, _db, _sink) = app().await;
    let (user_id, token) = signup(&app, "alice").await;

    let (status, me) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user_id.as_str());
    assert_eq!(me["login"], "alice");
    assert!(me.get("password").is_none());

    let (status, refreshed) =
        send(&app, "POST", "/api/auth/refresh-token", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["user_id"], user_id.as_str());
}

#[tokio::test]
async fn duplicate_login_is_conflict() {
    let (app, db, _sink) = app().await;
    signup(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "first_name": "Other",
            "last_name": "Alice",
            "login": "alice",
            "password": "secret-pass",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
    assert_eq!(count_rows(&db, "users").await, 1);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (app, _db, _sink) = app().await;
    signup(&app, "alice").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "login": "alice", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let (app, _db, _sink) = app().await;

    let (status, _) = send(&app, "GET", "/api/transactions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/groups", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_then_login_with_new_one() {
    let (app, _db, _sink) = app().await;
    let (_, token) = signup(&app, "alice").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/auth/change-password",
        Some(&token),
        Some(json!({ "current_password": "wrong", "new_password": "another-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "PUT",
        "/api/auth/change-password",
        Some(&token),
        Some(json!({ "current_password": "password123", "new_password": "another-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "login": "alice", "password": "another-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn group_sharing_requires_membership() {
    let (app, _db, _sink) = app().await;
    let (_, alice) = signup(&app, "alice").await;
    let (bob_id, bob) = signup(&app, "bob").await;

    let (status, group) = send(
        &app,
        "POST",
        "/api/groups",
        Some(&alice),
        Some(json!({ "name": "Flat" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = group["id"].as_str().unwrap().to_string();

    // Bob is not a member yet.
    let (status, _) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(&bob),
        Some(json!({
            "name": "Groceries",
            "type": "expense",
            "category": "food",
            "amount": "12.50",
            "group_ids": [group_id],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, added) = send(
        &app,
        "POST",
        &format!("/api/groups/{group_id}/users/{bob_id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(added["status"], "added");

    let (status, again) = send(
        &app,
        "POST",
        &format!("/api/groups/{group_id}/users/{bob_id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["status"], "already_member");

    let (status, created) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(&bob),
        Some(json!({
            "name": "Groceries",
            "type": "expense",
            "category": "food",
            "amount": 12.5,
            "group_ids": [group_id],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["amount"], "12.50");
    assert_eq!(created["groups"][0]["name"], "Flat");

    let (status, page) = send(
        &app,
        "GET",
        &format!("/api/transactions/group/{group_id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["pages"], 1);

    let (status, stats) = send(
        &app,
        "GET",
        &format!("/api/transactions/group/{group_id}/stats?period=year"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_expense_minor"], 1250);
    assert_eq!(stats["by_category"]["food"], 1250);

    let (status, members) = send(
        &app,
        "GET",
        &format!("/api/groups/{group_id}/users"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn negative_amount_is_rejected_and_nothing_is_stored() {
    let (app, db, _sink) = app().await;
    let (_, token) = signup(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(&token),
        Some(json!({
            "name": "Refund",
            "type": "income",
            "category": "misc",
            "amount": "-5.00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
    assert_eq!(count_rows(&db, "transactions").await, 0);
}

#[tokio::test]
async fn foreign_transaction_is_not_found() {
    let (app, _db, _sink) = app().await;
    let (_, alice) = signup(&app, "alice").await;
    let (_, bob) = signup(&app, "bob").await;

    let (_, created) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(&alice),
        Some(json!({
            "name": "Rent",
            "type": "expense",
            "category": "housing",
            "amount": "900",
        })),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/transactions/{id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/transactions/{id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn update_and_list_with_paging() {
    let (app, _db, _sink) = app().await;
    let (_, token) = signup(&app, "alice").await;

    let mut ids = Vec::new();
    for i in 0..3 {
        let (status, created) = send(
            &app,
            "POST",
            "/api/transactions",
            Some(&token),
            Some(json!({
                "name": format!("Coffee {i}"),
                "type": "expense",
                "category": "food",
                "amount": "3.20",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(created["id"].as_str().unwrap().to_string());
    }

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/transactions/{}", ids[0]),
        Some(&token),
        Some(json!({ "category": "drinks" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["category"], "drinks");
    assert_eq!(updated["name"], "Coffee 0");

    let (status, page) = send(
        &app,
        "GET",
        "/api/transactions?page=2&size=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let (status, filtered) = send(
        &app,
        "GET",
        "/api/transactions?category=drinks",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered["total"], 1);

    let (status, _) = send(&app, "GET", "/api/transactions?size=0", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        "GET",
        "/api/transactions?page=18446744073709551615",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn reminders_are_pushed_to_the_sink() {
    let (app, _db, sink) = app().await;
    let (_, token) = signup(&app, "alice").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(&token),
        Some(json!({
            "name": "Gym",
            "type": "expense",
            "category": "sport",
            "amount": "30",
            "is_recurring": true,
            "recurring_period_days": 30,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "GET", "/reminders", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["events"][0]["bucket"], "due_today");
    assert_eq!(sink.0.lock().unwrap().len(), 1);
}
