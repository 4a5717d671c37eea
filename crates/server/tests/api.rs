use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::{Engine as _, prelude::BASE64_STANDARD};
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Currency, Engine, FixedRateProvider};
use migration::MigratorTrait;
use server::ServerState;

const ALICE: (&str, &str) = ("alice", "password");
const BOB: (&str, &str) = ("bob", "hunter2");

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for (username, password) in [ALICE, BOB] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![username.into(), password.into()],
        ))
        .await
        .unwrap();
    }

    let usd = Currency::try_from("USD").unwrap();
    let rates = FixedRateProvider::new().with_rate(&usd, &Currency::base(), 300.0);
    let engine = Engine::builder()
        .database(db.clone())
        .rate_provider(Arc::new(rates))
        .build()
        .await
        .unwrap();
    server::router(ServerState::new(engine, db))
}

fn basic((username, password): (&str, &str)) -> String {
    format!(
        "Basic {}",
        BASE64_STANDARD.encode(format!("{username}:{password}"))
    )
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    auth: Option<(&str, &str)>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        request = request.header(header::AUTHORIZATION, basic(auth));
    }
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&body).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn expense(amount_minor: i64, category: &str, date: &str) -> Value {
    json!({
        "amount_minor": amount_minor,
        "type": "expense",
        "category": category,
        "date": date,
    })
}

#[tokio::test]
async fn requests_without_valid_credentials_are_rejected() {
    let app = app().await;

    let (status, _) = call(&app, Method::GET, "/transactions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        Method::GET,
        "/transactions",
        Some(("alice", "wrong")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Prefixes of a real username must not match.
    let (status, _) = call(&app, Method::GET, "/budgets", Some(("ali", "password")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_transaction_reports_missing_fields() {
    let app = app().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/transactions",
        Some(ALICE),
        Some(json!({ "type": "expense", "category": "Food", "date": "2025-03-10T10:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing required field: amount");
}

#[tokio::test]
async fn decimal_amount_and_camel_case_date_filters_are_accepted() {
    let app = app().await;

    let (status, tx) = call(
        &app,
        Method::POST,
        "/transactions",
        Some(ALICE),
        Some(json!({
            "amount": 500,
            "type": "expense",
            "category": "Food",
            "date": "2025-01-15T10:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tx["amount_minor"], 50_000);

    let (status, _) = call(
        &app,
        Method::POST,
        "/transactions",
        Some(ALICE),
        Some(json!({
            "amount": 12.5,
            "type": "expense",
            "category": "Food",
            "date": "2025-06-15T10:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app,
        Method::GET,
        "/transactions?startDate=2025-03-01&endDate=2025-03-31",
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 0);

    let (_, body) = call(
        &app,
        Method::GET,
        "/transactions?startDate=2025-06-01&endDate=2025-06-30",
        Some(ALICE),
        None,
    )
    .await;
    let listed = body["transactions"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["amount_minor"], 1_250);
}

#[tokio::test]
async fn expense_over_budget_notifies_the_owner() {
    let app = app().await;

    let (status, budget) = call(
        &app,
        Method::POST,
        "/budgets",
        Some(ALICE),
        Some(json!({ "category": "Food", "limit_minor": 50_000, "month": 3, "year": 2025 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(budget["alert_sent"], false);

    let (status, _) = call(
        &app,
        Method::POST,
        "/transactions",
        Some(ALICE),
        Some(expense(45_000, "Food", "2025-03-05T12:00:00Z")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, notifications) = call(&app, Method::GET, "/notify", Some(ALICE), None).await;
    assert!(notifications["notifications"].as_array().unwrap().is_empty());

    let (status, tx) = call(
        &app,
        Method::POST,
        "/transactions",
        Some(ALICE),
        Some(expense(10_000, " food ", "2025-03-20T09:30:00+05:30")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tx["currency"], "LKR");
    assert_eq!(tx["amount_minor"], 10_000);

    let (_, notifications) = call(&app, Method::GET, "/notify", Some(ALICE), None).await;
    let notifications = notifications["notifications"].as_array().unwrap().clone();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "budget_exceeded");
    assert_eq!(notifications[0]["status"], "unread");
    assert_eq!(
        notifications[0]["message"],
        "Your budget for food has been exceeded. Limit: 500.00 LKR, Spent: 550.00 LKR"
    );

    let uri = format!("/budgets/{}", budget["id"].as_str().unwrap());
    let (_, budget) = call(&app, Method::GET, &uri, Some(ALICE), None).await;
    assert_eq!(budget["alert_sent"], true);

    let (status, report) = call(
        &app,
        Method::GET,
        "/budgets/status/check?month=3&year=2025",
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["budgets"][0]["spent_minor"], 55_000);
    assert_eq!(report["budgets"][0]["percentage"], 110.0);

    let (status, _) = call(
        &app,
        Method::GET,
        "/budgets/status/check?month=3",
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_budget_is_rejected() {
    let app = app().await;
    let body = json!({ "category": "Food", "limit_minor": 1_000, "month": 1, "year": 2025 });

    let (status, _) = call(&app, Method::POST, "/budgets", Some(ALICE), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &app,
        Method::POST,
        "/budgets",
        Some(ALICE),
        Some(json!({ "category": "  FOOD", "limit_minor": 2_000, "month": 1, "year": 2025 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Another owner may budget the same period.
    let (status, _) = call(&app, Method::POST, "/budgets", Some(BOB), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn records_are_scoped_to_their_owner() {
    let app = app().await;

    let (_, tx) = call(
        &app,
        Method::POST,
        "/transactions",
        Some(ALICE),
        Some(expense(1_200, "Transport", "2025-04-01T08:00:00Z")),
    )
    .await;
    let uri = format!("/transactions/{}", tx["id"].as_str().unwrap());

    let (status, body) = call(&app, Method::GET, &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, Method::DELETE, &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        Method::GET,
        "/budgets/6f1c1e6e-3c55-4a4e-9f64-2d3f0b7a1c11",
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::DELETE, "/budgets/not-a-uuid", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, Method::DELETE, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Transaction deleted successfully");

    let (status, _) = call(&app, Method::GET, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn foreign_amounts_are_converted_to_the_base_currency() {
    let app = app().await;

    let (status, tx) = call(
        &app,
        Method::POST,
        "/transactions",
        Some(ALICE),
        Some(json!({
            "amount_minor": 1_000,
            "currency": "usd",
            "type": "expense",
            "category": "Travel",
            "tags": ["trip", "flight", "trip"],
            "date": "2025-05-02T15:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tx["amount_minor"], 300_000);
    assert_eq!(tx["original_amount_minor"], 1_000);
    assert_eq!(tx["currency"], "USD");
    assert_eq!(tx["tags"], json!(["flight", "trip"]));

    let (status, body) = call(
        &app,
        Method::POST,
        "/transactions",
        Some(ALICE),
        Some(json!({
            "amount_minor": 1_000,
            "currency": "EUR",
            "type": "expense",
            "category": "Travel",
            "date": "2025-05-02T15:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("exchange rate unavailable")
    );

    let (status, rate) = call(
        &app,
        Method::GET,
        "/exchange-rate?base=usd&target=LKR",
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rate, json!({ "base": "USD", "target": "LKR", "rate": 300.0 }));
}

#[tokio::test]
async fn income_is_allocated_to_auto_goals() {
    let app = app().await;

    let (status, goal) = call(
        &app,
        Method::POST,
        "/goals",
        Some(ALICE),
        Some(json!({
            "name": "Laptop",
            "target_minor": 1_000_000,
            "deadline": "2025-12-31",
            "auto_allocate": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(goal["current_minor"], 0);

    let (status, _) = call(
        &app,
        Method::POST,
        "/transactions",
        Some(ALICE),
        Some(json!({
            "amount_minor": 100_000,
            "type": "income",
            "category": "Salary",
            "date": "2025-06-01T09:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/goals/{}", goal["id"].as_str().unwrap());
    let (_, goal) = call(&app, Method::GET, &uri, Some(ALICE), None).await;
    assert_eq!(goal["current_minor"], 10_000);

    let (_, notifications) = call(&app, Method::GET, "/notify", Some(ALICE), None).await;
    let messages: Vec<&str> = notifications["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages.len(), 2);
    assert!(messages.contains(&"100.00 LKR has been allocated to your goal \"Laptop\"."));
    assert!(messages.contains(
        &"A total of 100.00 LKR from your income has been allocated to your savings goals."
    ));

    let (_, list) = call(
        &app,
        Method::GET,
        "/transactions?category=Savings:%20Laptop",
        Some(ALICE),
        None,
    )
    .await;
    let savings = list["transactions"].as_array().unwrap();
    assert_eq!(savings.len(), 1);
    assert_eq!(savings[0]["amount_minor"], 10_000);
    assert_eq!(savings[0]["goal_id"], goal["id"]);

    // A manual contribution raises the savings and is booked as well.
    let (status, goal) = call(
        &app,
        Method::PUT,
        &uri,
        Some(ALICE),
        Some(json!({ "current_minor": 25_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(goal["current_minor"], 25_000);
}

#[tokio::test]
async fn report_aggregates_the_requested_range() {
    let app = app().await;

    for (amount, kind, category) in [
        (500, "income", "Food"),
        (300, "expense", "Transport"),
        (200, "income", "Food"),
        (150, "expense", "Food"),
    ] {
        let (status, _) = call(
            &app,
            Method::POST,
            "/transactions",
            Some(ALICE),
            Some(json!({
                "amount_minor": amount,
                "type": kind,
                "category": category,
                "date": "2025-02-14T12:00:00Z",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, report) = call(
        &app,
        Method::POST,
        "/reports",
        Some(ALICE),
        Some(json!({ "type": "monthly", "start_date": "2025-02-01", "end_date": "2025-02-28" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(report["data"]["total_income_minor"], 700);
    assert_eq!(report["data"]["total_expense_minor"], 450);
    assert_eq!(report["data"]["net_balance_minor"], 250);
    assert_eq!(
        report["data"]["category_breakdown"],
        json!({ "Food": 850, "Transport": 300 })
    );

    let (_, reports) = call(&app, Method::GET, "/reports", Some(ALICE), None).await;
    assert_eq!(reports["reports"].as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        Method::POST,
        "/reports",
        Some(ALICE),
        Some(json!({ "start_date": "2025-03-01", "end_date": "2025-02-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notifications_can_be_read_and_deleted() {
    let app = app().await;

    let (status, created) = call(
        &app,
        Method::POST,
        "/notify",
        Some(ALICE),
        Some(json!({ "message": "Pay rent", "type": "reminder" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap();

    let (status, read) = call(
        &app,
        Method::PUT,
        &format!("/notify/{id}/read"),
        Some(ALICE),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["status"], "read");

    let (status, _) = call(&app, Method::DELETE, &format!("/notify/{id}"), Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::DELETE, &format!("/notify/{id}"), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = call(&app, Method::GET, "/notify", Some(ALICE), None).await;
    assert!(list["notifications"].as_array().unwrap().is_empty());
}
