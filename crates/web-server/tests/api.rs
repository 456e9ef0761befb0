use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use configuration::AccountSettings;
use http_body_util::BodyExt;
use ledger::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use web_server::{build_router, AppState};

fn app() -> Router {
    let state = AppState::new(Arc::new(MemoryStore::new()), AccountSettings::default());
    build_router(Arc::new(state))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(body) => Body::from(body.to_string()),
        None => Body::empty(),
    };
    send_raw(app, method, uri, body).await
}

async fn send_raw(app: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

/// Decimals travel as JSON strings.
fn dec(value: &Value) -> String {
    value.as_str().unwrap().to_string()
}

async fn open_account(app: &Router) -> String {
    let (status, account) = send(app, "POST", "/api/accounts", Some(json!({ "name": "alice" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    account["account_id"].as_str().unwrap().to_string()
}

async fn list_instrument(app: &Router, symbol: &str, price: &str) {
    let (status, _) = send(
        app,
        "POST",
        "/api/instruments",
        Some(json!({ "symbol": symbol, "name": "Test Co", "sector": "Tech", "price": price })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn health() {
    let (status, body) = send(&app(), "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn trade_round_trip() {
    let app = app();
    list_instrument(&app, "X", "100").await;
    let id = open_account(&app).await;

    let (status, receipt) = send(
        &app,
        "POST",
        &format!("/api/accounts/{id}/buy"),
        Some(json!({ "symbol": "X", "quantity": 10, "price": "100" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&receipt["cash_balance"]), "9000");
    assert_eq!(receipt["transaction"]["side"], "BUY");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/instruments/X/price",
        Some(json!({ "price": "120" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, report) = send(&app, "GET", &format!("/api/accounts/{id}/positions"), None).await;
    assert_eq!(report["positions"][0]["shares"], 10);
    assert_eq!(dec(&report["positions"][0]["unrealized_gain"]), "200");
    assert_eq!(dec(&report["summary"]["total_value"]), "10200");

    let (status, account) =
        send(&app, "POST", &format!("/api/accounts/{id}/revalue"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&account["total_value"]), "10200");

    let (status, receipt) = send(
        &app,
        "POST",
        &format!("/api/accounts/{id}/sell"),
        Some(json!({ "symbol": "X", "quantity": 4, "price": "125" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dec(&receipt["realized_gain"]), "100");

    let (_, history) = send(&app, "GET", &format!("/api/accounts/{id}/transactions"), None).await;
    let sides: Vec<_> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["side"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(sides, vec!["SELL", "BUY"]);

    let (_, lots) = send(&app, "GET", &format!("/api/accounts/{id}/lots"), None).await;
    assert_eq!(lots[0]["remaining_quantity"], 6);
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let app = app();
    list_instrument(&app, "X", "10").await;
    let id = open_account(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/accounts/{id}/buy"),
        Some(json!({ "symbol": "X", "quantity": 2000, "price": "10" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Insufficient funds"));

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/accounts/{id}/sell"),
        Some(json!({ "symbol": "X", "quantity": 1, "price": "10" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("only have 0 shares"));

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/accounts/{id}/buy"),
        Some(json!({ "symbol": "X", "quantity": 0, "price": "10" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/instruments/NOPE", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let stranger = uuid::Uuid::new_v4();
    let (status, _) = send(&app, "GET", &format!("/api/accounts/{stranger}/positions"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/instruments",
        Some(json!({ "symbol": "X", "name": "Again", "price": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "GET", "/api/accounts/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreadable_bodies_still_answer_with_a_json_error() {
    let app = app();
    list_instrument(&app, "X", "10").await;
    let id = open_account(&app).await;
    let buy = format!("/api/accounts/{id}/buy");

    let (status, body) = send_raw(&app, "POST", &buy, Body::from("{\"symbol\": ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        &buy,
        Some(json!({ "symbol": "X", "quantity": "ten", "price": "10" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("quantity"));

    let (status, body) = send(&app, "POST", "/api/accounts", Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn oversized_orders_are_rejected_not_crashed() {
    let app = app();
    list_instrument(&app, "X", "10").await;
    let id = open_account(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/accounts/{id}/buy"),
        Some(json!({
            "symbol": "X",
            "quantity": i64::MAX,
            "price": "79228162514264337593543950335"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Insufficient funds"));
}
