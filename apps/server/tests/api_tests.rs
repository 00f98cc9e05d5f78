use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use loanbook_server::{api::app_router, build_state, config::Config};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

async fn test_app() -> (TempDir, Router) {
    let tmp = tempdir().unwrap();
    let config = Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        db_path: tmp.path().join("test.db").to_string_lossy().to_string(),
        cors_allow: vec!["*".to_string()],
        request_timeout: Duration::from_secs(30),
    };
    let state = build_state(&config).await.unwrap();
    (tmp, app_router(state, &config))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).to_string())
        })
    };
    (status, value)
}

fn new_loan_body(commitment: f64) -> Value {
    json!({
        "projectId": "tower-a",
        "loanName": "Tower A construction",
        "loanType": "CONSTRUCTION",
        "commitmentAmount": commitment,
        "interestRate": 0.06,
        "rateType": "FIXED",
        "termMonths": 24,
        "ioPeriodMonths": 6,
        "originationFeePercent": 0.01,
        "firstPaymentDate": "2025-02-01"
    })
}

async fn create_loan(app: &Router, commitment: f64) -> String {
    let (status, loan) = send(app, "POST", "/api/v1/loans", Some(new_loan_body(commitment))).await;
    assert_eq!(status, StatusCode::CREATED);
    loan["id"].as_str().unwrap().to_string()
}

async fn move_to(app: &Router, loan_id: &str, status: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/api/v1/loans/{}/status", loan_id),
        Some(json!({ "status": status })),
    )
    .await
}

async fn funded_draw(app: &Router, loan_id: &str, amount: f64) -> (StatusCode, Value) {
    let (status, draw) = send(
        app,
        "POST",
        &format!("/api/v1/loans/{}/draws", loan_id),
        Some(json!({ "amount": amount, "drawDate": "2025-01-15" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let draw_id = draw["id"].as_str().unwrap().to_string();
    let (status, _) = send(app, "POST", &format!("/api/v1/draws/{}/approve", draw_id), None).await;
    assert_eq!(status, StatusCode::OK);
    send(app, "POST", &format!("/api/v1/draws/{}/fund", draw_id), None).await
}

#[tokio::test]
async fn healthz_works() {
    let (_tmp, app) = test_app().await;
    let (status, body) = send(&app, "GET", "/api/v1/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn facility_lifecycle_over_http() {
    let (_tmp, app) = test_app().await;
    let loan_id = create_loan(&app, 1_000_000.0).await;

    let (status, loan) = send(&app, "GET", &format!("/api/v1/loans/{}", loan_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loan["status"], "PROPOSED");
    assert_eq!(loan["originationFeeAmount"].as_f64(), Some(10_000.0));

    for next in ["TERM_SHEET", "APPLICATION", "UNDERWRITING", "APPROVED", "CLOSED"] {
        let (status, loan) = move_to(&app, &loan_id, next).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loan["status"], next);
    }

    let (status, draw) = funded_draw(&app, &loan_id, 400_000.0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draw["status"], "FUNDED");
    assert_eq!(draw["drawNumber"], 1);

    let (status, error) = funded_draw(&app, &loan_id, 700_000.0).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "DRAW_EXCEEDS_COMMITMENT");

    let (status, _) = move_to(&app, &loan_id, "ACTIVE").await;
    assert_eq!(status, StatusCode::OK);

    let (status, payments) = send(
        &app,
        "GET",
        &format!("/api/v1/loans/{}/payments", loan_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let payments = payments.as_array().unwrap().clone();
    assert_eq!(payments.len(), 24);
    assert_eq!(payments[0]["paymentDate"], "2025-02-01");
    assert_eq!(payments[0]["interestPayment"].as_f64(), Some(2_000.0));
    assert_eq!(payments[23]["endingBalance"].as_f64(), Some(0.0));

    let first_id = payments[0]["id"].as_str().unwrap();
    let (status, paid) = send(
        &app,
        "POST",
        &format!("/api/v1/payments/{}/record", first_id),
        Some(json!({ "paidDate": "2025-02-03" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "PAID");
    assert_eq!(paid["paidDate"], "2025-02-03");

    let (status, summary) = send(
        &app,
        "GET",
        "/api/v1/portfolio/summary?projectId=tower-a",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["loanCount"], 1);
    assert_eq!(summary["activeCount"], 1);
    assert_eq!(summary["totalFunded"].as_f64(), Some(400_000.0));
    assert_eq!(summary["availableToFund"].as_f64(), Some(600_000.0));
}

#[tokio::test]
async fn rejected_operations_map_to_client_errors() {
    let (_tmp, app) = test_app().await;
    let loan_id = create_loan(&app, 500_000.0).await;

    let (status, error) = move_to(&app, &loan_id, "ACTIVE").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "INVALID_STATUS_TRANSITION");

    let (status, error) = send(
        &app,
        "POST",
        &format!("/api/v1/loans/{}/draws", loan_id),
        Some(json!({ "amount": 0, "drawDate": "2025-01-15" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_DRAW_AMOUNT");

    let (status, error) = send(&app, "GET", "/api/v1/loans/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "NOT_FOUND");

    let (status, error) = send(
        &app,
        "POST",
        &format!("/api/v1/loans/{}/payments/schedule", loan_id),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "INVALID_PAYMENT_STATE");
}

#[tokio::test]
async fn deleting_a_loan_removes_it() {
    let (_tmp, app) = test_app().await;
    let loan_id = create_loan(&app, 250_000.0).await;

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/loans/{}", loan_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/v1/loans/{}/draws", loan_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, loans) = send(&app, "GET", "/api/v1/loans?projectId=tower-a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(loans.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn amortization_preview_is_stateless() {
    let (_tmp, app) = test_app().await;
    let (status, preview) = send(
        &app,
        "POST",
        "/api/v1/amortization/schedule",
        Some(json!({ "principal": 100000, "annualRate": 0.06, "termMonths": 12 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = preview["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[0]["interestPayment"].as_f64(), Some(500.0));
    assert_eq!(rows[11]["endingBalance"].as_f64(), Some(0.0));
    assert_eq!(preview["summary"]["totalPrincipal"].as_f64(), Some(100_000.0));

    let (status, error) = send(
        &app,
        "POST",
        "/api/v1/amortization/schedule",
        Some(json!({ "principal": 100000, "annualRate": 0.06, "termMonths": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_SCHEDULE_INPUT");

    let (status, error) = send(
        &app,
        "POST",
        "/api/v1/amortization/schedule",
        Some(json!({ "principal": 1000, "annualRate": 0, "termMonths": 4294967295u32 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_SCHEDULE_INPUT");

    let (_, loans) = send(&app, "GET", "/api/v1/loans", None).await;
    assert!(loans.as_array().unwrap().is_empty());
}
