use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{error::ApiResult, main_lib::AppState};
use loanbook_core::loans::{Payment, PaymentScheduleRequest};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordPaymentRequest {
    /// Defaults to today.
    paid_date: Option<NaiveDate>,
}

async fn list_payments(
    Path(loan_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Payment>>> {
    Ok(Json(state.loan_service.list_payments(&loan_id)?))
}

async fn generate_schedule(
    Path(loan_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<PaymentScheduleRequest>,
) -> ApiResult<Json<Vec<Payment>>> {
    let payments = state
        .loan_service
        .generate_payment_schedule(&loan_id, request)
        .await?;
    Ok(Json(payments))
}

async fn regenerate_schedule(
    Path(loan_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<PaymentScheduleRequest>,
) -> ApiResult<Json<Vec<Payment>>> {
    let payments = state
        .loan_service
        .regenerate_schedule(&loan_id, request)
        .await?;
    Ok(Json(payments))
}

async fn record_payment(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecordPaymentRequest>,
) -> ApiResult<Json<Payment>> {
    let payment = state
        .loan_service
        .record_payment(&id, request.paid_date)
        .await?;
    Ok(Json(payment))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/loans/{id}/payments", get(list_payments))
        .route("/loans/{id}/payments/schedule", post(generate_schedule))
        .route("/loans/{id}/payments/regenerate", post(regenerate_schedule))
        .route("/payments/{id}/record", post(record_payment))
}
