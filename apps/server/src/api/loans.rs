use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::ProjectQuery;
use crate::{error::ApiResult, main_lib::AppState};
use loanbook_core::loans::{LoanFacility, LoanFacilityUpdate, LoanStatus, NewLoanFacility};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusChange {
    status: LoanStatus,
}

async fn list_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Json<Vec<LoanFacility>>> {
    let loans = state
        .loan_service
        .list_loans(query.project_id.as_deref())?;
    Ok(Json(loans))
}

async fn create_loan(
    State(state): State<Arc<AppState>>,
    Json(new_loan): Json<NewLoanFacility>,
) -> ApiResult<(StatusCode, Json<LoanFacility>)> {
    let loan = state.loan_service.create_loan(new_loan).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

async fn get_loan(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<LoanFacility>> {
    Ok(Json(state.loan_service.get_loan(&id)?))
}

async fn update_loan(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<LoanFacilityUpdate>,
) -> ApiResult<Json<LoanFacility>> {
    let loan = state.loan_service.update_loan(&id, update).await?;
    Ok(Json(loan))
}

async fn delete_loan(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.loan_service.delete_loan(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn transition_status(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Json<LoanFacility>> {
    let loan = state
        .loan_service
        .transition_status(&id, change.status)
        .await?;
    Ok(Json(loan))
}

async fn recompute_origination_fee(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<LoanFacility>> {
    let loan = state.loan_service.recompute_origination_fee(&id).await?;
    Ok(Json(loan))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/loans", get(list_loans).post(create_loan))
        .route(
            "/loans/{id}",
            get(get_loan).put(update_loan).delete(delete_loan),
        )
        .route("/loans/{id}/status", post(transition_status))
        .route(
            "/loans/{id}/origination-fee",
            post(recompute_origination_fee),
        )
}
