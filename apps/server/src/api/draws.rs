use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};

use crate::{error::ApiResult, main_lib::AppState};
use loanbook_core::loans::{Draw, NewDraw};

async fn list_draws(
    Path(loan_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Draw>>> {
    Ok(Json(state.loan_service.list_draws(&loan_id)?))
}

async fn request_draw(
    Path(loan_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(new_draw): Json<NewDraw>,
) -> ApiResult<(StatusCode, Json<Draw>)> {
    let draw = state.loan_service.request_draw(&loan_id, new_draw).await?;
    Ok((StatusCode::CREATED, Json(draw)))
}

async fn approve_draw(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Draw>> {
    Ok(Json(state.loan_service.approve_draw(&id).await?))
}

async fn fund_draw(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Draw>> {
    Ok(Json(state.loan_service.fund_draw(&id).await?))
}

async fn delete_draw(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.loan_service.delete_draw(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/loans/{id}/draws", get(list_draws).post(request_draw))
        .route("/draws/{id}", delete(delete_draw))
        .route("/draws/{id}/approve", post(approve_draw))
        .route("/draws/{id}/fund", post(fund_draw))
}
