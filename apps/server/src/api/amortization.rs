use std::sync::Arc;

use axum::{routing::post, Json, Router};

use crate::{error::ApiResult, main_lib::AppState};
use loanbook_core::amortization::{preview_schedule, SchedulePreview, ScheduleTerms};

/// Stateless schedule preview; nothing is stored.
async fn preview(Json(terms): Json<ScheduleTerms>) -> ApiResult<Json<SchedulePreview>> {
    Ok(Json(preview_schedule(terms)?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/amortization/schedule", post(preview))
}
