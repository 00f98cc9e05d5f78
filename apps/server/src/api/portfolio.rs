use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use super::ProjectQuery;
use crate::{error::ApiResult, main_lib::AppState};
use loanbook_core::portfolio::PortfolioSummary;

async fn get_portfolio_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Json<PortfolioSummary>> {
    let summary = state
        .portfolio_service
        .get_portfolio_summary(query.project_id.as_deref())?;
    Ok(Json(summary))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/portfolio/summary", get(get_portfolio_summary))
}
