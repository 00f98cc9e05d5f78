use std::sync::Arc;

use axum::Router;
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{config::Config, main_lib::AppState};

pub mod amortization;
pub mod draws;
pub mod health;
pub mod loans;
pub mod payments;
pub mod portfolio;

/// `?projectId=` filter shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub project_id: Option<String>,
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    let api = Router::new()
        .merge(health::router())
        .merge(loans::router())
        .merge(draws::router())
        .merge(payments::router())
        .merge(portfolio::router())
        .merge(amortization::router());

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
