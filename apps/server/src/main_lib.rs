use std::sync::Arc;

use crate::config::Config;
use loanbook_core::{
    loans::{LoanService, LoanServiceTrait},
    portfolio::{PortfolioSummaryService, PortfolioSummaryServiceTrait},
};
use loanbook_storage_sqlite::{db, loans::LoanRepository};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub loan_service: Arc<dyn LoanServiceTrait + Send + Sync>,
    pub portfolio_service: Arc<dyn PortfolioSummaryServiceTrait + Send + Sync>,
    pub db_path: String,
}

pub fn init_tracing() {
    let log_format = std::env::var("LB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // try_init: tests may install the subscriber more than once.
    let _ = if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()
    };
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let loan_repository = Arc::new(LoanRepository::new(pool.clone(), writer.clone()));
    let loan_service = Arc::new(LoanService::new(loan_repository.clone()));
    let portfolio_service = Arc::new(PortfolioSummaryService::new(loan_repository));

    Ok(Arc::new(AppState {
        loan_service,
        portfolio_service,
        db_path,
    }))
}
