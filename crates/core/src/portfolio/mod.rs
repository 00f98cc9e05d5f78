//! Portfolio module - rollups over loan facilities.

mod summary_model;
mod summary_service;


pub use summary_model::PortfolioSummary;
pub use summary_service::{PortfolioSummaryService, PortfolioSummaryServiceTrait};
