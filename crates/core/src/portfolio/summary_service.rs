use std::sync::Arc;

use log::debug;

use super::summary_model::PortfolioSummary;
use crate::errors::Result;
use crate::loans::LoanRepositoryTrait;

/// Trait for portfolio rollup operations.
pub trait PortfolioSummaryServiceTrait: Send + Sync {
    /// Summarizes every facility, or only those of one project.
    fn get_portfolio_summary(&self, project_id: Option<&str>) -> Result<PortfolioSummary>;
}

/// Read-only service computing portfolio rollups from stored facilities.
pub struct PortfolioSummaryService {
    repository: Arc<dyn LoanRepositoryTrait>,
}

impl PortfolioSummaryService {
    pub fn new(repository: Arc<dyn LoanRepositoryTrait>) -> Self {
        Self { repository }
    }
}

impl PortfolioSummaryServiceTrait for PortfolioSummaryService {
    fn get_portfolio_summary(&self, project_id: Option<&str>) -> Result<PortfolioSummary> {
        let loans = self.repository.list_loans(project_id)?;
        debug!(
            "Summarizing {} loan facilities (project filter: {:?})",
            loans.len(),
            project_id
        );
        Ok(PortfolioSummary::from_loans(&loans))
    }
}
