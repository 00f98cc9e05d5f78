//! Portfolio summary models.

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::loans::LoanFacility;

/// Derived rollup over a set of facilities. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub loan_count: usize,
    pub total_commitment: Decimal,
    pub total_funded: Decimal,
    pub available_to_fund: Decimal,
    /// Facilities that are CLOSED or ACTIVE
    pub active_count: usize,
    /// Facilities still in PROPOSED, TERM_SHEET, APPLICATION or UNDERWRITING
    pub proposed_count: usize,
    /// Interest rate weighted by funded amount; zero when nothing is funded
    pub weighted_average_rate: Decimal,
    pub total_interest_reserve: Decimal,
    pub total_origination_fees: Decimal,
}

/// Running sums; merged pairwise when folded in parallel.
#[derive(Debug, Clone, Default)]
struct SummaryTotals {
    loan_count: usize,
    total_commitment: Decimal,
    total_funded: Decimal,
    rate_times_funded: Decimal,
    active_count: usize,
    proposed_count: usize,
    total_interest_reserve: Decimal,
    total_origination_fees: Decimal,
}

impl SummaryTotals {
    fn add(mut self, loan: &LoanFacility) -> Self {
        self.loan_count += 1;
        self.total_commitment += loan.commitment_amount;
        self.total_funded += loan.funded_amount;
        self.rate_times_funded += loan.interest_rate * loan.funded_amount;
        if loan.status.is_outstanding() {
            self.active_count += 1;
        }
        if loan.status.is_pipeline() {
            self.proposed_count += 1;
        }
        self.total_interest_reserve += loan.interest_reserve;
        self.total_origination_fees += loan.origination_fee_amount;
        self
    }

    fn merge(mut self, other: Self) -> Self {
        self.loan_count += other.loan_count;
        self.total_commitment += other.total_commitment;
        self.total_funded += other.total_funded;
        self.rate_times_funded += other.rate_times_funded;
        self.active_count += other.active_count;
        self.proposed_count += other.proposed_count;
        self.total_interest_reserve += other.total_interest_reserve;
        self.total_origination_fees += other.total_origination_fees;
        self
    }
}

impl PortfolioSummary {
    /// Aggregates `loans` without mutating them.
    pub fn from_loans(loans: &[LoanFacility]) -> Self {
        let totals = loans
            .par_iter()
            .fold(SummaryTotals::default, SummaryTotals::add)
            .reduce(SummaryTotals::default, SummaryTotals::merge);

        let weighted_average_rate = if totals.total_funded.is_zero() {
            Decimal::ZERO
        } else {
            totals.rate_times_funded / totals.total_funded
        };

        PortfolioSummary {
            loan_count: totals.loan_count,
            total_commitment: totals.total_commitment,
            total_funded: totals.total_funded,
            available_to_fund: totals.total_commitment - totals.total_funded,
            active_count: totals.active_count,
            proposed_count: totals.proposed_count,
            weighted_average_rate,
            total_interest_reserve: totals.total_interest_reserve,
            total_origination_fees: totals.total_origination_fees,
        }
    }
}
