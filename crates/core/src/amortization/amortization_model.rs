//! Amortization schedule domain models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{BALANCE_TOLERANCE, MAX_TERM_MONTHS};
use crate::errors::Result;
use crate::loans::LoanError;

/// Shape of a schedule: how much, at what rate, for how long.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTerms {
    pub principal: Decimal,
    /// Annual rate as a decimal fraction (0.085 = 8.5%)
    pub annual_rate: Decimal,
    pub term_months: u32,
    #[serde(default)]
    pub io_months: u32,
    /// Length of the amortizing phase when it differs from `term_months - io_months`
    #[serde(default)]
    pub amortization_months: Option<u32>,
}

impl ScheduleTerms {
    pub fn new(principal: Decimal, annual_rate: Decimal, term_months: u32, io_months: u32) -> Self {
        Self {
            principal,
            annual_rate,
            term_months,
            io_months,
            amortization_months: None,
        }
    }

    pub fn with_amortization_months(mut self, amortization_months: Option<u32>) -> Self {
        self.amortization_months = amortization_months;
        self
    }

    /// Number of amortizing periods the level payment is spread over.
    pub fn amortizing_horizon(&self) -> u32 {
        self.amortization_months
            .unwrap_or_else(|| self.term_months.saturating_sub(self.io_months))
    }

    /// Rejects inputs the calculator cannot produce a meaningful schedule for.
    pub fn validate(&self) -> Result<()> {
        if self.principal < Decimal::ZERO {
            return Err(invalid(format!(
                "principal must be non-negative, got {}",
                self.principal
            )));
        }
        if self.annual_rate < Decimal::ZERO {
            return Err(invalid(format!(
                "annual rate must be non-negative, got {}",
                self.annual_rate
            )));
        }
        if self.term_months == 0 || self.term_months > MAX_TERM_MONTHS {
            return Err(invalid(format!(
                "term must be between 1 and {} months, got {}",
                MAX_TERM_MONTHS, self.term_months
            )));
        }
        if self.io_months > self.term_months {
            return Err(invalid(format!(
                "interest-only period ({}) exceeds term ({})",
                self.io_months, self.term_months
            )));
        }
        if let Some(amortization) = self.amortization_months {
            if amortization == 0 || amortization > MAX_TERM_MONTHS {
                return Err(invalid(format!(
                    "amortization period must be between 1 and {} months, got {}",
                    MAX_TERM_MONTHS, amortization
                )));
            }
        }
        Ok(())
    }
}

fn invalid(reason: String) -> crate::Error {
    LoanError::InvalidScheduleInput(reason).into()
}

/// One month of a computed schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRow {
    /// 1-based month index
    pub period: u32,
    pub beginning_balance: Decimal,
    pub interest_payment: Decimal,
    pub principal_payment: Decimal,
    pub total_payment: Decimal,
    pub ending_balance: Decimal,
    pub is_interest_only: bool,
}

/// Totals over a computed schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub total_interest: Decimal,
    pub total_principal: Decimal,
    pub total_payments: Decimal,
    /// Balance left after the final row; zero for a fully amortizing schedule
    pub balloon_balance: Decimal,
    pub interest_only_months: u32,
    pub amortizing_months: u32,
}

impl ScheduleSummary {
    pub fn from_rows(rows: &[ScheduleRow]) -> Self {
        let mut summary = rows.iter().fold(ScheduleSummary::default(), |mut acc, row| {
            acc.total_interest += row.interest_payment;
            acc.total_principal += row.principal_payment;
            acc.total_payments += row.total_payment;
            if row.is_interest_only {
                acc.interest_only_months += 1;
            } else {
                acc.amortizing_months += 1;
            }
            acc
        });
        summary.balloon_balance = rows
            .last()
            .map(|row| row.ending_balance)
            .unwrap_or(Decimal::ZERO);
        summary
    }

    /// True when the schedule retires the balance within a cent.
    pub fn is_fully_amortized(&self) -> bool {
        self.balloon_balance < BALANCE_TOLERANCE
    }
}

/// Stateless preview request: terms plus the rows computed from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePreview {
    pub terms: ScheduleTerms,
    pub rows: Vec<ScheduleRow>,
    pub summary: ScheduleSummary,
}
