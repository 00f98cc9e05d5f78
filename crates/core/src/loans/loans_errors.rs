//! Loan facility lifecycle errors.

use rust_decimal::Decimal;
use thiserror::Error;

use super::loans_model::LoanStatus;

/// Failures raised by the facility engine when an operation would break one
/// of the monetary or lifecycle invariants. None of them are transient.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanError {
    #[error("Invalid schedule input: {0}")]
    InvalidScheduleInput(String),

    #[error("Draw amount must be greater than zero, got {0}")]
    InvalidDrawAmount(Decimal),

    #[error("Invalid draw state: {0}")]
    InvalidDrawState(String),

    #[error(
        "Funding {amount} on loan {loan_id} would exceed the commitment ({funded} funded of {commitment})"
    )]
    DrawExceedsCommitment {
        loan_id: String,
        amount: Decimal,
        funded: Decimal,
        commitment: Decimal,
    },

    #[error("Invalid payment state: {0}")]
    InvalidPaymentState(String),

    #[error("Cannot move loan from {from} to {to}")]
    InvalidStatusTransition { from: LoanStatus, to: LoanStatus },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
}

impl LoanError {
    pub fn loan_not_found(id: impl Into<String>) -> Self {
        LoanError::NotFound {
            entity: "Loan facility",
            id: id.into(),
        }
    }

    pub fn draw_not_found(id: impl Into<String>) -> Self {
        LoanError::NotFound {
            entity: "Draw",
            id: id.into(),
        }
    }

    pub fn payment_not_found(id: impl Into<String>) -> Self {
        LoanError::NotFound {
            entity: "Payment",
            id: id.into(),
        }
    }

    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            LoanError::InvalidScheduleInput(_) => "INVALID_SCHEDULE_INPUT",
            LoanError::InvalidDrawAmount(_) => "INVALID_DRAW_AMOUNT",
            LoanError::InvalidDrawState(_) => "INVALID_DRAW_STATE",
            LoanError::DrawExceedsCommitment { .. } => "DRAW_EXCEEDS_COMMITMENT",
            LoanError::InvalidPaymentState(_) => "INVALID_PAYMENT_STATE",
            LoanError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            LoanError::NotFound { .. } => "NOT_FOUND",
        }
    }
}
