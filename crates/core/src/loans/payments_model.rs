//! Payment schedule domain models.

use std::str::FromStr;

use chrono::{Months, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::loans_errors::LoanError;
use crate::amortization::ScheduleRow;
use crate::{errors::ValidationError, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Scheduled,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Scheduled => "SCHEDULED",
            PaymentStatus::Paid => "PAID",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SCHEDULED" => Ok(PaymentStatus::Scheduled),
            "PAID" => Ok(PaymentStatus::Paid),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown payment status '{}'",
                other
            )))),
        }
    }
}

/// One dated row of a facility's payment schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub loan_id: String,
    pub payment_number: u32,
    pub payment_date: NaiveDate,
    pub beginning_balance: Decimal,
    pub interest_payment: Decimal,
    pub principal_payment: Decimal,
    pub total_payment: Decimal,
    pub ending_balance: Decimal,
    pub status: PaymentStatus,
    pub paid_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Options for generating or regenerating a payment schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentScheduleRequest {
    /// Date of the first generated row. Defaults to the facility's
    /// `firstPaymentDate`, or one month after the last paid row.
    pub first_payment_date: Option<NaiveDate>,
    /// Current value of the floating index, if the facility floats.
    pub index_fixing: Option<Decimal>,
}

impl Payment {
    /// Posts the payment. Amounts are taken from the schedule as-is.
    pub fn mark_paid(&mut self, paid_date: NaiveDate, now: NaiveDateTime) -> Result<()> {
        if self.status != PaymentStatus::Scheduled {
            return Err(LoanError::InvalidPaymentState(format!(
                "payment #{} is {}; only SCHEDULED payments can be recorded",
                self.payment_number,
                self.status.as_str()
            ))
            .into());
        }
        self.status = PaymentStatus::Paid;
        self.paid_date = Some(paid_date);
        self.updated_at = now.max(self.updated_at);
        Ok(())
    }

    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

/// Adds `months` calendar months to `start`, clamping to month end.
pub fn add_months(start: NaiveDate, months: u32) -> Result<NaiveDate> {
    start.checked_add_months(Months::new(months)).ok_or_else(|| {
        Error::Validation(ValidationError::InvalidInput(format!(
            "Payment date out of range: {} + {} months",
            start, months
        )))
    })
}

/// Turns calculator rows into monthly `SCHEDULED` payments.
///
/// Rows are numbered from `first_number` and dated monthly from
/// `first_payment_date`; `new_id` supplies each row's identifier.
pub fn build_scheduled_payments(
    loan_id: &str,
    rows: &[ScheduleRow],
    first_number: u32,
    first_payment_date: NaiveDate,
    now: NaiveDateTime,
    mut new_id: impl FnMut() -> String,
) -> Result<Vec<Payment>> {
    rows.iter()
        .enumerate()
        .map(|(offset, row)| {
            let offset = offset as u32;
            Ok(Payment {
                id: new_id(),
                loan_id: loan_id.to_string(),
                payment_number: first_number + offset,
                payment_date: add_months(first_payment_date, offset)?,
                beginning_balance: row.beginning_balance,
                interest_payment: row.interest_payment,
                principal_payment: row.principal_payment,
                total_payment: row.total_payment,
                ending_balance: row.ending_balance,
                status: PaymentStatus::Scheduled,
                paid_date: None,
                created_at: now,
                updated_at: now,
            })
        })
        .collect()
}
