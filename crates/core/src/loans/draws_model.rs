//! Draw (funding request) domain models.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::loans_errors::LoanError;
use crate::{errors::ValidationError, Error, Result};

/// Draw lifecycle: `REQUESTED → APPROVED → FUNDED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawStatus {
    #[default]
    Requested,
    Approved,
    Funded,
}

impl DrawStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawStatus::Requested => "REQUESTED",
            DrawStatus::Approved => "APPROVED",
            DrawStatus::Funded => "FUNDED",
        }
    }
}

impl FromStr for DrawStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "REQUESTED" => Ok(DrawStatus::Requested),
            "APPROVED" => Ok(DrawStatus::Approved),
            "FUNDED" => Ok(DrawStatus::Funded),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown draw status '{}'",
                other
            )))),
        }
    }
}

/// Domain model representing a draw against a facility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Draw {
    pub id: String,
    pub loan_id: String,
    pub draw_number: u32,
    pub amount: Decimal,
    pub draw_date: NaiveDate,
    pub status: DrawStatus,
    pub description: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
    pub funded_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for requesting a draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDraw {
    pub amount: Decimal,
    pub draw_date: NaiveDate,
    pub description: Option<String>,
}

impl NewDraw {
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(LoanError::InvalidDrawAmount(self.amount).into());
        }
        Ok(())
    }
}

impl Draw {
    /// Builds a `REQUESTED` draw with an already reserved number.
    pub fn request(
        new_draw: NewDraw,
        id: String,
        loan_id: &str,
        draw_number: u32,
        now: NaiveDateTime,
    ) -> Result<Self> {
        new_draw.validate()?;
        Ok(Draw {
            id,
            loan_id: loan_id.to_string(),
            draw_number,
            amount: new_draw.amount,
            draw_date: new_draw.draw_date,
            status: DrawStatus::Requested,
            description: new_draw.description,
            approved_at: None,
            funded_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn approve(&mut self, now: NaiveDateTime) -> Result<()> {
        self.expect_status(DrawStatus::Requested, "approved")?;
        self.status = DrawStatus::Approved;
        self.approved_at = Some(now);
        self.updated_at = now.max(self.updated_at);
        Ok(())
    }

    /// Marks the draw funded. Only the owning facility calls this, so the
    /// funded balance moves together with the draw.
    pub(crate) fn mark_funded(&mut self, now: NaiveDateTime) -> Result<()> {
        self.expect_status(DrawStatus::Approved, "funded")?;
        self.status = DrawStatus::Funded;
        self.funded_at = Some(now);
        self.updated_at = now.max(self.updated_at);
        Ok(())
    }

    pub fn is_funded(&self) -> bool {
        self.status == DrawStatus::Funded
    }

    fn expect_status(&self, expected: DrawStatus, action: &str) -> Result<()> {
        if self.status != expected {
            return Err(LoanError::InvalidDrawState(format!(
                "draw #{} is {}; only {} draws can be {}",
                self.draw_number,
                self.status.as_str(),
                expected.as_str(),
                action
            ))
            .into());
        }
        Ok(())
    }
}
