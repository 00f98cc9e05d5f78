//! Loan facility domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::draws_model::{Draw, DrawStatus};
use super::loans_errors::LoanError;
use crate::amortization::ScheduleTerms;
use crate::{errors::ValidationError, Error, Result};

pub use crate::constants::MAX_TERM_MONTHS;

/// Lifecycle stage of a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    #[default]
    Proposed,
    TermSheet,
    Application,
    Underwriting,
    Approved,
    Closed,
    Active,
    PaidOff,
    Defaulted,
}

/// Every permitted status change. Anything not listed is rejected.
const STATUS_TRANSITIONS: &[(LoanStatus, LoanStatus)] = &[
    (LoanStatus::Proposed, LoanStatus::TermSheet),
    (LoanStatus::TermSheet, LoanStatus::Application),
    (LoanStatus::Application, LoanStatus::Underwriting),
    (LoanStatus::Underwriting, LoanStatus::Approved),
    (LoanStatus::Approved, LoanStatus::Closed),
    (LoanStatus::Closed, LoanStatus::Active),
    (LoanStatus::Active, LoanStatus::PaidOff),
    (LoanStatus::Active, LoanStatus::Defaulted),
];

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Proposed => "PROPOSED",
            LoanStatus::TermSheet => "TERM_SHEET",
            LoanStatus::Application => "APPLICATION",
            LoanStatus::Underwriting => "UNDERWRITING",
            LoanStatus::Approved => "APPROVED",
            LoanStatus::Closed => "CLOSED",
            LoanStatus::Active => "ACTIVE",
            LoanStatus::PaidOff => "PAID_OFF",
            LoanStatus::Defaulted => "DEFAULTED",
        }
    }

    pub fn can_transition_to(&self, target: LoanStatus) -> bool {
        STATUS_TRANSITIONS
            .iter()
            .any(|(from, to)| from == self && *to == target)
    }

    /// The regular forward successor; `Defaulted` is never a "next" stage.
    pub fn next(&self) -> Option<LoanStatus> {
        STATUS_TRANSITIONS
            .iter()
            .find(|(from, to)| from == self && *to != LoanStatus::Defaulted)
            .map(|(_, to)| *to)
    }

    /// Still being negotiated or underwritten.
    pub fn is_pipeline(&self) -> bool {
        matches!(
            self,
            LoanStatus::Proposed
                | LoanStatus::TermSheet
                | LoanStatus::Application
                | LoanStatus::Underwriting
        )
    }

    /// Closed or active: the facility is on the books.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, LoanStatus::Closed | LoanStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::PaidOff | LoanStatus::Defaulted)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PROPOSED" => Ok(LoanStatus::Proposed),
            "TERM_SHEET" => Ok(LoanStatus::TermSheet),
            "APPLICATION" => Ok(LoanStatus::Application),
            "UNDERWRITING" => Ok(LoanStatus::Underwriting),
            "APPROVED" => Ok(LoanStatus::Approved),
            "CLOSED" => Ok(LoanStatus::Closed),
            "ACTIVE" => Ok(LoanStatus::Active),
            "PAID_OFF" => Ok(LoanStatus::PaidOff),
            "DEFAULTED" => Ok(LoanStatus::Defaulted),
            other => Err(unknown_value("loan status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateType {
    #[default]
    Fixed,
    Floating,
}

impl RateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateType::Fixed => "FIXED",
            RateType::Floating => "FLOATING",
        }
    }
}

impl FromStr for RateType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FIXED" => Ok(RateType::Fixed),
            "FLOATING" => Ok(RateType::Floating),
            other => Err(unknown_value("rate type", other)),
        }
    }
}

/// Benchmark a floating facility is priced over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexRate {
    Sofr,
    Prime,
    Libor,
}

impl IndexRate {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexRate::Sofr => "SOFR",
            IndexRate::Prime => "PRIME",
            IndexRate::Libor => "LIBOR",
        }
    }
}

impl FromStr for IndexRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SOFR" => Ok(IndexRate::Sofr),
            "PRIME" => Ok(IndexRate::Prime),
            "LIBOR" => Ok(IndexRate::Libor),
            other => Err(unknown_value("index rate", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanType {
    #[default]
    Construction,
    Bridge,
    Permanent,
    Mezzanine,
    LineOfCredit,
    Other,
}

impl LoanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanType::Construction => "CONSTRUCTION",
            LoanType::Bridge => "BRIDGE",
            LoanType::Permanent => "PERMANENT",
            LoanType::Mezzanine => "MEZZANINE",
            LoanType::LineOfCredit => "LINE_OF_CREDIT",
            LoanType::Other => "OTHER",
        }
    }
}

impl FromStr for LoanType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CONSTRUCTION" => Ok(LoanType::Construction),
            "BRIDGE" => Ok(LoanType::Bridge),
            "PERMANENT" => Ok(LoanType::Permanent),
            "MEZZANINE" => Ok(LoanType::Mezzanine),
            "LINE_OF_CREDIT" => Ok(LoanType::LineOfCredit),
            "OTHER" => Ok(LoanType::Other),
            other => Err(unknown_value("loan type", other)),
        }
    }
}

fn unknown_value(kind: &str, value: &str) -> Error {
    Error::Validation(ValidationError::InvalidInput(format!(
        "Unknown {} '{}'",
        kind, value
    )))
}

/// Domain model representing a committed loan facility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoanFacility {
    pub id: String,
    pub project_id: String,
    pub loan_name: String,
    pub lender_name: Option<String>,
    pub loan_type: LoanType,

    // Commercial terms
    pub commitment_amount: Decimal,
    pub funded_amount: Decimal,
    pub interest_rate: Decimal,
    pub rate_type: RateType,
    pub index_rate: Option<IndexRate>,
    pub spread: Option<Decimal>,
    pub floor_rate: Option<Decimal>,

    // Schedule shape
    pub term_months: u32,
    pub io_period_months: u32,
    pub amortization_months: Option<u32>,

    // Fees and reserves
    pub origination_fee_percent: Decimal,
    pub origination_fee_amount: Decimal,
    pub exit_fee_percent: Option<Decimal>,
    pub interest_reserve: Decimal,
    pub operating_reserve: Decimal,
    pub replacement_reserve: Decimal,

    // Key dates
    pub closing_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub first_payment_date: Option<NaiveDate>,

    /// Draws ever requested against this facility; never decremented.
    pub draw_sequence: u32,
    pub status: LoanStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for creating a new loan facility.
///
/// There is no way to pass a status or a funded amount: new facilities always
/// start `PROPOSED` with nothing funded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoanFacility {
    pub project_id: String,
    pub loan_name: String,
    pub lender_name: Option<String>,
    #[serde(default)]
    pub loan_type: LoanType,
    pub commitment_amount: Decimal,
    pub interest_rate: Decimal,
    #[serde(default)]
    pub rate_type: RateType,
    pub index_rate: Option<IndexRate>,
    pub spread: Option<Decimal>,
    pub floor_rate: Option<Decimal>,
    pub term_months: u32,
    #[serde(default)]
    pub io_period_months: u32,
    pub amortization_months: Option<u32>,
    #[serde(default)]
    pub origination_fee_percent: Decimal,
    pub exit_fee_percent: Option<Decimal>,
    #[serde(default)]
    pub interest_reserve: Decimal,
    #[serde(default)]
    pub operating_reserve: Decimal,
    #[serde(default)]
    pub replacement_reserve: Decimal,
    pub closing_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub first_payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Input model for editing the terms of an existing facility.
///
/// Status, funded amount and the frozen origination fee are not editable here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanFacilityUpdate {
    pub loan_name: String,
    pub lender_name: Option<String>,
    #[serde(default)]
    pub loan_type: LoanType,
    pub commitment_amount: Decimal,
    pub interest_rate: Decimal,
    #[serde(default)]
    pub rate_type: RateType,
    pub index_rate: Option<IndexRate>,
    pub spread: Option<Decimal>,
    pub floor_rate: Option<Decimal>,
    pub term_months: u32,
    #[serde(default)]
    pub io_period_months: u32,
    pub amortization_months: Option<u32>,
    #[serde(default)]
    pub origination_fee_percent: Decimal,
    pub exit_fee_percent: Option<Decimal>,
    #[serde(default)]
    pub interest_reserve: Decimal,
    #[serde(default)]
    pub operating_reserve: Decimal,
    #[serde(default)]
    pub replacement_reserve: Decimal,
    pub closing_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub first_payment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl LoanFacility {
    /// Builds a `PROPOSED` facility, freezing the origination fee.
    pub fn create(new_loan: NewLoanFacility, id: String, now: NaiveDateTime) -> Result<Self> {
        let origination_fee_amount =
            origination_fee(new_loan.commitment_amount, new_loan.origination_fee_percent)?;
        let loan = LoanFacility {
            id,
            project_id: new_loan.project_id,
            loan_name: new_loan.loan_name,
            lender_name: new_loan.lender_name,
            loan_type: new_loan.loan_type,
            commitment_amount: new_loan.commitment_amount,
            funded_amount: Decimal::ZERO,
            interest_rate: new_loan.interest_rate,
            rate_type: new_loan.rate_type,
            index_rate: new_loan.index_rate,
            spread: new_loan.spread,
            floor_rate: new_loan.floor_rate,
            term_months: new_loan.term_months,
            io_period_months: new_loan.io_period_months,
            amortization_months: new_loan.amortization_months,
            origination_fee_percent: new_loan.origination_fee_percent,
            origination_fee_amount,
            exit_fee_percent: new_loan.exit_fee_percent,
            interest_reserve: new_loan.interest_reserve,
            operating_reserve: new_loan.operating_reserve,
            replacement_reserve: new_loan.replacement_reserve,
            closing_date: new_loan.closing_date,
            maturity_date: new_loan.maturity_date,
            first_payment_date: new_loan.first_payment_date,
            draw_sequence: 0,
            status: LoanStatus::Proposed,
            notes: new_loan.notes,
            created_at: now,
            updated_at: now,
        };
        loan.validate()?;
        Ok(loan)
    }

    /// Checks every invariant a stored facility must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(invalid_input("Project id cannot be empty"));
        }
        if self.loan_name.trim().is_empty() {
            return Err(invalid_input("Loan name cannot be empty"));
        }
        if self.commitment_amount < Decimal::ZERO {
            return Err(invalid_input("Commitment amount cannot be negative"));
        }
        if self.funded_amount < Decimal::ZERO {
            return Err(invalid_input("Funded amount cannot be negative"));
        }
        if self.funded_amount > self.commitment_amount {
            return Err(invalid_input(&format!(
                "Commitment amount {} is below the funded amount {}",
                self.commitment_amount, self.funded_amount
            )));
        }
        if self.interest_rate < Decimal::ZERO {
            return Err(invalid_input("Interest rate cannot be negative"));
        }
        if self.rate_type == RateType::Floating && self.index_rate.is_none() {
            return Err(Error::Validation(ValidationError::MissingField(
                "indexRate".to_string(),
            )));
        }
        if self.term_months == 0 || self.term_months > MAX_TERM_MONTHS {
            return Err(invalid_input(&format!(
                "Term must be between 1 and {} months",
                MAX_TERM_MONTHS
            )));
        }
        if self.io_period_months > self.term_months {
            return Err(invalid_input(
                "Interest-only period cannot be longer than the term",
            ));
        }
        if let Some(amortization) = self.amortization_months {
            if amortization == 0 || amortization > MAX_TERM_MONTHS {
                return Err(invalid_input(&format!(
                    "Amortization must be between 1 and {} months",
                    MAX_TERM_MONTHS
                )));
            }
        }
        let non_negative = [
            ("origination fee percent", Some(self.origination_fee_percent)),
            ("exit fee percent", self.exit_fee_percent),
            ("floor rate", self.floor_rate),
            ("interest reserve", Some(self.interest_reserve)),
            ("operating reserve", Some(self.operating_reserve)),
            ("replacement reserve", Some(self.replacement_reserve)),
        ];
        for (label, value) in non_negative {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                return Err(invalid_input(&format!("{} cannot be negative", label)));
            }
        }
        if let (Some(closing), Some(maturity)) = (self.closing_date, self.maturity_date) {
            if maturity < closing {
                return Err(invalid_input("Maturity date cannot precede the closing date"));
            }
        }
        Ok(())
    }

    /// Applies edited terms. The origination fee stays frozen; call
    /// [`LoanFacility::recompute_origination_fee`] to refresh it.
    pub fn apply_update(&mut self, update: LoanFacilityUpdate, now: NaiveDateTime) -> Result<()> {
        let mut candidate = self.clone();
        candidate.loan_name = update.loan_name;
        candidate.lender_name = update.lender_name;
        candidate.loan_type = update.loan_type;
        candidate.commitment_amount = update.commitment_amount;
        candidate.interest_rate = update.interest_rate;
        candidate.rate_type = update.rate_type;
        candidate.index_rate = update.index_rate;
        candidate.spread = update.spread;
        candidate.floor_rate = update.floor_rate;
        candidate.term_months = update.term_months;
        candidate.io_period_months = update.io_period_months;
        candidate.amortization_months = update.amortization_months;
        candidate.origination_fee_percent = update.origination_fee_percent;
        candidate.exit_fee_percent = update.exit_fee_percent;
        candidate.interest_reserve = update.interest_reserve;
        candidate.operating_reserve = update.operating_reserve;
        candidate.replacement_reserve = update.replacement_reserve;
        candidate.closing_date = update.closing_date;
        candidate.maturity_date = update.maturity_date;
        candidate.first_payment_date = update.first_payment_date;
        candidate.notes = update.notes;
        candidate.validate()?;
        candidate.touch(now);
        *self = candidate;
        Ok(())
    }

    /// Moves the facility along its lifecycle, rejecting skips and reversals.
    pub fn transition_to(&mut self, target: LoanStatus, now: NaiveDateTime) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(LoanError::InvalidStatusTransition {
                from: self.status,
                to: target,
            }
            .into());
        }
        self.status = target;
        self.touch(now);
        Ok(())
    }

    /// Refreshes the origination fee from the current commitment.
    pub fn recompute_origination_fee(&mut self, now: NaiveDateTime) -> Result<()> {
        self.origination_fee_amount =
            origination_fee(self.commitment_amount, self.origination_fee_percent)?;
        self.touch(now);
        Ok(())
    }

    /// Undrawn commitment.
    pub fn available_to_fund(&self) -> Decimal {
        self.commitment_amount - self.funded_amount
    }

    /// Reserves the next draw number.
    pub fn next_draw_number(&mut self, now: NaiveDateTime) -> u32 {
        self.draw_sequence += 1;
        self.touch(now);
        self.draw_sequence
    }

    /// Funds an approved draw and adds its amount to the funded balance.
    ///
    /// All checks run before either record is changed, so a rejected call
    /// leaves both untouched.
    pub fn fund_draw(&mut self, draw: &mut Draw, now: NaiveDateTime) -> Result<()> {
        if draw.loan_id != self.id {
            return Err(LoanError::InvalidDrawState(format!(
                "draw {} belongs to loan {}, not {}",
                draw.id, draw.loan_id, self.id
            ))
            .into());
        }
        if self.status.is_terminal() {
            return Err(LoanError::InvalidDrawState(format!(
                "loan {} is {} and cannot fund draws",
                self.id, self.status
            ))
            .into());
        }
        if draw.status != DrawStatus::Approved {
            return Err(LoanError::InvalidDrawState(format!(
                "draw {} is {}, only APPROVED draws can be funded",
                draw.id,
                draw.status.as_str()
            ))
            .into());
        }
        // An overflowing sum is past any representable commitment.
        let funded = match self.funded_amount.checked_add(draw.amount) {
            Some(funded) if funded <= self.commitment_amount => funded,
            _ => {
                return Err(LoanError::DrawExceedsCommitment {
                    loan_id: self.id.clone(),
                    amount: draw.amount,
                    funded: self.funded_amount,
                    commitment: self.commitment_amount,
                }
                .into())
            }
        };

        draw.mark_funded(now)?;
        self.funded_amount = funded;
        self.touch(now);
        Ok(())
    }

    /// All-in rate used for a schedule generated now.
    ///
    /// Fixed facilities use `interest_rate`. Floating facilities price as
    /// `max(index + spread, floor)` when an index fixing is supplied, and fall
    /// back to the stored `interest_rate` otherwise.
    pub fn effective_rate(&self, index_fixing: Option<Decimal>) -> Decimal {
        match (self.rate_type, index_fixing) {
            (RateType::Floating, Some(index)) => {
                let all_in = index.saturating_add(self.spread.unwrap_or(Decimal::ZERO));
                match self.floor_rate {
                    Some(floor) => all_in.max(floor),
                    None => all_in,
                }
            }
            _ => self.interest_rate,
        }
    }

    /// Schedule terms for amortizing `principal` over this facility's shape.
    pub fn schedule_terms(
        &self,
        principal: Decimal,
        index_fixing: Option<Decimal>,
    ) -> ScheduleTerms {
        ScheduleTerms::new(
            principal,
            self.effective_rate(index_fixing),
            self.term_months,
            self.io_period_months,
        )
        .with_amortization_months(self.amortization_months)
    }

    /// Sets `updated_at`, never moving it backwards.
    pub fn touch(&mut self, now: NaiveDateTime) {
        self.updated_at = now.max(self.updated_at);
    }
}

fn origination_fee(commitment: Decimal, percent: Decimal) -> Result<Decimal> {
    commitment.checked_mul(percent).ok_or_else(|| {
        invalid_input(&format!(
            "Origination fee of {} on {} is outside the decimal range",
            percent, commitment
        ))
    })
}

fn invalid_input(message: &str) -> Error {
    Error::Validation(ValidationError::InvalidInput(message.to_string()))
}
