//! Database models for loan facilities, draws and payments.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use loanbook_core::loans::{
    Draw, DrawStatus, IndexRate, LoanFacility, LoanStatus, LoanType, Payment, PaymentStatus,
    RateType,
};
use loanbook_core::Error;

fn parse_decimal(column: &'static str, value: &str) -> Result<Decimal, Error> {
    Decimal::from_str(value).map_err(|e| {
        StorageError::CorruptValue {
            column,
            message: format!("'{}' is not a decimal ({})", value, e),
        }
        .into()
    })
}

fn parse_optional_decimal(
    column: &'static str,
    value: Option<&str>,
) -> Result<Option<Decimal>, Error> {
    value.map(|v| parse_decimal(column, v)).transpose()
}

fn from_db_int(column: &'static str, value: i32) -> Result<u32, Error> {
    u32::try_from(value).map_err(|_| {
        StorageError::CorruptValue {
            column,
            message: format!("{} is negative", value),
        }
        .into()
    })
}

fn to_db_int(column: &'static str, value: u32) -> Result<i32, Error> {
    i32::try_from(value).map_err(|_| {
        StorageError::CorruptValue {
            column,
            message: format!("{} does not fit in an INTEGER column", value),
        }
        .into()
    })
}

/// Database model for loan facilities
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::loan_facilities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct LoanFacilityDB {
    pub id: String,
    pub project_id: String,
    pub loan_name: String,
    pub lender_name: Option<String>,
    pub loan_type: String,
    pub commitment_amount: String,
    pub funded_amount: String,
    pub interest_rate: String,
    pub rate_type: String,
    pub index_rate: Option<String>,
    pub spread: Option<String>,
    pub floor_rate: Option<String>,
    pub term_months: i32,
    pub io_period_months: i32,
    pub amortization_months: Option<i32>,
    pub origination_fee_percent: String,
    pub origination_fee_amount: String,
    pub exit_fee_percent: Option<String>,
    pub interest_reserve: String,
    pub operating_reserve: String,
    pub replacement_reserve: String,
    pub closing_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub first_payment_date: Option<NaiveDate>,
    pub draw_sequence: i32,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for draws
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Associations,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(belongs_to(LoanFacilityDB, foreign_key = loan_id))]
#[diesel(table_name = crate::schema::loan_draws)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct DrawDB {
    pub id: String,
    pub loan_id: String,
    pub draw_number: i32,
    pub amount: String,
    pub draw_date: NaiveDate,
    pub status: String,
    pub description: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
    pub funded_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Database model for scheduled and paid payments
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    Associations,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(belongs_to(LoanFacilityDB, foreign_key = loan_id))]
#[diesel(table_name = crate::schema::loan_payments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDB {
    pub id: String,
    pub loan_id: String,
    pub payment_number: i32,
    pub payment_date: NaiveDate,
    pub beginning_balance: String,
    pub interest_payment: String,
    pub principal_payment: String,
    pub total_payment: String,
    pub ending_balance: String,
    pub status: String,
    pub paid_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// Conversion to domain models

impl TryFrom<LoanFacilityDB> for LoanFacility {
    type Error = Error;

    fn try_from(db: LoanFacilityDB) -> Result<Self, Self::Error> {
        Ok(Self {
            loan_type: LoanType::from_str(&db.loan_type)?,
            commitment_amount: parse_decimal("commitment_amount", &db.commitment_amount)?,
            funded_amount: parse_decimal("funded_amount", &db.funded_amount)?,
            interest_rate: parse_decimal("interest_rate", &db.interest_rate)?,
            rate_type: RateType::from_str(&db.rate_type)?,
            index_rate: db.index_rate.as_deref().map(IndexRate::from_str).transpose()?,
            spread: parse_optional_decimal("spread", db.spread.as_deref())?,
            floor_rate: parse_optional_decimal("floor_rate", db.floor_rate.as_deref())?,
            term_months: from_db_int("term_months", db.term_months)?,
            io_period_months: from_db_int("io_period_months", db.io_period_months)?,
            amortization_months: db
                .amortization_months
                .map(|m| from_db_int("amortization_months", m))
                .transpose()?,
            origination_fee_percent: parse_decimal(
                "origination_fee_percent",
                &db.origination_fee_percent,
            )?,
            origination_fee_amount: parse_decimal(
                "origination_fee_amount",
                &db.origination_fee_amount,
            )?,
            exit_fee_percent: parse_optional_decimal(
                "exit_fee_percent",
                db.exit_fee_percent.as_deref(),
            )?,
            interest_reserve: parse_decimal("interest_reserve", &db.interest_reserve)?,
            operating_reserve: parse_decimal("operating_reserve", &db.operating_reserve)?,
            replacement_reserve: parse_decimal("replacement_reserve", &db.replacement_reserve)?,
            draw_sequence: from_db_int("draw_sequence", db.draw_sequence)?,
            status: LoanStatus::from_str(&db.status)?,
            id: db.id,
            project_id: db.project_id,
            loan_name: db.loan_name,
            lender_name: db.lender_name,
            closing_date: db.closing_date,
            maturity_date: db.maturity_date,
            first_payment_date: db.first_payment_date,
            notes: db.notes,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl TryFrom<LoanFacility> for LoanFacilityDB {
    type Error = Error;

    fn try_from(domain: LoanFacility) -> Result<Self, Self::Error> {
        Ok(Self {
            loan_type: domain.loan_type.as_str().to_string(),
            commitment_amount: domain.commitment_amount.to_string(),
            funded_amount: domain.funded_amount.to_string(),
            interest_rate: domain.interest_rate.to_string(),
            rate_type: domain.rate_type.as_str().to_string(),
            index_rate: domain.index_rate.map(|i| i.as_str().to_string()),
            spread: domain.spread.map(|d| d.to_string()),
            floor_rate: domain.floor_rate.map(|d| d.to_string()),
            term_months: to_db_int("term_months", domain.term_months)?,
            io_period_months: to_db_int("io_period_months", domain.io_period_months)?,
            amortization_months: domain
                .amortization_months
                .map(|m| to_db_int("amortization_months", m))
                .transpose()?,
            origination_fee_percent: domain.origination_fee_percent.to_string(),
            origination_fee_amount: domain.origination_fee_amount.to_string(),
            exit_fee_percent: domain.exit_fee_percent.map(|d| d.to_string()),
            interest_reserve: domain.interest_reserve.to_string(),
            operating_reserve: domain.operating_reserve.to_string(),
            replacement_reserve: domain.replacement_reserve.to_string(),
            draw_sequence: to_db_int("draw_sequence", domain.draw_sequence)?,
            status: domain.status.as_str().to_string(),
            id: domain.id,
            project_id: domain.project_id,
            loan_name: domain.loan_name,
            lender_name: domain.lender_name,
            closing_date: domain.closing_date,
            maturity_date: domain.maturity_date,
            first_payment_date: domain.first_payment_date,
            notes: domain.notes,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        })
    }
}

impl TryFrom<DrawDB> for Draw {
    type Error = Error;

    fn try_from(db: DrawDB) -> Result<Self, Self::Error> {
        Ok(Self {
            draw_number: from_db_int("draw_number", db.draw_number)?,
            amount: parse_decimal("amount", &db.amount)?,
            status: DrawStatus::from_str(&db.status)?,
            id: db.id,
            loan_id: db.loan_id,
            draw_date: db.draw_date,
            description: db.description,
            approved_at: db.approved_at,
            funded_at: db.funded_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl TryFrom<Draw> for DrawDB {
    type Error = Error;

    fn try_from(domain: Draw) -> Result<Self, Self::Error> {
        Ok(Self {
            draw_number: to_db_int("draw_number", domain.draw_number)?,
            amount: domain.amount.to_string(),
            status: domain.status.as_str().to_string(),
            id: domain.id,
            loan_id: domain.loan_id,
            draw_date: domain.draw_date,
            description: domain.description,
            approved_at: domain.approved_at,
            funded_at: domain.funded_at,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        })
    }
}

impl TryFrom<PaymentDB> for Payment {
    type Error = Error;

    fn try_from(db: PaymentDB) -> Result<Self, Self::Error> {
        Ok(Self {
            payment_number: from_db_int("payment_number", db.payment_number)?,
            beginning_balance: parse_decimal("beginning_balance", &db.beginning_balance)?,
            interest_payment: parse_decimal("interest_payment", &db.interest_payment)?,
            principal_payment: parse_decimal("principal_payment", &db.principal_payment)?,
            total_payment: parse_decimal("total_payment", &db.total_payment)?,
            ending_balance: parse_decimal("ending_balance", &db.ending_balance)?,
            status: PaymentStatus::from_str(&db.status)?,
            id: db.id,
            loan_id: db.loan_id,
            payment_date: db.payment_date,
            paid_date: db.paid_date,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl TryFrom<Payment> for PaymentDB {
    type Error = Error;

    fn try_from(domain: Payment) -> Result<Self, Self::Error> {
        Ok(Self {
            payment_number: to_db_int("payment_number", domain.payment_number)?,
            beginning_balance: domain.beginning_balance.to_string(),
            interest_payment: domain.interest_payment.to_string(),
            principal_payment: domain.principal_payment.to_string(),
            total_payment: domain.total_payment.to_string(),
            ending_balance: domain.ending_balance.to_string(),
            status: domain.status.as_str().to_string(),
            id: domain.id,
            loan_id: domain.loan_id,
            payment_date: domain.payment_date,
            paid_date: domain.paid_date,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        })
    }
}
