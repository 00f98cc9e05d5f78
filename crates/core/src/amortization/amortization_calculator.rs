//! Level-payment amortization with an interest-only phase.
//!
//! The level payment is recomputed every amortizing period from the current
//! balance and the number of periods left, rather than fixed once up front.
//! Each row therefore absorbs whatever rounding the previous rows introduced,
//! and the same routine can restart from any balance (curtailments, rate
//! resets) by being called again with the remaining terms.

use log::debug;
use rust_decimal::prelude::*;
use rust_decimal::MathematicalOps;

use super::amortization_model::{SchedulePreview, ScheduleRow, ScheduleSummary, ScheduleTerms};
use crate::constants::{CURRENCY_SCALE, MONTHS_PER_YEAR};
use crate::errors::Result;
use crate::loans::LoanError;

/// Generates a month-by-month schedule of `term_months` rows.
///
/// The first `io_months` rows pay interest only; the remaining rows amortize
/// the balance to zero.
pub fn generate_schedule(
    principal: Decimal,
    annual_rate: Decimal,
    term_months: u32,
    io_months: u32,
) -> Result<Vec<ScheduleRow>> {
    generate_schedule_with_terms(&ScheduleTerms::new(
        principal,
        annual_rate,
        term_months,
        io_months,
    ))
}

/// Generates a schedule, honouring an amortization horizon that may differ
/// from the term. A horizon longer than the amortizing part of the term leaves
/// a balloon on the final row.
pub fn generate_schedule_with_terms(terms: &ScheduleTerms) -> Result<Vec<ScheduleRow>> {
    terms.validate()?;
    debug!(
        "Generating schedule: principal={}, rate={}, term={}, io={}, amortization={:?}",
        terms.principal,
        terms.annual_rate,
        terms.term_months,
        terms.io_months,
        terms.amortization_months
    );

    let monthly_rate = terms.annual_rate / Decimal::from(MONTHS_PER_YEAR);
    let horizon = terms.amortizing_horizon();

    let mut balance = terms.principal;
    let mut total_paid = Decimal::ZERO;
    let mut rows = Vec::with_capacity(terms.term_months as usize);

    for period in 1..=terms.term_months {
        let beginning_balance = balance;
        let interest = round_currency(
            beginning_balance
                .checked_mul(monthly_rate)
                .ok_or_else(|| out_of_range(beginning_balance, monthly_rate))?,
        );
        let is_interest_only = period <= terms.io_months;

        let principal = if is_interest_only || beginning_balance <= Decimal::ZERO {
            Decimal::ZERO
        } else {
            let elapsed = period - terms.io_months;
            // Count of payments left on the horizon, including this one.
            match (horizon + 1).checked_sub(elapsed) {
                None | Some(0) => Decimal::ZERO,
                Some(1) => beginning_balance,
                Some(remaining) => {
                    let payment = level_payment(beginning_balance, monthly_rate, remaining)?;
                    round_currency(payment - interest)
                        .max(Decimal::ZERO)
                        .min(beginning_balance)
                }
            }
        };

        balance = (beginning_balance - principal).max(Decimal::ZERO);
        let total_payment = interest
            .checked_add(principal)
            .ok_or_else(|| out_of_range(beginning_balance, monthly_rate))?;
        // Schedule totals are summed from these rows and must stay representable.
        total_paid = total_paid
            .checked_add(total_payment)
            .ok_or_else(|| out_of_range(beginning_balance, monthly_rate))?;
        rows.push(ScheduleRow {
            period,
            beginning_balance,
            interest_payment: interest,
            principal_payment: principal,
            total_payment,
            ending_balance: balance,
            is_interest_only,
        });
    }

    Ok(rows)
}

/// Computes the schedule together with its totals.
pub fn preview_schedule(terms: ScheduleTerms) -> Result<SchedulePreview> {
    let rows = generate_schedule_with_terms(&terms)?;
    let summary = ScheduleSummary::from_rows(&rows);
    Ok(SchedulePreview {
        terms,
        rows,
        summary,
    })
}

/// Annuity payment that retires `balance` over `periods` at `monthly_rate`.
pub fn level_payment(balance: Decimal, monthly_rate: Decimal, periods: u32) -> Result<Decimal> {
    if balance <= Decimal::ZERO || periods == 0 {
        return Ok(Decimal::ZERO);
    }
    if monthly_rate.is_zero() {
        return Ok(balance / Decimal::from(periods));
    }

    let overflow = || {
        LoanError::InvalidScheduleInput(format!(
            "rate {} over {} periods exceeds the supported decimal range",
            monthly_rate, periods
        ))
    };

    let growth = (Decimal::ONE + monthly_rate)
        .checked_powu(u64::from(periods))
        .ok_or_else(overflow)?;
    let denominator = growth - Decimal::ONE;
    if denominator.is_zero() {
        return Ok(balance / Decimal::from(periods));
    }

    balance
        .checked_mul(monthly_rate)
        .and_then(|v| v.checked_mul(growth))
        .and_then(|v| v.checked_div(denominator))
        .ok_or_else(|| overflow().into())
}

fn out_of_range(balance: Decimal, monthly_rate: Decimal) -> crate::Error {
    LoanError::InvalidScheduleInput(format!(
        "balance {} at monthly rate {} exceeds the supported decimal range",
        balance, monthly_rate
    ))
    .into()
}

fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
