//! Unit tests for facility, draw and payment models.

use super::*;
use crate::amortization::generate_schedule;
use crate::errors::{Error, ValidationError};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn at(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn new_loan() -> NewLoanFacility {
    NewLoanFacility {
        project_id: "project-1".to_string(),
        loan_name: "Riverside construction loan".to_string(),
        lender_name: Some("First Regional".to_string()),
        loan_type: LoanType::Construction,
        commitment_amount: dec!(500_000),
        interest_rate: dec!(0.085),
        rate_type: RateType::Fixed,
        index_rate: None,
        spread: None,
        floor_rate: None,
        term_months: 24,
        io_period_months: 6,
        amortization_months: None,
        origination_fee_percent: dec!(0.01),
        exit_fee_percent: None,
        interest_reserve: dec!(25_000),
        operating_reserve: Decimal::ZERO,
        replacement_reserve: Decimal::ZERO,
        closing_date: None,
        maturity_date: None,
        first_payment_date: None,
        notes: None,
    }
}

fn update_from(loan: &LoanFacility) -> LoanFacilityUpdate {
    LoanFacilityUpdate {
        loan_name: loan.loan_name.clone(),
        lender_name: loan.lender_name.clone(),
        loan_type: loan.loan_type,
        commitment_amount: loan.commitment_amount,
        interest_rate: loan.interest_rate,
        rate_type: loan.rate_type,
        index_rate: loan.index_rate,
        spread: loan.spread,
        floor_rate: loan.floor_rate,
        term_months: loan.term_months,
        io_period_months: loan.io_period_months,
        amortization_months: loan.amortization_months,
        origination_fee_percent: loan.origination_fee_percent,
        exit_fee_percent: loan.exit_fee_percent,
        interest_reserve: loan.interest_reserve,
        operating_reserve: loan.operating_reserve,
        replacement_reserve: loan.replacement_reserve,
        closing_date: loan.closing_date,
        maturity_date: loan.maturity_date,
        first_payment_date: loan.first_payment_date,
        notes: loan.notes.clone(),
    }
}

fn created() -> LoanFacility {
    LoanFacility::create(new_loan(), "loan-1".to_string(), at(1)).unwrap()
}

fn approved_draw(loan: &mut LoanFacility, amount: Decimal) -> Draw {
    let number = loan.next_draw_number(at(2));
    let mut draw = Draw::request(
        NewDraw {
            amount,
            draw_date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            description: None,
        },
        format!("draw-{}", number),
        &loan.id,
        number,
        at(2),
    )
    .unwrap();
    draw.approve(at(3)).unwrap();
    draw
}

#[test]
fn create_starts_proposed_with_frozen_fee() {
    let loan = created();
    assert_eq!(loan.status, LoanStatus::Proposed);
    assert_eq!(loan.funded_amount, Decimal::ZERO);
    assert_eq!(loan.draw_sequence, 0);
    assert_eq!(loan.origination_fee_amount, dec!(5000.00));
    assert_eq!(loan.created_at, loan.updated_at);
}

#[test]
fn create_rejects_invalid_terms() {
    let mut input = new_loan();
    input.io_period_months = 30;
    assert!(matches!(
        LoanFacility::create(input, "x".to_string(), at(1)),
        Err(Error::Validation(ValidationError::InvalidInput(_)))
    ));

    let mut input = new_loan();
    input.commitment_amount = dec!(-1);
    assert!(LoanFacility::create(input, "x".to_string(), at(1)).is_err());

    let mut input = new_loan();
    input.rate_type = RateType::Floating;
    assert!(matches!(
        LoanFacility::create(input, "x".to_string(), at(1)),
        Err(Error::Validation(ValidationError::MissingField(_)))
    ));

    let mut input = new_loan();
    input.term_months = 0;
    assert!(LoanFacility::create(input, "x".to_string(), at(1)).is_err());
}

#[test]
fn status_moves_forward_one_step_at_a_time() {
    let mut loan = created();
    let path = [
        LoanStatus::TermSheet,
        LoanStatus::Application,
        LoanStatus::Underwriting,
        LoanStatus::Approved,
        LoanStatus::Closed,
        LoanStatus::Active,
        LoanStatus::PaidOff,
    ];
    for (day, target) in path.into_iter().enumerate() {
        assert_eq!(loan.status.next(), Some(target));
        loan.transition_to(target, at(day as u32 + 2)).unwrap();
        assert_eq!(loan.status, target);
    }
    assert_eq!(loan.status.next(), None);
}

#[test]
fn status_rejects_skips_and_reversals() {
    let mut loan = created();
    let err = loan.transition_to(LoanStatus::Approved, at(2)).unwrap_err();
    assert!(matches!(
        err,
        Error::Loan(LoanError::InvalidStatusTransition {
            from: LoanStatus::Proposed,
            to: LoanStatus::Approved
        })
    ));
    assert_eq!(loan.status, LoanStatus::Proposed);
    assert_eq!(loan.updated_at, at(1));

    assert!(!LoanStatus::Active.can_transition_to(LoanStatus::Closed));
    assert!(!LoanStatus::Closed.can_transition_to(LoanStatus::Defaulted));
    assert!(!LoanStatus::Defaulted.can_transition_to(LoanStatus::Active));
    assert!(LoanStatus::Active.can_transition_to(LoanStatus::Defaulted));
    assert_eq!(LoanStatus::Active.next(), Some(LoanStatus::PaidOff));
}

#[test]
fn status_round_trips_through_strings() {
    for status in [
        LoanStatus::Proposed,
        LoanStatus::TermSheet,
        LoanStatus::PaidOff,
        LoanStatus::Defaulted,
    ] {
        assert_eq!(status.as_str().parse::<LoanStatus>().unwrap(), status);
    }
    assert!("OPEN".parse::<LoanStatus>().is_err());
}

#[test]
fn editing_commitment_keeps_origination_fee_until_recomputed() {
    let mut loan = created();
    let mut update = update_from(&loan);
    update.commitment_amount = dec!(800_000);
    loan.apply_update(update, at(5)).unwrap();

    assert_eq!(loan.commitment_amount, dec!(800_000));
    assert_eq!(loan.origination_fee_amount, dec!(5000.00));
    assert_eq!(loan.updated_at, at(5));

    loan.recompute_origination_fee(at(6)).unwrap();
    assert_eq!(loan.origination_fee_amount, dec!(8000.00));
}

#[test]
fn update_cannot_drop_commitment_below_funded() {
    let mut loan = created();
    loan.funded_amount = dec!(300_000);
    let before = loan.clone();

    let mut update = update_from(&loan);
    update.commitment_amount = dec!(250_000);
    assert!(loan.apply_update(update, at(5)).is_err());
    assert_eq!(loan, before);
}

#[test]
fn updated_at_never_moves_backwards() {
    let mut loan = created();
    loan.touch(at(10));
    loan.touch(at(4));
    assert_eq!(loan.updated_at, at(10));
    assert_eq!(loan.created_at, at(1));
}

#[test]
fn funding_enforces_the_commitment() {
    let mut loan = created();
    loan.funded_amount = dec!(450_000);

    let mut too_large = approved_draw(&mut loan, dec!(75_000));
    let err = loan.fund_draw(&mut too_large, at(4)).unwrap_err();
    assert!(matches!(
        err,
        Error::Loan(LoanError::DrawExceedsCommitment { .. })
    ));
    assert_eq!(loan.funded_amount, dec!(450_000));
    assert_eq!(too_large.status, DrawStatus::Approved);

    let mut fits = approved_draw(&mut loan, dec!(50_000));
    loan.fund_draw(&mut fits, at(4)).unwrap();
    assert_eq!(loan.funded_amount, dec!(500_000));
    assert_eq!(fits.status, DrawStatus::Funded);
    assert_eq!(fits.funded_at, Some(at(4)));
    assert_eq!(loan.available_to_fund(), Decimal::ZERO);
}

#[test]
fn amounts_at_the_decimal_limit_are_rejected_not_overflowed() {
    let mut input = new_loan();
    input.commitment_amount = Decimal::MAX;
    input.origination_fee_percent = dec!(2);
    assert!(matches!(
        LoanFacility::create(input, "x".to_string(), at(1)),
        Err(Error::Validation(ValidationError::InvalidInput(_)))
    ));

    let mut input = new_loan();
    input.commitment_amount = Decimal::MAX;
    input.origination_fee_percent = Decimal::ZERO;
    let mut loan = LoanFacility::create(input, "loan-1".to_string(), at(1)).unwrap();
    loan.funded_amount = Decimal::MAX;
    loan.origination_fee_percent = dec!(1.5);
    assert!(loan.recompute_origination_fee(at(2)).is_err());

    let mut draw = approved_draw(&mut loan, Decimal::MAX / dec!(2));
    let err = loan.fund_draw(&mut draw, at(4)).unwrap_err();
    assert!(matches!(
        err,
        Error::Loan(LoanError::DrawExceedsCommitment { .. })
    ));
    assert_eq!(loan.funded_amount, Decimal::MAX);
    assert_eq!(draw.status, DrawStatus::Approved);
}

#[test]
fn funding_requires_an_approved_draw() {
    let mut loan = created();
    let number = loan.next_draw_number(at(2));
    let mut draw = Draw::request(
        NewDraw {
            amount: dec!(10_000),
            draw_date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            description: None,
        },
        "draw-1".to_string(),
        &loan.id,
        number,
        at(2),
    )
    .unwrap();

    assert!(matches!(
        loan.fund_draw(&mut draw, at(3)),
        Err(Error::Loan(LoanError::InvalidDrawState(_)))
    ));
    assert_eq!(loan.funded_amount, Decimal::ZERO);

    draw.approve(at(3)).unwrap();
    assert!(draw.approve(at(3)).is_err());
    loan.fund_draw(&mut draw, at(4)).unwrap();
    assert!(loan.fund_draw(&mut draw, at(5)).is_err());
    assert_eq!(loan.funded_amount, dec!(10_000));
}

#[test]
fn non_positive_draws_are_rejected() {
    for amount in [Decimal::ZERO, dec!(-5)] {
        let result = Draw::request(
            NewDraw {
                amount,
                draw_date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
                description: None,
            },
            "draw".to_string(),
            "loan-1",
            1,
            at(2),
        );
        assert!(matches!(
            result,
            Err(Error::Loan(LoanError::InvalidDrawAmount(_)))
        ));
    }
}

#[test]
fn floating_rate_applies_spread_and_floor() {
    let mut loan = created();
    loan.rate_type = RateType::Floating;
    loan.index_rate = Some(IndexRate::Sofr);
    loan.spread = Some(dec!(0.03));

    assert_eq!(loan.effective_rate(Some(dec!(0.043))), dec!(0.073));
    assert_eq!(loan.effective_rate(None), dec!(0.085));

    loan.floor_rate = Some(dec!(0.08));
    assert_eq!(loan.effective_rate(Some(dec!(0.043))), dec!(0.08));
    assert_eq!(loan.effective_rate(Some(dec!(0.06))), dec!(0.09));

    loan.rate_type = RateType::Fixed;
    assert_eq!(loan.effective_rate(Some(dec!(0.06))), dec!(0.085));
}

#[test]
fn scheduled_payments_are_dated_monthly() {
    let rows = generate_schedule(dec!(12_000), Decimal::ZERO, 3, 0).unwrap();
    let first = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let mut counter = 0;
    let payments = build_scheduled_payments("loan-1", &rows, 1, first, at(1), || {
        counter += 1;
        format!("payment-{}", counter)
    })
    .unwrap();

    let numbers: Vec<u32> = payments.iter().map(|p| p.payment_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(payments[1].payment_date, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    assert_eq!(payments[2].payment_date, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    assert!(payments.iter().all(|p| p.status == PaymentStatus::Scheduled));
    assert_eq!(payments[2].id, "payment-3");
}

#[test]
fn payments_post_once() {
    let rows = generate_schedule(dec!(1_000), dec!(0.05), 1, 0).unwrap();
    let first = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
    let mut payment = build_scheduled_payments("loan-1", &rows, 1, first, at(1), || {
        "payment-1".to_string()
    })
    .unwrap()
    .remove(0);
    let amounts = (payment.total_payment, payment.ending_balance);

    payment.mark_paid(first, at(2)).unwrap();
    assert!(payment.is_paid());
    assert_eq!(payment.paid_date, Some(first));
    assert_eq!((payment.total_payment, payment.ending_balance), amounts);

    assert!(matches!(
        payment.mark_paid(first, at(3)),
        Err(Error::Loan(LoanError::InvalidPaymentState(_)))
    ));
}
