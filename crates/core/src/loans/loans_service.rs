use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use super::draws_model::{Draw, NewDraw};
use super::facility_locks::FacilityLocks;
use super::loans_errors::LoanError;
use super::loans_model::{LoanFacility, LoanFacilityUpdate, LoanStatus, NewLoanFacility};
use super::loans_traits::{LoanRepositoryTrait, LoanServiceTrait};
use super::payments_model::{
    add_months, build_scheduled_payments, Payment, PaymentScheduleRequest,
};
use crate::amortization::generate_schedule_with_terms;
use crate::errors::{Error, Result, ValidationError};

/// Service for managing facilities, their draws and their payment schedules.
///
/// Mutations of one facility are serialized through [`FacilityLocks`]; the
/// repository is injected so the same rules run against any storage.
pub struct LoanService {
    repository: Arc<dyn LoanRepositoryTrait>,
    locks: FacilityLocks,
}

impl LoanService {
    pub fn new(repository: Arc<dyn LoanRepositoryTrait>) -> Self {
        Self {
            repository,
            locks: FacilityLocks::new(),
        }
    }

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Computes replacement rows for the unpaid part of the schedule.
    ///
    /// Paid rows are kept as they are; the balance to amortize is the last
    /// paid row's ending balance, or the funded amount when nothing is paid.
    fn build_remaining_schedule(
        loan: &LoanFacility,
        existing: &[Payment],
        request: &PaymentScheduleRequest,
        now: NaiveDateTime,
    ) -> Result<Vec<Payment>> {
        let last_paid = existing.iter().filter(|p| p.is_paid()).last();
        let paid_count = last_paid.map(|p| p.payment_number).unwrap_or(0);

        let remaining_term = loan.term_months.saturating_sub(paid_count);
        if remaining_term == 0 {
            return Err(LoanError::InvalidPaymentState(format!(
                "all {} payments of loan {} are already paid",
                loan.term_months, loan.id
            ))
            .into());
        }

        let first_payment_date = match (request.first_payment_date, last_paid) {
            (Some(date), _) => date,
            (None, Some(paid)) => add_months(paid.payment_date, 1)?,
            (None, None) => loan.first_payment_date.ok_or_else(|| {
                Error::Validation(ValidationError::MissingField(
                    "firstPaymentDate".to_string(),
                ))
            })?,
        };

        let balance = last_paid
            .map(|p| p.ending_balance)
            .unwrap_or(loan.funded_amount);

        let mut terms = loan.schedule_terms(balance, request.index_fixing);
        terms.term_months = remaining_term;
        terms.io_months = loan.io_period_months.saturating_sub(paid_count);
        if let Some(amortization) = loan.amortization_months {
            let amortized_so_far = paid_count.saturating_sub(loan.io_period_months);
            terms.amortization_months = Some(amortization.saturating_sub(amortized_so_far).max(1));
        }

        let rows = generate_schedule_with_terms(&terms)?;
        build_scheduled_payments(
            &loan.id,
            &rows,
            paid_count + 1,
            first_payment_date,
            now,
            Self::new_id,
        )
    }

    fn ensure_schedulable(loan: &LoanFacility) -> Result<()> {
        if !loan.status.is_outstanding() {
            return Err(LoanError::InvalidPaymentState(format!(
                "loan {} is {}; schedules are generated for CLOSED or ACTIVE loans",
                loan.id, loan.status
            ))
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl LoanServiceTrait for LoanService {
    fn list_loans(&self, project_id: Option<&str>) -> Result<Vec<LoanFacility>> {
        self.repository.list_loans(project_id)
    }

    fn get_loan(&self, loan_id: &str) -> Result<LoanFacility> {
        self.repository.get_loan(loan_id)
    }

    async fn create_loan(&self, new_loan: NewLoanFacility) -> Result<LoanFacility> {
        debug!(
            "Creating loan facility '{}' for project {}",
            new_loan.loan_name, new_loan.project_id
        );
        let loan = LoanFacility::create(new_loan, Self::new_id(), Self::now())?;
        self.repository.insert_loan(loan).await
    }

    async fn update_loan(
        &self,
        loan_id: &str,
        update: LoanFacilityUpdate,
    ) -> Result<LoanFacility> {
        let _guard = self.locks.acquire(loan_id).await;
        let mut loan = self.repository.get_loan(loan_id)?;
        loan.apply_update(update, Self::now())?;
        self.repository.update_loan(loan).await
    }

    async fn delete_loan(&self, loan_id: &str) -> Result<()> {
        {
            let _guard = self.locks.acquire(loan_id).await;
            let deleted = self.repository.delete_loan(loan_id).await?;
            if deleted == 0 {
                return Err(LoanError::loan_not_found(loan_id).into());
            }
        }
        self.locks.forget(loan_id);
        info!("Deleted loan facility {} with its draws and payments", loan_id);
        Ok(())
    }

    async fn transition_status(&self, loan_id: &str, target: LoanStatus) -> Result<LoanFacility> {
        let _guard = self.locks.acquire(loan_id).await;
        let mut loan = self.repository.get_loan(loan_id)?;
        let previous = loan.status;
        let now = Self::now();
        loan.transition_to(target, now)?;

        // Activation with a known first payment date builds the schedule.
        let schedule = if target == LoanStatus::Active && loan.first_payment_date.is_some() {
            let existing = self.repository.list_payments(loan_id)?;
            if existing.is_empty() {
                Some(Self::build_remaining_schedule(
                    &loan,
                    &existing,
                    &PaymentScheduleRequest::default(),
                    now,
                )?)
            } else {
                None
            }
        } else {
            None
        };

        let loan = match schedule {
            Some(payments) => {
                let (loan, payments) = self
                    .repository
                    .save_activated_loan(loan, payments)
                    .await?;
                info!(
                    "Generated {} scheduled payments for loan {}",
                    payments.len(),
                    loan_id
                );
                loan
            }
            None => self.repository.update_loan(loan).await?,
        };
        info!("Loan {} moved from {} to {}", loan_id, previous, target);
        Ok(loan)
    }

    async fn recompute_origination_fee(&self, loan_id: &str) -> Result<LoanFacility> {
        let _guard = self.locks.acquire(loan_id).await;
        let mut loan = self.repository.get_loan(loan_id)?;
        let previous_fee = loan.origination_fee_amount;
        loan.recompute_origination_fee(Self::now())?;
        debug!(
            "Origination fee for loan {} recomputed: {} -> {}",
            loan_id, previous_fee, loan.origination_fee_amount
        );
        self.repository.update_loan(loan).await
    }

    fn list_draws(&self, loan_id: &str) -> Result<Vec<Draw>> {
        self.repository.get_loan(loan_id)?;
        self.repository.list_draws(loan_id)
    }

    async fn request_draw(&self, loan_id: &str, new_draw: NewDraw) -> Result<Draw> {
        new_draw.validate()?;
        let _guard = self.locks.acquire(loan_id).await;
        let mut loan = self.repository.get_loan(loan_id)?;
        if loan.status.is_terminal() {
            return Err(LoanError::InvalidDrawState(format!(
                "loan {} is {} and cannot accept draw requests",
                loan_id, loan.status
            ))
            .into());
        }

        let now = Self::now();
        let draw_number = loan.next_draw_number(now);
        let draw = Draw::request(new_draw, Self::new_id(), loan_id, draw_number, now)?;
        debug!(
            "Requesting draw #{} of {} on loan {}",
            draw_number, draw.amount, loan_id
        );
        self.repository.insert_draw(draw, loan).await
    }

    async fn approve_draw(&self, draw_id: &str) -> Result<Draw> {
        let loan_id = self.repository.get_draw(draw_id)?.loan_id;
        let _guard = self.locks.acquire(&loan_id).await;
        let mut draw = self.repository.get_draw(draw_id)?;
        draw.approve(Self::now())?;
        info!("Approved draw #{} on loan {}", draw.draw_number, loan_id);
        self.repository.update_draw(draw).await
    }

    async fn fund_draw(&self, draw_id: &str) -> Result<Draw> {
        let loan_id = self.repository.get_draw(draw_id)?.loan_id;
        let _guard = self.locks.acquire(&loan_id).await;
        let mut draw = self.repository.get_draw(draw_id)?;
        let mut loan = self.repository.get_loan(&loan_id)?;

        if let Err(err) = loan.fund_draw(&mut draw, Self::now()) {
            warn!("Rejected funding of draw {}: {}", draw_id, err);
            return Err(err);
        }

        let (draw, loan) = self.repository.save_funded_draw(draw, loan).await?;
        info!(
            "Funded draw #{} ({}) on loan {}; funded {} of {}",
            draw.draw_number, draw.amount, loan.id, loan.funded_amount, loan.commitment_amount
        );
        Ok(draw)
    }

    async fn delete_draw(&self, draw_id: &str) -> Result<()> {
        let loan_id = self.repository.get_draw(draw_id)?.loan_id;
        let _guard = self.locks.acquire(&loan_id).await;
        let draw = self.repository.get_draw(draw_id)?;
        if draw.is_funded() {
            return Err(LoanError::InvalidDrawState(format!(
                "draw #{} is FUNDED and cannot be deleted",
                draw.draw_number
            ))
            .into());
        }
        self.repository.delete_draw(draw_id).await?;
        debug!("Deleted draw #{} on loan {}", draw.draw_number, loan_id);
        Ok(())
    }

    fn list_payments(&self, loan_id: &str) -> Result<Vec<Payment>> {
        self.repository.get_loan(loan_id)?;
        self.repository.list_payments(loan_id)
    }

    async fn generate_payment_schedule(
        &self,
        loan_id: &str,
        request: PaymentScheduleRequest,
    ) -> Result<Vec<Payment>> {
        let _guard = self.locks.acquire(loan_id).await;
        let loan = self.repository.get_loan(loan_id)?;
        Self::ensure_schedulable(&loan)?;

        let existing = self.repository.list_payments(loan_id)?;
        if existing.iter().any(Payment::is_paid) {
            return Err(LoanError::InvalidPaymentState(format!(
                "loan {} already has paid rows; regenerate the schedule instead",
                loan_id
            ))
            .into());
        }

        let payments = Self::build_remaining_schedule(&loan, &[], &request, Self::now())?;
        info!(
            "Generating {} scheduled payments for loan {} from principal {}",
            payments.len(),
            loan_id,
            loan.funded_amount
        );
        self.repository
            .replace_scheduled_payments(loan_id, payments)
            .await
    }

    async fn regenerate_schedule(
        &self,
        loan_id: &str,
        request: PaymentScheduleRequest,
    ) -> Result<Vec<Payment>> {
        let _guard = self.locks.acquire(loan_id).await;
        let loan = self.repository.get_loan(loan_id)?;
        Self::ensure_schedulable(&loan)?;

        let existing = self.repository.list_payments(loan_id)?;
        let payments = Self::build_remaining_schedule(&loan, &existing, &request, Self::now())?;
        info!(
            "Regenerating {} unpaid payments for loan {}",
            payments.len(),
            loan_id
        );
        self.repository
            .replace_scheduled_payments(loan_id, payments)
            .await
    }

    async fn record_payment(
        &self,
        payment_id: &str,
        paid_date: Option<NaiveDate>,
    ) -> Result<Payment> {
        let loan_id = self.repository.get_payment(payment_id)?.loan_id;
        let _guard = self.locks.acquire(&loan_id).await;
        let mut payment = self.repository.get_payment(payment_id)?;

        // Postings follow the schedule order so paid rows stay a prefix.
        if let Some(earlier) = self
            .repository
            .list_payments(&loan_id)?
            .into_iter()
            .find(|p| !p.is_paid() && p.payment_number < payment.payment_number)
        {
            return Err(LoanError::InvalidPaymentState(format!(
                "payment #{} is still scheduled and must be recorded first",
                earlier.payment_number
            ))
            .into());
        }

        let now = Self::now();
        payment.mark_paid(paid_date.unwrap_or_else(|| now.date()), now)?;
        info!(
            "Recorded payment #{} ({}) on loan {}",
            payment.payment_number, payment.total_payment, loan_id
        );
        self.repository.update_payment(payment).await
    }
}
