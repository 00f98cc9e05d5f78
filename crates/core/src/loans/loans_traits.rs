//! Loan facility repository and service traits.
//!
//! These traits define the contract for facility, draw and payment operations
//! without any database-specific types, allowing for different storage
//! implementations.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::draws_model::{Draw, NewDraw};
use super::loans_model::{LoanFacility, LoanFacilityUpdate, LoanStatus, NewLoanFacility};
use super::payments_model::{Payment, PaymentScheduleRequest};
use crate::errors::Result;

/// Trait defining the contract for facility persistence.
///
/// Draws and payments are owned by their facility, so one repository covers
/// the whole aggregate. Methods that touch a facility and a child record in
/// the same call must persist both or neither.
#[async_trait]
pub trait LoanRepositoryTrait: Send + Sync {
    /// Retrieves a facility, failing with `LoanError::NotFound` if absent.
    fn get_loan(&self, loan_id: &str) -> Result<LoanFacility>;

    /// Lists facilities, optionally restricted to one project.
    fn list_loans(&self, project_id: Option<&str>) -> Result<Vec<LoanFacility>>;

    async fn insert_loan(&self, loan: LoanFacility) -> Result<LoanFacility>;

    async fn update_loan(&self, loan: LoanFacility) -> Result<LoanFacility>;

    /// Deletes a facility together with its draws and payments.
    ///
    /// Returns the number of deleted facility records.
    async fn delete_loan(&self, loan_id: &str) -> Result<usize>;

    fn get_draw(&self, draw_id: &str) -> Result<Draw>;

    /// Draws of a facility ordered by `draw_number`.
    fn list_draws(&self, loan_id: &str) -> Result<Vec<Draw>>;

    /// Inserts a new draw and stores the facility with its advanced draw
    /// sequence.
    async fn insert_draw(&self, draw: Draw, loan: LoanFacility) -> Result<Draw>;

    async fn update_draw(&self, draw: Draw) -> Result<Draw>;

    async fn delete_draw(&self, draw_id: &str) -> Result<usize>;

    /// Stores a funded draw and the facility's increased funded amount as a
    /// single write.
    async fn save_funded_draw(&self, draw: Draw, loan: LoanFacility)
        -> Result<(Draw, LoanFacility)>;

    fn get_payment(&self, payment_id: &str) -> Result<Payment>;

    /// Payments of a facility ordered by `payment_number`.
    fn list_payments(&self, loan_id: &str) -> Result<Vec<Payment>>;

    /// Removes every `SCHEDULED` row of the facility and inserts `payments`.
    /// Paid rows are kept. Returns the full, ordered schedule.
    async fn replace_scheduled_payments(
        &self,
        loan_id: &str,
        payments: Vec<Payment>,
    ) -> Result<Vec<Payment>>;

    async fn update_payment(&self, payment: Payment) -> Result<Payment>;

    /// Stores an activated facility together with its first payment schedule
    /// as a single write. Existing `SCHEDULED` rows are replaced as in
    /// [`LoanRepositoryTrait::replace_scheduled_payments`].
    async fn save_activated_loan(
        &self,
        loan: LoanFacility,
        payments: Vec<Payment>,
    ) -> Result<(LoanFacility, Vec<Payment>)>;
}

/// Trait defining the contract for facility service operations.
#[async_trait]
pub trait LoanServiceTrait: Send + Sync {
    fn list_loans(&self, project_id: Option<&str>) -> Result<Vec<LoanFacility>>;

    fn get_loan(&self, loan_id: &str) -> Result<LoanFacility>;

    /// Creates a `PROPOSED` facility with its origination fee computed.
    async fn create_loan(&self, new_loan: NewLoanFacility) -> Result<LoanFacility>;

    /// Edits facility terms. Does not recompute the origination fee.
    async fn update_loan(&self, loan_id: &str, update: LoanFacilityUpdate)
        -> Result<LoanFacility>;

    async fn delete_loan(&self, loan_id: &str) -> Result<()>;

    async fn transition_status(&self, loan_id: &str, target: LoanStatus) -> Result<LoanFacility>;

    async fn recompute_origination_fee(&self, loan_id: &str) -> Result<LoanFacility>;

    fn list_draws(&self, loan_id: &str) -> Result<Vec<Draw>>;

    async fn request_draw(&self, loan_id: &str, new_draw: NewDraw) -> Result<Draw>;

    async fn approve_draw(&self, draw_id: &str) -> Result<Draw>;

    async fn fund_draw(&self, draw_id: &str) -> Result<Draw>;

    /// Removes a draw that has not been funded.
    async fn delete_draw(&self, draw_id: &str) -> Result<()>;

    fn list_payments(&self, loan_id: &str) -> Result<Vec<Payment>>;

    async fn generate_payment_schedule(
        &self,
        loan_id: &str,
        request: PaymentScheduleRequest,
    ) -> Result<Vec<Payment>>;

    /// Rebuilds the unpaid part of the schedule from the current balance.
    async fn regenerate_schedule(
        &self,
        loan_id: &str,
        request: PaymentScheduleRequest,
    ) -> Result<Vec<Payment>>;

    async fn record_payment(&self, payment_id: &str, paid_date: Option<NaiveDate>)
        -> Result<Payment>;
}
