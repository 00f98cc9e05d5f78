//! Loans module - facilities, draws, payment schedules and their lifecycle rules.

mod draws_model;
mod facility_locks;
mod loans_errors;
mod loans_model;
mod loans_service;
mod loans_traits;
mod payments_model;

#[cfg(test)]
mod loans_model_tests;


pub use draws_model::{Draw, DrawStatus, NewDraw};
pub use facility_locks::FacilityLocks;
pub use loans_errors::LoanError;
pub use loans_model::{
    IndexRate, LoanFacility, LoanFacilityUpdate, LoanStatus, LoanType, NewLoanFacility, RateType,
    MAX_TERM_MONTHS,
};
pub use loans_service::LoanService;
pub use loans_traits::{LoanRepositoryTrait, LoanServiceTrait};
pub use payments_model::{
    add_months, build_scheduled_payments, Payment, PaymentScheduleRequest, PaymentStatus,
};
