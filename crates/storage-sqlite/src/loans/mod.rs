//! SQLite storage implementation for loan facilities, draws and payments.

mod model;
mod repository;


pub use model::{DrawDB, LoanFacilityDB, PaymentDB};
pub use repository::LoanRepository;
