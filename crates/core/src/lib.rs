//! Loanbook Core - loan facility domain, amortization engine and services.
//!
//! This crate contains the business rules for committed loan facilities:
//! the amortization calculator, the draw and payment lifecycles and the
//! portfolio rollup. It is database-agnostic and defines traits that are
//! implemented by the `storage-sqlite` crate.

pub mod amortization;
pub mod constants;
pub mod errors;
pub mod loans;
pub mod portfolio;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
