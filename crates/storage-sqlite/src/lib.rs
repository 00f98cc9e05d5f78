//! SQLite storage implementation for Loanbook.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `loanbook-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - The loan facility repository (facilities, draws, payments)
//! - Database-specific model types (with Diesel derives)
//!
//! ```text
//!         core (domain)
//!               │
//!               ▼
//!   storage-sqlite (this crate)
//!               │
//!               ▼
//!           SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod loans;
pub mod schema;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from loanbook-core for convenience
pub use loanbook_core::errors::{DatabaseError, Error, Result};
