//! Core types shared across the crate.
//!
//! - `DatabaseError`: errors of database operations
//! - `InstrumentationError`: errors of patch bookkeeping
//! - `Result`: result alias for database operations

pub mod error;

pub use error::{DatabaseError, InstrumentationError, Result};
