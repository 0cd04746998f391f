//! Error types for the SQLite client and its instrumentation.
//!
//! Uses `thiserror` for error definitions with automatic `From` implementations.
//! Database errors are what callers of `exec`/`prepare`/`all`/`get`/`run` see;
//! instrumentation errors are bookkeeping failures of patching and unpatching.

use thiserror::Error;

/// Errors returned by database operations.
///
/// The instrumentation passes these through untouched: a traced call returns
/// the very same value the untraced call would have returned.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite rejected the statement or failed while executing it.
    ///
    /// Transparent so the message is SQLite's own
    /// (e.g. `near "invalid": syntax error`).
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// A named parameter does not appear in the statement
    #[error("Unknown named parameter: {0}")]
    UnknownParameter(String),
}

impl DatabaseError {
    /// Create an unknown-parameter error.
    pub fn unknown_parameter(name: impl Into<String>) -> Self {
        Self::UnknownParameter(name.into())
    }
}

/// Errors raised while installing or removing instrumentation.
///
/// These are programmer errors. They are surfaced to the caller of
/// `enable`/`disable` instead of being swallowed.
#[derive(Error, Debug)]
pub enum InstrumentationError {
    /// The method already has an entry in the patch record
    #[error("{target}.{method} is already wrapped")]
    AlreadyWrapped {
        target: &'static str,
        method: String,
    },

    /// The prototype has no method with this name
    #[error("{target} has no method named {method}")]
    UnknownMethod {
        target: &'static str,
        method: String,
    },

    /// The recorded original does not have the slot's signature
    #[error("Patch record for {target}.{method} does not match the method signature")]
    PatchMismatch {
        target: &'static str,
        method: String,
    },

    /// Configuration could not be parsed
    #[error("Invalid instrumentation config: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// Result alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
