//! SQLite client instrumentation.
//!
//! [`SqliteInstrumentation`] patches the client's method tables through an
//! [`Interceptor`] so that each of these calls produces one CLIENT span:
//!
//! | Span name | Method | `db.query.text` |
//! |---|---|---|
//! | `exec` | `Connection::exec` | not set |
//! | `prepare` | `Connection::prepare` | the SQL argument |
//! | `all`, `get`, `run` | `Statement::all/get/run` | the statement's source SQL |
//!
//! Return values and errors of the patched calls are passed through unchanged.

pub mod config;
pub mod controller;
pub mod interceptor;

pub use config::InstrumentationConfig;
pub use controller::SqliteInstrumentation;
pub use interceptor::{Decorator, Interceptor, PatchKey};
