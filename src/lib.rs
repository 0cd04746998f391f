//! OpenTelemetry tracing for a synchronous SQLite client.
//!
//! The crate ships a small SQLite client (`sqlite`) whose operations dispatch
//! through process-wide method tables, and an instrumentation
//! (`instrumentation`) that swaps those methods for traced wrappers:
//! - `Connection::exec` and `Connection::prepare`
//! - `Statement::all`, `Statement::get` and `Statement::run`
//!
//! Each traced call produces one CLIENT span named after the operation, with
//! `db.system.name = "sqlite"` and, where the SQL is known, `db.query.text`.
//! Results and errors are never altered.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlite_otel::{Connection, InstrumentationConfig, SqliteInstrumentation};
//!
//! let instrumentation = SqliteInstrumentation::new(InstrumentationConfig::disabled())?;
//! instrumentation.set_tracer_provider(&provider);
//! instrumentation.enable()?;
//!
//! let db = Connection::open_in_memory()?;
//! db.exec("CREATE TABLE test (id NUMBER NOT NULL, data TEXT)")?;
//!
//! instrumentation.disable()?;
//! ```

pub mod dispatch;
pub mod instrumentation;
pub mod otel;
pub mod sqlite;
pub mod types;

pub use instrumentation::{InstrumentationConfig, SqliteInstrumentation};
pub use sqlite::{Connection, Params, Row, RunResult, Statement};
pub use types::{DatabaseError, InstrumentationError, Result};
