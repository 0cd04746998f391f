//! OpenTelemetry instrumentation primitives for SQLite calls.
//!
//! Follows OpenTelemetry semantic conventions for database client spans:
//! - https://opentelemetry.io/docs/specs/semconv/database/database-spans/
//!
//! # Database Semantic Conventions
//!
//! **Span naming**: the operation name (`exec`, `prepare`, `all`, `get`, `run`)
//!
//! **Span kind**: always `CLIENT`
//!
//! **Required attributes**:
//! - `db.system.name`: Always `"sqlite"`
//!
//! **Conditionally required**:
//! - `db.query.text`: SQL text of `prepare` and of statement executions
//!
//! **Status**: `OK` when the call returns, `ERROR` with the error message when
//! it fails.

pub mod attributes;
pub mod span;
pub mod tracer;

pub use attributes::{query_text_attribute, system_attribute, DB_QUERY_TEXT, DB_SYSTEM_NAME, SQLITE};
pub use span::{run_traced, DbSpan, SpanHandle};
pub use tracer::TracerHandle;
