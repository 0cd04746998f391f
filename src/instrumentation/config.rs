//! Instrumentation configuration.

use serde::{Deserialize, Serialize};

use crate::types::InstrumentationError;

/// Options accepted by `SqliteInstrumentation::new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    /// Enable as soon as the instrumentation is constructed
    pub enabled: bool,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl InstrumentationConfig {
    /// Config that leaves the instrumentation disabled until `enable` is called.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, InstrumentationError> {
        Ok(serde_json::from_str(json)?)
    }
}
