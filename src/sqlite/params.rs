//! Statement parameters.

use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};

use crate::types::{DatabaseError, Result};

const NAMED_PREFIXES: [char; 3] = [':', '@', '$'];

/// Values bound to a statement for one execution.
///
/// Parameters left unbound are NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    /// Bound by position, first value to `?1`
    Positional(Vec<Value>),
    /// Bound by name; the `:`, `@` or `$` prefix may be omitted
    Named(Map<String, Value>),
}

impl Params {
    pub(crate) fn bind(&self, stmt: &mut rusqlite::Statement<'_>) -> Result<()> {
        match self {
            Self::None => {}
            Self::Positional(values) => {
                for (index, value) in values.iter().enumerate() {
                    stmt.raw_bind_parameter(index + 1, to_sql_value(value))?;
                }
            }
            Self::Named(values) => {
                for (name, value) in values {
                    let index = parameter_index(stmt, name)?
                        .ok_or_else(|| DatabaseError::unknown_parameter(name.as_str()))?;
                    stmt.raw_bind_parameter(index, to_sql_value(value))?;
                }
            }
        }
        Ok(())
    }
}

fn parameter_index(stmt: &rusqlite::Statement<'_>, name: &str) -> Result<Option<usize>> {
    if name.starts_with(&NAMED_PREFIXES[..]) {
        return Ok(stmt.parameter_index(name)?);
    }
    for prefix in NAMED_PREFIXES {
        if let Some(index) = stmt.parameter_index(&format!("{prefix}{name}"))? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => number
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| number.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(values: Map<String, Value>) -> Self {
        Self::Named(values)
    }
}

impl From<Value> for Params {
    /// Objects bind by name, arrays by position, `null` binds nothing and any
    /// other scalar is the single positional value.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::None,
            Value::Object(values) => Self::Named(values),
            Value::Array(values) => Self::Positional(values),
            scalar => Self::Positional(vec![scalar]),
        }
    }
}
