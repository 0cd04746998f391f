//! Database span attributes.

use opentelemetry::KeyValue;

pub use opentelemetry_semantic_conventions::attribute::{DB_QUERY_TEXT, DB_SYSTEM_NAME};

/// `db.system.name` value for SQLite.
pub const SQLITE: &str = "sqlite";

/// `db.system.name = "sqlite"`, carried by every span.
pub fn system_attribute() -> KeyValue {
    KeyValue::new(DB_SYSTEM_NAME, SQLITE)
}

/// `db.query.text` for operations whose SQL text is known.
pub fn query_text_attribute(sql: &str) -> KeyValue {
    KeyValue::new(DB_QUERY_TEXT, sql.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_keys() {
        assert_eq!(DB_SYSTEM_NAME, "db.system.name");
        assert_eq!(DB_QUERY_TEXT, "db.query.text");
    }

    #[test]
    fn test_attribute_values() {
        let system = system_attribute();
        assert_eq!(system.key.as_str(), DB_SYSTEM_NAME);
        assert_eq!(system.value.as_str(), "sqlite");

        let query = query_text_attribute("SELECT 1");
        assert_eq!(query.key.as_str(), DB_QUERY_TEXT);
        assert_eq!(query.value.as_str(), "SELECT 1");
    }
}
