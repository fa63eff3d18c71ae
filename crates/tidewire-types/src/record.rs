//! Record representation shared by inbound and outbound connectors.

/// A single record: an ordered map of field name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Build a record with a single `message` field, the shape queue sources emit.
#[must_use]
pub fn message_record(body: impl Into<String>) -> Record {
    let mut record = Record::new();
    record.insert("message".to_string(), serde_json::Value::String(body.into()));
    record
}

/// Copy `record` with every field name lower-cased.
///
/// Some warehouses upper-case unquoted column names; callers expect the
/// deployment's lower-case field names.
#[must_use]
pub fn lowercase_fields(record: Record) -> Record {
    record
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_record_has_single_field() {
        let record = message_record("hello");
        assert_eq!(record.len(), 1);
        assert_eq!(record["message"], json!("hello"));
    }

    #[test]
    fn lowercase_fields_keeps_values() {
        let mut record = Record::new();
        record.insert("PRICE".into(), json!(2.4));
        record.insert("Name".into(), json!("apple"));
        let lowered = lowercase_fields(record);
        assert_eq!(lowered["price"], json!(2.4));
        assert_eq!(lowered["name"], json!("apple"));
        assert!(!lowered.contains_key("PRICE"));
    }
}
