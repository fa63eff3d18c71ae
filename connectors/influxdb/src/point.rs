//! Record to line-protocol conversion.
//!
//! ```text
//! {"measurement": "cpu", "tags": "host=a,region=eu", "fields": "load=0.5,cores=8",
//!  "time": "2024-03-01T12:00:00Z", "write_precision": "s"}
//!   => cpu,host=a,region=eu cores=8i,load=0.5 1709294400
//! ```
//!
//! `tags` and `fields` are either comma separated `key=value` strings or JSON
//! objects. Values in the string form are read as JSON where possible
//! (`8` is an integer, `"8"` or `eight` a string).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tidewire_types::{ConnectorError, Record};

/// Timestamp unit, from the record's `write_precision`. Anything unknown is `ns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    S,
    Ms,
    Us,
    #[default]
    Ns,
}

impl Precision {
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("s") => Self::S,
            Some("ms") => Self::Ms,
            Some("us") => Self::Us,
            _ => Self::Ns,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::S => "s",
            Self::Ms => "ms",
            Self::Us => "us",
            Self::Ns => "ns",
        }
    }

    fn timestamp(self, at: DateTime<Utc>) -> Option<i64> {
        match self {
            Self::S => Some(at.timestamp()),
            Self::Ms => Some(at.timestamp_millis()),
            Self::Us => Some(at.timestamp_micros()),
            Self::Ns => at.timestamp_nanos_opt(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl FieldValue {
    /// `None` for JSON null, which InfluxDB cannot store.
    fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Boolean(b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            }),
            Value::String(s) => Some(Self::String(s)),
            other => Some(Self::String(other.to_string())),
        }
    }

    fn write(&self, out: &mut String) {
        match self {
            Self::Float(f) => out.push_str(&f.to_string()),
            Self::Integer(i) => {
                out.push_str(&i.to_string());
                out.push('i');
            }
            Self::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Self::String(s) => {
                out.push('"');
                for ch in s.chars() {
                    if ch == '"' || ch == '\\' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push('"');
            }
        }
    }
}

/// One point, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    /// Sorted by key.
    pub tags: Vec<(String, String)>,
    /// Sorted by key, never empty.
    pub fields: Vec<(String, FieldValue)>,
    pub timestamp: Option<i64>,
    pub precision: Precision,
}

fn missing(name: &str) -> ConnectorError {
    ConnectorError::data(
        "MISSING_FIELD",
        format!("Failed to insert data: request data missing required input field named '{name}'"),
    )
}

fn malformed(name: &str) -> ConnectorError {
    ConnectorError::data(
        "MALFORMED_FIELD",
        format!("Structure of the '{name}' request input field is wrongly formatted"),
    )
}

/// Split `k=v,k2=v2` (or take a JSON object) into key/value pairs.
fn extract_elements(value: &Value, name: &str) -> Result<Vec<(String, Value)>, ConnectorError> {
    match value {
        Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Value::String(csv) => csv
            .split(',')
            .map(|element| {
                let mut parts = element.split('=');
                let (Some(key), Some(raw), None) = (parts.next(), parts.next(), parts.next()) else {
                    return Err(malformed(name));
                };
                let key = key.trim();
                if key.is_empty() {
                    return Err(malformed(name));
                }
                let raw = raw.trim();
                let value =
                    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
                Ok((key.to_string(), value))
            })
            .collect(),
        _ => Err(malformed(name)),
    }
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Integers are taken as already in `precision` units; strings may also be
/// RFC 3339 or `YYYY-MM-DD[ HH:MM:SS]` dates in UTC.
fn parse_time(value: &Value, precision: Precision) -> Result<Option<i64>, ConnectorError> {
    let bad_time = || {
        ConnectorError::data(
            "MALFORMED_TIME",
            "Failed to insert data: request input field 'time' is wrongly formatted",
        )
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_i64().map(Some).ok_or_else(bad_time),
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(ts) = raw.parse::<i64>() {
                return Ok(Some(ts));
            }
            parse_datetime(raw)
                .and_then(|at| precision.timestamp(at))
                .map(Some)
                .ok_or_else(bad_time)
        }
        _ => Err(bad_time()),
    }
}

impl Point {
    /// # Errors
    ///
    /// Fatal data error for a missing `measurement` or `fields`, malformed
    /// `tags`/`fields`, no non-null field, or an unparsable `time`.
    pub fn from_record(record: &Record) -> Result<Self, ConnectorError> {
        let measurement = match record.get("measurement") {
            Some(Value::String(m)) if !m.is_empty() => m.clone(),
            Some(_) => return Err(malformed("measurement")),
            None => return Err(missing("measurement")),
        };

        let mut fields: Vec<(String, FieldValue)> =
            extract_elements(record.get("fields").ok_or_else(|| missing("fields"))?, "fields")?
                .into_iter()
                .filter_map(|(k, v)| FieldValue::from_json(v).map(|v| (k, v)))
                .collect();
        if fields.is_empty() {
            return Err(ConnectorError::data(
                "EMPTY_FIELDS",
                "Request input field named 'fields' must contain at least one element",
            ));
        }
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut tags = match record.get("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
            Some(value) => extract_elements(value, "tags")?
                .into_iter()
                .filter_map(|(k, v)| {
                    let v = match v {
                        Value::Null => return None,
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (!v.is_empty()).then_some((k, v))
                })
                .collect(),
        };
        tags.sort_by(|a, b| a.0.cmp(&b.0));

        let precision = Precision::from_value(record.get("write_precision"));
        let timestamp = match record.get("time") {
            Some(value) => parse_time(value, precision)?,
            None => None,
        };

        Ok(Self {
            measurement,
            tags,
            fields,
            timestamp,
            precision,
        })
    }

    /// Render as a single line-protocol line.
    pub fn to_line(&self) -> String {
        let mut out = String::new();
        escape_into(&mut out, &self.measurement, &[',', ' ']);
        for (key, value) in &self.tags {
            out.push(',');
            escape_into(&mut out, key, &[',', '=', ' ']);
            out.push('=');
            escape_into(&mut out, value, &[',', '=', ' ']);
        }
        out.push(' ');
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            escape_into(&mut out, key, &[',', '=', ' ']);
            out.push('=');
            value.write(&mut out);
        }
        if let Some(ts) = self.timestamp {
            out.push(' ');
            out.push_str(&ts.to_string());
        }
        out
    }
}

fn escape_into(out: &mut String, raw: &str, special: &[char]) {
    for ch in raw.chars() {
        if special.contains(&ch) || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn point(value: Value) -> Result<Point, ConnectorError> {
        Point::from_record(value.as_object().unwrap())
    }

    #[test]
    fn csv_tags_and_fields() {
        let p = point(json!({
            "measurement": "cpu",
            "tags": "region=eu, host=a",
            "fields": "load=0.5,cores=8,name=\"x1\",up=true",
            "time": "2024-03-01T12:00:00Z",
            "write_precision": "s",
        }))
        .unwrap();
        assert_eq!(
            p.to_line(),
            "cpu,host=a,region=eu cores=8i,load=0.5,name=\"x1\",up=true 1709294400"
        );
        assert_eq!(p.precision, Precision::S);
    }

    #[test]
    fn object_fields_without_time() {
        let p = point(json!({
            "measurement": "weather",
            "fields": {"temp": 21.5, "station": "de bilt", "note": null},
        }))
        .unwrap();
        assert_eq!(p.to_line(), "weather station=\"de bilt\",temp=21.5");
        assert_eq!(p.precision, Precision::Ns);
    }

    #[test]
    fn unquoted_string_values_stay_strings() {
        let p = point(json!({"measurement": "m", "fields": "state=open"})).unwrap();
        assert_eq!(p.fields, vec![("state".into(), FieldValue::String("open".into()))]);
    }

    #[test]
    fn special_characters_escaped() {
        let p = point(json!({
            "measurement": "disk usage",
            "tags": {"mount point": "/a,b"},
            "fields": {"msg": "say \"hi\""},
        }))
        .unwrap();
        assert_eq!(
            p.to_line(),
            "disk\\ usage,mount\\ point=/a\\,b msg=\"say \\\"hi\\\"\""
        );
    }

    #[test]
    fn precision_applies_to_datetimes_only() {
        let p = point(json!({
            "measurement": "m",
            "fields": "v=1",
            "time": "2024-03-01 12:00:00",
            "write_precision": "ms",
        }))
        .unwrap();
        assert_eq!(p.timestamp, Some(1_709_294_400_000));

        let p = point(json!({"measurement": "m", "fields": "v=1", "time": 1234})).unwrap();
        assert_eq!(p.timestamp, Some(1234));
    }

    #[test]
    fn missing_measurement_is_fatal() {
        let err = point(json!({"fields": "v=1"})).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.message.contains("'measurement'"));
    }

    #[test]
    fn malformed_fields_are_fatal() {
        for fields in [json!("v"), json!("a=1=2"), json!(""), json!(42)] {
            let err = point(json!({"measurement": "m", "fields": fields})).unwrap_err();
            assert!(err.is_fatal());
            assert_eq!(err.code, "MALFORMED_FIELD");
        }
    }

    #[test]
    fn all_null_fields_rejected() {
        let err = point(json!({"measurement": "m", "fields": {"a": null}})).unwrap_err();
        assert_eq!(err.code, "EMPTY_FIELDS");
    }

    #[test]
    fn bad_time_is_fatal() {
        let err = point(json!({"measurement": "m", "fields": "v=1", "time": "yesterday"}))
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code, "MALFORMED_TIME");
    }

    #[test]
    fn malformed_tags_are_fatal() {
        let err = point(json!({"measurement": "m", "fields": "v=1", "tags": "host"})).unwrap_err();
        assert!(err.message.contains("'tags'"));
    }
}
