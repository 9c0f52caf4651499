use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use std::collections::BTreeMap;

/// Provider record after renaming: canonical name to raw text, `None` for JSON null.
pub type RawRecord = BTreeMap<&'static str, Option<String>>;

/// Fully coerced record. Every field of the schema is present.
pub type Record = BTreeMap<&'static str, FieldValue>;

/// A single coerced cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Missing,
    Text(String),
    Float(f64),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            FieldValue::Time(t) => Some(*t),
            _ => None,
        }
    }
}

/// Flattens a JSON scalar into the text form the normalizers work on.
pub(crate) fn json_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
