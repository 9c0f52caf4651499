//! Side metadata carried next to every table this crate returns.

use crate::schema::FieldProvenance;
use crate::types::LatLon;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Descriptive metadata of a catalog or observation table.
///
/// `provider` holds AEMET's own metadata document (minus the field list,
/// which lives in `fields` as per-column provenance).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub access_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub provider: Map<String, Value>,
    #[serde(default)]
    pub fields: Vec<FieldProvenance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_point: Option<LatLon>,
}

impl Metadata {
    /// Metadata stamped with the current time.
    pub fn accessed_now(provider: Map<String, Value>) -> Self {
        Self {
            access_date: Some(Utc::now()),
            provider,
            ..Self::default()
        }
    }

    /// Folds `other` into `self`. Overlapping provider keys take `other`'s value.
    pub fn merge(&mut self, other: Metadata) {
        self.provider.extend(other.provider);
        if !other.fields.is_empty() {
            self.fields = other.fields;
        }
        if other.access_date.is_some() {
            self.access_date = other.access_date;
        }
        if other.reference_point.is_some() {
            self.reference_point = other.reference_point;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_later_wins() {
        let mut first = Metadata::default();
        first.provider.insert("unidad_generadora".into(), json!("A"));
        first.provider.insert("periodicidad".into(), json!("1 vez al día"));

        let mut second = Metadata::accessed_now(Map::new());
        second.provider.insert("unidad_generadora".into(), json!("B"));
        first.merge(second);

        assert_eq!(first.provider["unidad_generadora"], json!("B"));
        assert_eq!(first.provider["periodicidad"], json!("1 vez al día"));
        assert!(first.access_date.is_some());
    }

    #[test]
    fn test_json_sidecar_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let mut metadata = Metadata::accessed_now(Map::new());
        metadata.reference_point = Some(LatLon(43.46, -3.8));
        let text = serde_json::to_string(&metadata)?;
        let back: Metadata = serde_json::from_str(&text)?;
        assert_eq!(back, metadata);

        let legacy: Metadata = serde_json::from_str("{}")?;
        assert_eq!(legacy, Metadata::default());
        Ok(())
    }
}
