//! Translation between AEMET field identifiers and the canonical column names
//! exposed by this crate.
//!
//! A [`FieldSchema`] is a view over one of the static tables in [`tables`]. It
//! renames provider records, coerces every field to its declared [`FieldKind`],
//! records per-field provenance and materializes records as a Polars
//! [`DataFrame`].

mod record;
pub mod tables;

pub use record::{FieldValue, RawRecord, Record};
pub(crate) use record::json_to_text;

use crate::normalize::error::FormatError;
use crate::normalize::{coordinates, hours, sentinels};
use chrono::{Datelike, NaiveDate, Timelike};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tables::{OBSERVATION_FIELDS, SITE_FIELDS};

/// Days between 0001-01-01 and 1970-01-01, the Polars `Date` epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Declared scalar type of a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Float,
    /// Sexagesimal `DDMMSS[NSEW]` decoded into decimal degrees.
    Coordinate,
    Date,
    /// Hour-of-extreme, decoded by [`crate::normalize::hours`].
    Hour,
}

/// Where the value of a field comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrigin {
    /// Sent by AEMET.
    Provider,
    /// Filled in by reverse geocoding.
    Geocoded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// AEMET's key for the field; `None` for geocoded fields.
    pub provider_id: Option<&'static str>,
    pub kind: FieldKind,
    pub origin: FieldOrigin,
}

/// Provenance entry for one canonical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProvenance {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub kind: FieldKind,
    pub origin: FieldOrigin,
    /// The provider's own description of the field (minus its `id`), when the
    /// field was present in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    fields: &'static [FieldSpec],
}

impl FieldSchema {
    pub const SITES: FieldSchema = FieldSchema {
        fields: SITE_FIELDS,
    };
    pub const OBSERVATIONS: FieldSchema = FieldSchema {
        fields: OBSERVATION_FIELDS,
    };

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Canonical name of a provider-sent field. Matching is case-insensitive.
    pub fn canonical_name(&self, provider_id: &str) -> Option<&'static str> {
        self.provider_fields()
            .find(|f| f.provider_id.is_some_and(|id| id.eq_ignore_ascii_case(provider_id)))
            .map(|f| f.name)
    }

    /// AEMET's key for a canonical field; `None` for unknown and geocoded fields.
    pub fn provider_id(&self, canonical: &str) -> Option<&'static str> {
        self.field(canonical).and_then(|f| f.provider_id)
    }

    fn provider_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields
            .iter()
            .filter(|f| f.origin == FieldOrigin::Provider)
    }

    /// Renames provider keys to canonical names. Unknown keys are dropped.
    pub fn rename(&self, raw: &Map<String, Value>) -> RawRecord {
        raw.iter()
            .filter_map(|(key, value)| {
                self.canonical_name(key)
                    .map(|name| (name, json_to_text(value)))
            })
            .collect()
    }

    /// Coerces a renamed record into the declared kinds. Fields absent from
    /// `raw` come out as [`FieldValue::Missing`].
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] for unparseable numbers, coordinates and
    /// dates. Hour fields never fail; invalid hours become missing.
    pub fn coerce(&self, mut raw: RawRecord) -> Result<Record, FormatError> {
        self.fields
            .iter()
            .map(|spec| {
                let value = raw.remove(spec.name).flatten();
                Ok((spec.name, coerce_value(spec, value.as_deref())?))
            })
            .collect()
    }

    /// `coerce(rename(raw))`.
    pub fn translate(&self, raw: &Map<String, Value>) -> Result<Record, FormatError> {
        self.coerce(self.rename(raw))
    }

    /// Builds one provenance entry per canonical field.
    ///
    /// For fields listed in `present`, the provider descriptor whose `id`
    /// matches the field's provider id (case-insensitive) is attached.
    pub fn attach_provenance(
        &self,
        present: &BTreeSet<&str>,
        provider_fields: &[Value],
    ) -> Vec<FieldProvenance> {
        self.fields
            .iter()
            .map(|spec| {
                let provider = spec
                    .provider_id
                    .filter(|_| present.contains(spec.name))
                    .and_then(|id| find_descriptor(provider_fields, id));
                FieldProvenance {
                    name: spec.name.to_string(),
                    provider_id: spec.provider_id.map(str::to_string),
                    kind: spec.kind,
                    origin: spec.origin,
                    provider,
                }
            })
            .collect()
    }

    /// Materializes records as a frame with one column per field, in table order.
    pub fn to_frame(&self, records: &[Record]) -> PolarsResult<DataFrame> {
        let columns = self
            .fields
            .iter()
            .map(|spec| build_column(spec, records))
            .collect::<PolarsResult<Vec<_>>>()?;
        DataFrame::new(columns)
    }

    /// Zero-row frame with the full schema.
    pub fn empty_frame(&self) -> PolarsResult<DataFrame> {
        self.to_frame(&[])
    }
}

fn find_descriptor(provider_fields: &[Value], provider_id: &str) -> Option<Map<String, Value>> {
    provider_fields.iter().find_map(|descriptor| {
        let object = descriptor.as_object()?;
        let id = object.get("id")?.as_str()?;
        if !id.eq_ignore_ascii_case(provider_id) {
            return None;
        }
        Some(
            object
                .iter()
                .filter(|(k, _)| k.as_str() != "id")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    })
}

fn coerce_value(spec: &FieldSpec, value: Option<&str>) -> Result<FieldValue, FormatError> {
    let value = value.map(str::trim).filter(|v| !v.is_empty());
    match (spec.kind, value) {
        (FieldKind::Hour, v) => Ok(hours::normalize(v).map_or(FieldValue::Missing, FieldValue::Time)),
        (_, None) => Ok(FieldValue::Missing),
        (FieldKind::Text, Some(v)) => Ok(FieldValue::Text(sentinels::strip_newlines(v).into_owned())),
        (FieldKind::Float, Some(v)) => {
            v.parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|_| FormatError::InvalidNumber {
                    field: spec.name.to_string(),
                    value: v.to_string(),
                })
        }
        (FieldKind::Coordinate, Some(v)) => coordinates::decode(v).map(FieldValue::Float),
        (FieldKind::Date, Some(v)) => NaiveDate::parse_from_str(v, DATE_FORMAT)
            .map(FieldValue::Date)
            .map_err(|_| FormatError::InvalidDate {
                field: spec.name.to_string(),
                value: v.to_string(),
            }),
    }
}

fn build_column(spec: &FieldSpec, records: &[Record]) -> PolarsResult<Column> {
    let name = PlSmallStr::from_static(spec.name);
    let cells = records.iter().map(|r| r.get(spec.name));
    let series = match spec.kind {
        FieldKind::Text => {
            StringChunked::from_iter_options(name, cells.map(|v| v.and_then(FieldValue::as_str)))
                .into_series()
        }
        FieldKind::Float | FieldKind::Coordinate => {
            Float64Chunked::from_iter_options(name, cells.map(|v| v.and_then(FieldValue::as_f64)))
                .into_series()
        }
        FieldKind::Date => Int32Chunked::from_iter_options(
            name,
            cells.map(|v| {
                v.and_then(FieldValue::as_date)
                    .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            }),
        )
        .into_date()
        .into_series(),
        FieldKind::Hour => Int64Chunked::from_iter_options(
            name,
            cells.map(|v| {
                v.and_then(FieldValue::as_time).map(|t| {
                    i64::from(t.num_seconds_from_midnight()) * 1_000_000_000
                        + i64::from(t.nanosecond())
                })
            }),
        )
        .into_time()
        .into_series(),
    };
    Ok(series.into_column())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_bidirectional_lookup() {
        let schema = FieldSchema::OBSERVATIONS;
        assert_eq!(schema.canonical_name("tmed"), Some("temp_avg"));
        assert_eq!(schema.canonical_name("PRESMAX"), Some("press_max"));
        assert_eq!(schema.provider_id("hr_sun"), Some("sol"));
        assert_eq!(schema.canonical_name("nombre"), None);
        // Geocoded fields never claim a provider key.
        assert_eq!(FieldSchema::SITES.canonical_name("provincia"), Some("subregion_aemet"));
        assert_eq!(FieldSchema::SITES.provider_id("subregion_aemet"), Some("provincia"));
        assert_eq!(FieldSchema::SITES.provider_id("subregion"), None);
        assert_eq!(FieldSchema::SITES.provider_id("region"), None);
        assert_eq!(FieldSchema::SITES.canonical_name("Comunidad Autonoma"), None);
    }

    #[test]
    fn test_geocoded_provenance_has_no_provider_key() {
        let campos = vec![json!({"id": "provincia", "descripcion": "Provincia"})];
        let present: BTreeSet<&str> = ["subregion", "subregion_aemet"].into_iter().collect();
        let provenance = FieldSchema::SITES.attach_provenance(&present, &campos);

        let geocoded = provenance.iter().find(|p| p.name == "subregion").unwrap();
        assert_eq!(geocoded.origin, FieldOrigin::Geocoded);
        assert_eq!(geocoded.provider_id, None);
        assert!(geocoded.provider.is_none());

        let aemet = provenance.iter().find(|p| p.name == "subregion_aemet").unwrap();
        assert_eq!(aemet.provider_id.as_deref(), Some("provincia"));
        assert!(aemet.provider.is_some());
    }

    #[test]
    fn test_translate_site_record() {
        let raw = object(json!({
            "indicativo": "1111X",
            "nombre": "SANTANDER\n I,CMT",
            "latitud": "432829N",
            "longitud": "034800W",
            "altitud": "52",
            "provincia": "CANTABRIA",
            "indsinop": "08021",
            "extra": "dropped"
        }));
        let record = FieldSchema::SITES.translate(&raw).unwrap();
        assert_eq!(record.len(), SITE_FIELDS.len());
        assert_eq!(record["name"].as_str(), Some("SANTANDER I,CMT"));
        assert!((record["latitude"].as_f64().unwrap() - 43.4747).abs() < 1e-3);
        assert!(record["longitude"].as_f64().unwrap() < 0.0);
        assert_eq!(record["altitude"].as_f64(), Some(52.0));
        assert_eq!(record["subregion_aemet"].as_str(), Some("CANTABRIA"));
        assert!(record["region"].is_missing());
    }

    #[test]
    fn test_coerce_errors_propagate() {
        let raw = object(json!({"fecha": "2020-01-01", "tmed": "abc"}));
        assert!(matches!(
            FieldSchema::OBSERVATIONS.translate(&raw),
            Err(FormatError::InvalidNumber { .. })
        ));
        let raw = object(json!({"fecha": "01/01/2020"}));
        assert!(matches!(
            FieldSchema::OBSERVATIONS.translate(&raw),
            Err(FormatError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_invalid_hours_become_missing() {
        let raw = object(json!({"fecha": "2020-01-01", "horatmin": "25", "horatmax": "14:10"}));
        let record = FieldSchema::OBSERVATIONS.translate(&raw).unwrap();
        assert!(record["hr_temp_min"].is_missing());
        assert_eq!(record["hr_temp_max"].as_time(), NaiveTime::from_hms_opt(14, 10, 0));
    }

    #[test]
    fn test_attach_provenance() {
        let metadata = vec![
            json!({"id": "TMED", "descripcion": "Temperatura media diaria", "unidad": "grados celsius"}),
            json!({"id": "prec", "descripcion": "Precipitación diaria"}),
        ];
        let present: BTreeSet<&str> = ["date", "temp_avg"].into_iter().collect();
        let provenance = FieldSchema::OBSERVATIONS.attach_provenance(&present, &metadata);
        assert_eq!(provenance.len(), OBSERVATION_FIELDS.len());

        let temp = provenance.iter().find(|p| p.name == "temp_avg").unwrap();
        let described = temp.provider.as_ref().unwrap();
        assert_eq!(described["unidad"], json!("grados celsius"));
        assert!(!described.contains_key("id"));

        // Described by the provider but absent from the data.
        let prec = provenance.iter().find(|p| p.name == "precipitation").unwrap();
        assert!(prec.provider.is_none());
    }

    #[test]
    fn test_to_frame_dtypes() -> Result<(), Box<dyn std::error::Error>> {
        let raw = object(json!({"fecha": "2020-01-02", "indicativo": "1111X", "tmed": "7.5", "horatmax": "24"}));
        let record = FieldSchema::OBSERVATIONS.translate(&raw)?;
        let df = FieldSchema::OBSERVATIONS.to_frame(&[record])?;

        assert_eq!(df.width(), OBSERVATION_FIELDS.len());
        assert_eq!(df.column("date")?.dtype(), &DataType::Date);
        assert_eq!(df.column("hr_temp_max")?.dtype(), &DataType::Time);
        assert_eq!(df.column("temp_avg")?.f64()?.get(0), Some(7.5));
        assert_eq!(df.column("temp_min")?.null_count(), 1);
        let dates = df.column("date")?.cast(&DataType::String)?;
        assert_eq!(dates.str()?.get(0), Some("2020-01-02"));
        Ok(())
    }

    #[test]
    fn test_empty_frame_has_full_schema() -> Result<(), Box<dyn std::error::Error>> {
        let df = FieldSchema::SITES.empty_frame()?;
        assert_eq!(df.height(), 0);
        assert_eq!(df.get_column_names().len(), SITE_FIELDS.len());
        Ok(())
    }
}
