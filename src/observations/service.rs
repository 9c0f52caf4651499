use crate::error::AemetError;
use crate::metadata::Metadata;
use crate::normalize::date_chunks::split;
use crate::normalize::{decimal, sentinels};
use crate::observations::frame::{ObservationsFrame, SkippedWindow};
use crate::remote::client::{ApiStatus, RemoteClient};
use crate::schema::tables::REDUNDANT_OBSERVATION_FIELDS;
use crate::schema::{json_to_text, FieldKind, FieldSchema, RawRecord};
use crate::sites::catalog::{Site, SiteCatalog};
use crate::sites::proximity::NearSites;
use crate::sites::service::split_field_list;
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};

const API_DATE_FORMAT: &str = "%Y-%m-%dT00:00:00UTC";
/// Columns that are never numeric and skip sentinel and decimal rewriting.
const IDENTIFIER_FIELDS: [&str; 2] = ["date", "site"];

/// Which stations to request.
///
/// Whatever shape the caller has is resolved once into a comma-joined list of
/// codes; see the `From` impls.
///
/// ```
/// use aemet_clima::SiteSelection;
///
/// let one: SiteSelection = "1111X".into();
/// let many: SiteSelection = vec!["1111X", "1109"].into();
/// assert_eq!(one.to_param(), "1111X");
/// assert_eq!(many.to_param(), "1111X,1109");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteSelection {
    Single(String),
    List(Vec<String>),
    /// Codes taken from a catalog-like table; repeated codes are dropped.
    FromCatalog(Vec<String>),
}

impl SiteSelection {
    /// Individual codes, trimmed. Entries may themselves be comma-joined lists.
    pub fn codes(&self) -> Vec<String> {
        let split = |codes: &[String]| -> Vec<String> {
            codes
                .iter()
                .flat_map(|entry| entry.split(','))
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect()
        };
        match self {
            SiteSelection::Single(code) => split(std::slice::from_ref(code)),
            SiteSelection::List(codes) => split(codes.as_slice()),
            SiteSelection::FromCatalog(codes) => {
                let mut seen = HashSet::new();
                split(codes.as_slice())
                    .into_iter()
                    .filter(|code| seen.insert(code.clone()))
                    .collect()
            }
        }
    }

    /// The `estacion` path segment: codes joined with commas.
    pub fn to_param(&self) -> String {
        self.codes().join(",")
    }

    pub fn is_empty(&self) -> bool {
        self.codes().is_empty()
    }
}

impl From<&str> for SiteSelection {
    fn from(code: &str) -> Self {
        SiteSelection::Single(code.to_string())
    }
}

impl From<String> for SiteSelection {
    fn from(code: String) -> Self {
        SiteSelection::Single(code)
    }
}

impl From<Vec<String>> for SiteSelection {
    fn from(codes: Vec<String>) -> Self {
        SiteSelection::List(codes)
    }
}

impl From<Vec<&str>> for SiteSelection {
    fn from(codes: Vec<&str>) -> Self {
        SiteSelection::List(codes.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for SiteSelection {
    fn from(codes: &[&str]) -> Self {
        SiteSelection::List(codes.iter().map(|c| c.to_string()).collect())
    }
}

impl From<&[Site]> for SiteSelection {
    fn from(sites: &[Site]) -> Self {
        SiteSelection::FromCatalog(sites.iter().map(|s| s.site.clone()).collect())
    }
}

impl From<&SiteCatalog> for SiteSelection {
    fn from(catalog: &SiteCatalog) -> Self {
        SiteSelection::FromCatalog(catalog.codes())
    }
}

impl From<&NearSites> for SiteSelection {
    fn from(near: &NearSites) -> Self {
        SiteSelection::FromCatalog(near.codes())
    }
}

pub fn observations_path(start: NaiveDate, end: NaiveDate, stations: &str) -> String {
    format!(
        "valores/climatologicos/diarios/datos/fechaini/{}/fechafin/{}/estacion/{}",
        start.format(API_DATE_FORMAT),
        end.format(API_DATE_FORMAT),
        stations
    )
}

/// Pages the daily climatology endpoint and normalizes the records.
pub struct ObservationService {
    client: RemoteClient,
}

impl ObservationService {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    /// Daily observations for `selection` over `[start, end]`, inclusive.
    ///
    /// The range is requested in windows of `max_span_years`; pages are
    /// concatenated in window order and their metadata merged, later windows
    /// overwriting earlier keys.
    ///
    /// # Errors
    ///
    /// * [`AemetError::InvalidRange`] if `end < start`.
    /// * [`crate::remote::error::RemoteError::Authentication`] if AEMET rejects the key.
    /// * [`crate::remote::error::RemoteError::Provider`] if a window's envelope
    ///   carries any other error status.
    /// * [`crate::normalize::error::FormatError`] for unparseable values.
    ///
    /// Windows without data (404, empty or malformed answer) contribute no rows
    /// and are listed in [`ObservationsFrame::skipped_windows`].
    pub async fn fetch(
        &self,
        selection: &SiteSelection,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ObservationsFrame, AemetError> {
        if end < start {
            return Err(AemetError::InvalidRange { start, end });
        }
        let stations = selection.to_param();
        if stations.is_empty() {
            debug!("Empty site selection, skipping request");
            return Ok(ObservationsFrame::empty()?);
        }

        let chunks = split(start, end, self.client.config().max_span_years)?;
        let mut records = Vec::new();
        let mut metadata = Metadata::default();
        let mut present = BTreeSet::new();
        let mut provider_fields = Vec::new();
        let mut skipped = Vec::new();

        for chunk in &chunks {
            let path = observations_path(chunk.start, chunk.end, &stations);
            let payload = self.client.call(&path).await?;
            let status = payload.status;
            let payload = match status {
                ApiStatus::NotFound | ApiStatus::Empty | ApiStatus::Malformed => {
                    warn!(
                        "No observations for {} between {} and {}: {}",
                        stations,
                        chunk.start,
                        chunk.end,
                        payload.description()
                    );
                    skipped.push(SkippedWindow {
                        window: *chunk,
                        status,
                        description: payload.description(),
                    });
                    continue;
                }
                _ => payload.error_for_status()?,
            };
            debug!(
                "Window {}..{} returned {} records",
                chunk.start,
                chunk.end,
                payload.data.len()
            );

            let (fields, provider) = split_field_list(payload.metadata);
            if !fields.is_empty() {
                provider_fields = fields;
            }
            for raw in &payload.data {
                let renamed = normalize_record(raw);
                present.extend(renamed.keys().copied());
                records.push(FieldSchema::OBSERVATIONS.coerce(renamed)?);
            }
            metadata.merge(Metadata {
                provider,
                ..Metadata::default()
            });
        }

        metadata.access_date = Some(Utc::now());
        metadata.fields = FieldSchema::OBSERVATIONS.attach_provenance(&present, &provider_fields);
        info!(
            "Fetched {} observations for {} in {} windows",
            records.len(),
            stations,
            chunks.len()
        );
        let frame = FieldSchema::OBSERVATIONS.to_frame(&records)?;
        Ok(ObservationsFrame::new(frame, metadata).with_skipped_windows(skipped))
    }
}

/// Renames one provider record and rewrites its markers and decimal commas.
fn normalize_record(raw: &Map<String, Value>) -> RawRecord {
    let mut renamed = RawRecord::new();
    for (key, value) in raw {
        if REDUNDANT_OBSERVATION_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let Some(name) = FieldSchema::OBSERVATIONS.canonical_name(key) else {
            continue;
        };
        let text = json_to_text(value);
        let cleaned = if IDENTIFIER_FIELDS.contains(&name) {
            text
        } else {
            let is_hour = FieldSchema::OBSERVATIONS
                .field(name)
                .is_some_and(|spec| spec.kind == FieldKind::Hour);
            let replace = if is_hour {
                sentinels::replace_hour
            } else {
                sentinels::replace
            };
            text.as_deref()
                .and_then(replace)
                .map(|v| decimal::normalize_str(v).into_owned())
        };
        renamed.insert(name, cleaned);
    }
    renamed
}
