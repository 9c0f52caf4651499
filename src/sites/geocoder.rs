//! Reverse geocoding of station coordinates into administrative regions.

use crate::error::AemetError;
use crate::remote::error::RemoteError;
use crate::remote::transport::HttpTransport;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const ARCGIS_REVERSE_GEOCODE_URL: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/reverseGeocode";

/// Administrative units a coordinate falls in. Any of them may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRegion {
    pub district: Option<String>,
    pub city: Option<String>,
    pub subregion: Option<String>,
    pub region: Option<String>,
}

/// Single-point coordinate lookup used to enrich the site catalog.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<AdminRegion, AemetError>;
}

/// [`ReverseGeocoder`] over the public ArcGIS World geocoding service.
pub struct ArcGisGeocoder {
    transport: Arc<dyn HttpTransport>,
    url: String,
}

impl ArcGisGeocoder {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_url(transport, ARCGIS_REVERSE_GEOCODE_URL)
    }

    pub fn with_url(transport: Arc<dyn HttpTransport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for ArcGisGeocoder {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<AdminRegion, AemetError> {
        let location = format!("{},{}", longitude, latitude);
        let params = [("location", location.as_str()), ("f", "json")];
        let response = self
            .transport
            .get(&self.url, &[("Accept", "application/json")], &params)
            .await?;
        if response.status != 200 {
            return Err(RemoteError::HttpStatus {
                url: self.url.clone(),
                status: response.status,
            }
            .into());
        }

        let body: Value =
            serde_json::from_str(&response.body).map_err(|source| RemoteError::JsonParse {
                url: self.url.clone(),
                source,
            })?;
        Ok(parse_address(&body, latitude, longitude))
    }
}

/// Reads the address block of an ArcGIS answer. "No address found" is an
/// empty region, not an error.
fn parse_address(body: &Value, latitude: f64, longitude: f64) -> AdminRegion {
    let Some(address) = body.get("address").and_then(Value::as_object) else {
        debug!(
            "No address for ({}, {}): {}",
            latitude,
            longitude,
            body.get("error").unwrap_or(&Value::Null)
        );
        return AdminRegion::default();
    };
    let field = |key: &str| {
        address
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    AdminRegion {
        district: field("District"),
        city: field("City"),
        subregion: field("Subregion"),
        region: field("Region"),
    }
}
