mod aemet_clima;
mod config;
mod error;
mod metadata;
pub mod normalize;
pub mod observations;
pub mod remote;
pub mod schema;
pub mod sites;
mod types;
mod utils;

#[cfg(test)]
mod test_support;

pub use aemet_clima::*;
pub use config::{ClientConfig, API_KEY_ENV, DEFAULT_BASE_URL};
pub use error::AemetError;
pub use metadata::Metadata;
pub use types::LatLon;

pub use observations::completeness::{ColumnCoverage, ColumnSelection, CompletenessReport};
pub use observations::frame::{ObservationsFrame, SkippedWindow};
pub use observations::service::{ObservationService, SiteSelection};

pub use remote::client::{ApiPayload, ApiStatus, RemoteClient};
pub use remote::error::RemoteError;
pub use remote::transport::{HttpResponse, HttpTransport, ReqwestTransport};

pub use schema::{FieldKind, FieldOrigin, FieldProvenance, FieldSchema, FieldValue};

pub use normalize::error::FormatError;
pub use sites::catalog::{Site, SiteCatalog, SiteFilter};
pub use sites::error::CatalogError;
pub use sites::geocoder::{AdminRegion, ArcGisGeocoder, ReverseGeocoder};
pub use sites::proximity::{NearSite, NearSites};
pub use sites::service::SiteCatalogService;
