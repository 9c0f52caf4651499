use crate::error::AemetError;
use crate::metadata::Metadata;
use crate::remote::client::RemoteClient;
use crate::schema::FieldSchema;
use crate::sites::catalog::{Site, SiteCatalog};
use crate::sites::geocoder::{AdminRegion, ReverseGeocoder};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub const SITES_PATH: &str = "valores/climatologicos/inventarioestaciones/todasestaciones/";

/// Key of the field list inside AEMET's metadata document.
pub(crate) const FIELDS_KEY: &str = "campos";

type CoordinateKey = (u64, u64);

fn coordinate_key(site: &Site) -> CoordinateKey {
    (site.latitude.to_bits(), site.longitude.to_bits())
}

/// Builds and refreshes the [`SiteCatalog`] from the AEMET station inventory.
pub struct SiteCatalogService {
    client: RemoteClient,
    geocoder: Arc<dyn ReverseGeocoder>,
}

impl SiteCatalogService {
    pub fn new(client: RemoteClient, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        Self { client, geocoder }
    }

    /// Downloads the station inventory and returns the new catalog.
    ///
    /// When every provider field matches `previous` row for row, `previous` is
    /// returned with only its access date updated. Otherwise administrative
    /// regions are copied from `previous` for coordinates it already resolved,
    /// and each remaining distinct coordinate pair is geocoded once.
    ///
    /// # Errors
    ///
    /// * [`crate::remote::error::RemoteError::Authentication`] when AEMET rejects the key.
    /// * [`crate::normalize::error::FormatError`] for undecodable records.
    /// * Geocoding and transport failures.
    ///
    /// An empty or 404 answer is not an error; it yields an empty catalog
    /// carrying the provider's answer as metadata.
    pub async fn refresh(&self, previous: &SiteCatalog) -> Result<SiteCatalog, AemetError> {
        let payload = self.client.call(SITES_PATH).await?.reject_unauthorized()?;
        if !payload.is_ok() || payload.data.is_empty() {
            warn!("AEMET returned no site inventory: {}", payload.description());
            return Ok(SiteCatalog::empty(Metadata::accessed_now(payload.metadata)));
        }

        let (provider_fields, provider_metadata) = split_field_list(payload.metadata);
        let mut present = BTreeSet::new();
        let mut sites = Vec::with_capacity(payload.data.len());
        for raw in &payload.data {
            let renamed = FieldSchema::SITES.rename(raw);
            present.extend(renamed.keys().copied());
            let record = FieldSchema::SITES.coerce(renamed)?;
            sites.push(Site::from_record(&record)?);
        }

        let mut metadata = Metadata::accessed_now(provider_metadata);
        metadata.fields = FieldSchema::SITES.attach_provenance(&present, &provider_fields);

        if is_unchanged(&sites, previous) {
            info!(
                "Site inventory unchanged ({} sites), keeping resolved regions",
                previous.len()
            );
            let mut catalog = previous.clone();
            catalog.metadata.access_date = metadata.access_date;
            return Ok(catalog);
        }

        self.resolve_regions(&mut sites, previous).await?;
        let catalog = SiteCatalog::new(sites, metadata);
        info!("Refreshed site inventory: {} sites", catalog.len());
        Ok(catalog)
    }

    async fn resolve_regions(
        &self,
        sites: &mut [Site],
        previous: &SiteCatalog,
    ) -> Result<(), AemetError> {
        let mut known: HashMap<CoordinateKey, AdminRegion> = previous
            .sites()
            .iter()
            .filter(|s| s.admin_region() != AdminRegion::default())
            .map(|s| (coordinate_key(s), s.admin_region()))
            .collect();

        let mut lookups = 0usize;
        for site in sites.iter_mut() {
            let key = coordinate_key(site);
            let region = match known.get(&key) {
                Some(region) => region.clone(),
                None => {
                    debug!(
                        "Geocoding site {} at ({}, {})",
                        site.site, site.latitude, site.longitude
                    );
                    let region = self.geocoder.resolve(site.latitude, site.longitude).await?;
                    lookups += 1;
                    known.insert(key, region.clone());
                    region
                }
            };
            site.set_admin_region(region);
        }
        info!("Geocoded {} new coordinate pairs", lookups);
        Ok(())
    }
}

fn is_unchanged(sites: &[Site], previous: &SiteCatalog) -> bool {
    !previous.is_empty()
        && sites.len() == previous.len()
        && sites
            .iter()
            .zip(previous.sites())
            .all(|(new, old)| new.same_provider_fields(old))
}

/// Separates AEMET's `campos` list from the rest of its metadata document.
pub(crate) fn split_field_list(mut metadata: Map<String, Value>) -> (Vec<Value>, Map<String, Value>) {
    let fields = match metadata.remove(FIELDS_KEY) {
        Some(Value::Array(fields)) => fields,
        Some(other) => {
            metadata.insert(FIELDS_KEY.to_string(), other);
            Vec::new()
        }
        None => Vec::new(),
    };
    (fields, metadata)
}
