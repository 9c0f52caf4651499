//! This module provides the main entry point of the crate, [`AemetClima`].
//! It keeps the AEMET site catalog cached on disk and exposes station search,
//! daily climatology retrieval and data-completeness checks on top of it.

use crate::config::ClientConfig;
use crate::error::AemetError;
use crate::observations::completeness::{self, ColumnSelection, CompletenessReport};
use crate::observations::frame::ObservationsFrame;
use crate::observations::service::{ObservationService, SiteSelection};
use crate::remote::client::RemoteClient;
use crate::remote::transport::HttpTransport;
use crate::sites::catalog::{SiteCatalog, SiteFilter, CATALOG_DATA_FILE, CATALOG_METADATA_FILE};
use crate::sites::geocoder::{ArcGisGeocoder, ReverseGeocoder};
use crate::sites::proximity::{nearest, NearSites, DEFAULT_MAX_DISTANCE_KM, DEFAULT_N_NEAR};
use crate::sites::service::SiteCatalogService;
use crate::types::LatLon;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use chrono::{Local, NaiveDate};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Minimum share of days with data for a site to pass [`AemetClima::sites_curation`].
pub const DEFAULT_MIN_COVERAGE: f64 = 0.8;

/// Completeness verdict for one station of a curation scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteCuration {
    pub site: String,
    pub report: CompletenessReport,
    /// Where the observations were written, if they were.
    pub saved_to: Option<PathBuf>,
}

/// Result of [`AemetClima::sites_curation`], one entry per requested site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurationReport {
    pub sites: Vec<SiteCuration>,
}

impl CurationReport {
    /// Codes of the sites whose data passed the threshold, in request order.
    pub fn sufficient_sites(&self) -> Vec<&str> {
        self.sites
            .iter()
            .filter(|s| s.report.is_sufficient)
            .map(|s| s.site.as_str())
            .collect()
    }

    pub fn get(&self, site: &str) -> Option<&SiteCuration> {
        self.sites.iter().find(|s| s.site == site)
    }
}

/// The main client struct for AEMET climatological data.
///
/// Holds the site catalog in memory and, when built with a cache folder,
/// mirrors it to `data.csv` + `metadata.json` there so later sessions start
/// without downloading and geocoding the inventory again.
///
/// Mutating methods take `&mut self`; wrap the client in a mutex to share it
/// between tasks.
///
/// # Examples
///
/// ```rust
/// # use aemet_clima::{AemetClima, AemetError};
/// # async fn run() -> Result<(), AemetError> {
/// // Create a client using the default cache directory
/// let mut client = AemetClima::new("my-api-key").await?;
/// let catalog = client.sites_info(false).await?;
/// println!("{} sites known", catalog.len());
/// # Ok(())
/// # }
/// ```
pub struct AemetClima {
    client: RemoteClient,
    sites_service: SiteCatalogService,
    observations: ObservationService,
    catalog: SiteCatalog,
    cache_folder: Option<PathBuf>,
}

#[bon]
impl AemetClima {
    /// Creates a client with default settings and the default cache directory.
    ///
    /// The default cache directory is resolved with the `dirs` crate, typically
    /// `~/.cache/aemet_clima_cache` on Linux.
    ///
    /// # Errors
    ///
    /// * [`AemetError::CacheDirResolution`] if there is no cache directory.
    /// * Any error of [`AemetClima::with_cache_folder`].
    pub async fn new(api_key: impl Into<String>) -> Result<Self, AemetError> {
        let cache_folder = get_cache_dir()?;
        Self::with_cache_folder(ClientConfig::new(api_key), cache_folder).await
    }

    /// Creates a client backed by `reqwest` and ArcGIS, caching the catalog in
    /// `cache_folder`.
    ///
    /// A catalog previously saved in the folder is loaded as the starting point.
    ///
    /// # Arguments
    ///
    /// * `config` - Remote settings, see [`ClientConfig`].
    /// * `cache_folder` - Directory for `data.csv` and `metadata.json`. Created if missing.
    ///
    /// # Errors
    ///
    /// * [`AemetError::CacheDirCreation`] if the folder cannot be created.
    /// * [`crate::remote::error::RemoteError::ClientBuild`] if the HTTP client fails to build.
    /// * [`crate::sites::error::CatalogError`] if a saved catalog exists but cannot be read.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use aemet_clima::{AemetClima, AemetError, ClientConfig};
    /// # use std::path::PathBuf;
    /// # async fn run() -> Result<(), AemetError> {
    /// let config = ClientConfig::from_env()?;
    /// let client = AemetClima::with_cache_folder(config, PathBuf::from("/tmp/aemet")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_cache_folder(
        config: ClientConfig,
        cache_folder: PathBuf,
    ) -> Result<Self, AemetError> {
        ensure_cache_dir_exists(&cache_folder)
            .await
            .map_err(|e| AemetError::CacheDirCreation(cache_folder.clone(), e))?;
        let client = RemoteClient::new(config)?;
        let geocoder = Arc::new(ArcGisGeocoder::new(client.transport()));
        let catalog = load_cached_catalog(&cache_folder).await?;
        Ok(Self::from_client(client, geocoder, catalog).persist_to(cache_folder))
    }

    /// Assembles a client from explicit collaborators, without any cache folder.
    ///
    /// `seed` is the starting catalog; pass `SiteCatalog::default()` to download
    /// the inventory on first use.
    pub fn from_parts(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        geocoder: Arc<dyn ReverseGeocoder>,
        seed: SiteCatalog,
    ) -> Self {
        Self::from_client(RemoteClient::with_transport(config, transport), geocoder, seed)
    }

    /// Mirrors the catalog to `folder` after every refresh.
    pub fn persist_to(mut self, folder: PathBuf) -> Self {
        self.cache_folder = Some(folder);
        self
    }

    fn from_client(
        client: RemoteClient,
        geocoder: Arc<dyn ReverseGeocoder>,
        catalog: SiteCatalog,
    ) -> Self {
        Self {
            sites_service: SiteCatalogService::new(client.clone(), geocoder),
            observations: ObservationService::new(client.clone()),
            client,
            catalog,
            cache_folder: None,
        }
    }

    /// The catalog currently held, without touching the network.
    pub fn catalog(&self) -> &SiteCatalog {
        &self.catalog
    }

    /// Token that aborts a pending rate-limit back-off when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.client.cancellation_token()
    }

    /// Installs a fresh cancellation token after an abort, so new requests
    /// can run again. Returns the new token.
    pub fn reset_cancellation(&self) -> CancellationToken {
        self.client.reset_cancellation()
    }

    /// Returns the site catalog, refreshing it first when `update` is set or
    /// nothing is cached yet.
    ///
    /// # Errors
    ///
    /// Any error of [`AemetClima::refresh_catalog`].
    pub async fn sites_info(&mut self, update: bool) -> Result<&SiteCatalog, AemetError> {
        if update || self.catalog.is_empty() {
            self.refresh_catalog().await?;
        }
        Ok(&self.catalog)
    }

    /// Downloads the inventory, resolves new coordinates and replaces the
    /// cached catalog. A non-empty result is saved to the cache folder.
    ///
    /// # Errors
    ///
    /// * [`crate::remote::error::RemoteError::Authentication`] if the key is rejected.
    /// * Transport, geocoding and decoding errors.
    /// * [`crate::sites::error::CatalogError`] if saving to the cache folder fails.
    pub async fn refresh_catalog(&mut self) -> Result<(), AemetError> {
        let catalog = self.sites_service.refresh(&self.catalog).await?;
        self.catalog = catalog;
        if let Some(folder) = &self.cache_folder {
            if self.catalog.is_empty() {
                debug!("Not caching an empty catalog");
            } else {
                self.catalog.save(folder).await?;
            }
        }
        Ok(())
    }

    /// Sites matching every non-empty list of `filter`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use aemet_clima::{AemetClima, AemetError, SiteFilter};
    /// # async fn run(client: &mut AemetClima) -> Result<(), AemetError> {
    /// let filter = SiteFilter::builder()
    ///     .subregions(vec!["Cantabria".to_string()])
    ///     .build();
    /// let cantabria = client.sites_in(&filter, false).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn sites_in(
        &mut self,
        filter: &SiteFilter,
        update_first: bool,
    ) -> Result<SiteCatalog, AemetError> {
        Ok(self.sites_info(update_first).await?.filter_in(filter))
    }

    /// Finds the sites closest to a coordinate, closest first.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.latitude(f64)`, `.longitude(f64)`: **Required.** Reference point in decimal degrees.
    /// * `.n_near(usize)`: Optional. Maximum number of sites. Defaults to `100`.
    /// * `.max_distance_km(f64)`: Optional. Search radius. Defaults to `6237.0`.
    /// * `.update_first(bool)`: Optional. Refresh the catalog before searching. Defaults to `false`.
    ///
    /// # Returns
    ///
    /// [`NearSites`] carrying each site's distance and the reference point.
    ///
    /// # Errors
    ///
    /// Catalog refresh errors, when a refresh happens.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use aemet_clima::{AemetClima, AemetError};
    /// # async fn run(client: &mut AemetClima) -> Result<(), AemetError> {
    /// let near = client
    ///     .near_sites()
    ///     .latitude(43.47)
    ///     .longitude(-3.80)
    ///     .n_near(5)
    ///     .max_distance_km(50.0)
    ///     .call()
    ///     .await?;
    /// println!("closest: {:?}", near.closest().map(|s| &s.site.site));
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn near_sites(
        &mut self,
        latitude: f64,
        longitude: f64,
        n_near: Option<usize>,
        max_distance_km: Option<f64>,
        #[builder(default)] update_first: bool,
    ) -> Result<NearSites, AemetError> {
        let catalog = self.sites_info(update_first).await?;
        Ok(nearest(
            catalog,
            LatLon(latitude, longitude),
            n_near.unwrap_or(DEFAULT_N_NEAR),
            max_distance_km.unwrap_or(DEFAULT_MAX_DISTANCE_KM),
        ))
    }

    /// Daily climatology for one or more sites over `[start, end]`.
    ///
    /// Long periods are split into windows of `max_span_years` and fetched one
    /// after the other.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.sites(impl Into<SiteSelection>)`: **Required.** A code, a list of codes,
    ///   a [`SiteCatalog`] or a [`NearSites`].
    /// * `.start(NaiveDate)`: **Required.** First day, inclusive.
    /// * `.end(NaiveDate)`: Optional. Last day, inclusive. Defaults to today.
    ///
    /// # Errors
    ///
    /// See [`ObservationService::fetch`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use aemet_clima::{AemetClima, AemetError};
    /// # use chrono::NaiveDate;
    /// # async fn run(client: &AemetClima) -> Result<(), AemetError> {
    /// let observations = client
    ///     .daily_clima()
    ///     .sites("1111X")
    ///     .start(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
    ///     .end(NaiveDate::from_ymd_opt(2020, 2, 1).unwrap())
    ///     .call()
    ///     .await?;
    /// println!("{}", observations.frame);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn daily_clima(
        &self,
        #[builder(into)] sites: SiteSelection,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<ObservationsFrame, AemetError> {
        let end = end.unwrap_or_else(today);
        self.observations.fetch(&sites, start, end).await
    }

    /// Coverage of `observations` over `[start, end]`, see [`completeness::evaluate`].
    pub fn evaluate_completeness(
        &self,
        observations: &ObservationsFrame,
        start: NaiveDate,
        end: NaiveDate,
        threshold: f64,
        columns: &ColumnSelection,
    ) -> Result<CompletenessReport, AemetError> {
        completeness::evaluate(&observations.frame, start, end, threshold, columns)
    }

    /// Fetches observations for several sites and keeps those with enough data.
    ///
    /// Every site is evaluated on its own rows. With `.save_folder(..)`, each
    /// sufficient site's observations are written to `{folder}/{site}.csv`.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.sites(impl Into<SiteSelection>)`: **Required.** Candidate sites.
    /// * `.start(NaiveDate)`: **Required.** First day of the study period.
    /// * `.end(NaiveDate)`: Optional. Defaults to today.
    /// * `.threshold(f64)`: Optional. Minimum coverage per column. Defaults to `0.8`.
    /// * `.columns(impl Into<ColumnSelection>)`: Optional. Defaults to every column with data.
    /// * `.save_folder(PathBuf)`: Optional. Where to write sufficient sites.
    ///
    /// # Errors
    ///
    /// Retrieval errors, and [`AemetError::FileWrite`] or [`AemetError::CsvExport`]
    /// when saving fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use aemet_clima::{AemetClima, AemetError};
    /// # use chrono::NaiveDate;
    /// # use std::path::PathBuf;
    /// # async fn run(client: &mut AemetClima) -> Result<(), AemetError> {
    /// let candidates = client.near_sites().latitude(43.47).longitude(-3.80).n_near(3).call().await?;
    /// let report = client
    ///     .sites_curation()
    ///     .sites(&candidates)
    ///     .start(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap())
    ///     .end(NaiveDate::from_ymd_opt(2019, 12, 31).unwrap())
    ///     .columns(vec!["temp_avg", "precipitation"])
    ///     .save_folder(PathBuf::from("curated"))
    ///     .call()
    ///     .await?;
    /// println!("usable sites: {:?}", report.sufficient_sites());
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn sites_curation(
        &self,
        #[builder(into)] sites: SiteSelection,
        start: NaiveDate,
        end: Option<NaiveDate>,
        threshold: Option<f64>,
        #[builder(into, default)] columns: ColumnSelection,
        save_folder: Option<PathBuf>,
    ) -> Result<CurationReport, AemetError> {
        let end = end.unwrap_or_else(today);
        let threshold = threshold.unwrap_or(DEFAULT_MIN_COVERAGE);
        let observations = self.observations.fetch(&sites, start, end).await?;

        if let Some(folder) = &save_folder {
            tokio::fs::create_dir_all(folder)
                .await
                .map_err(|e| AemetError::FileWrite(folder.clone(), e))?;
        }

        let mut report = CurationReport::default();
        for code in sites.codes() {
            let rows = observations.for_site(&code)?;
            let verdict = completeness::evaluate(&rows.frame, start, end, threshold, &columns)?;
            let saved_to = match &save_folder {
                Some(folder) if verdict.is_sufficient => {
                    let path = folder.join(format!("{}.csv", code));
                    rows.save_csv(&path).await?;
                    Some(path)
                }
                _ => None,
            };
            debug!(
                "Site {}: sufficient={} mean coverage {:.3}",
                code, verdict.is_sufficient, verdict.mean_coverage
            );
            report.sites.push(SiteCuration {
                site: code,
                report: verdict,
                saved_to,
            });
        }
        info!(
            "Curation kept {} of {} sites",
            report.sufficient_sites().len(),
            report.sites.len()
        );
        Ok(report)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The catalog saved in `folder`, or an empty one if nothing was saved there.
async fn load_cached_catalog(folder: &Path) -> Result<SiteCatalog, AemetError> {
    let data = folder.join(CATALOG_DATA_FILE);
    let metadata = folder.join(CATALOG_METADATA_FILE);
    let cached = tokio::fs::try_exists(&data).await.unwrap_or(false)
        && tokio::fs::try_exists(&metadata).await.unwrap_or(false);
    if !cached {
        info!("No cached catalog in {}", folder.display());
        return Ok(SiteCatalog::default());
    }
    let catalog = SiteCatalog::open_from(&data, &metadata).await?;
    info!("Loaded {} cached sites from {}", catalog.len(), folder.display());
    Ok(catalog)
}
