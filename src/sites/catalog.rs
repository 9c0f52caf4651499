use crate::metadata::Metadata;
use crate::normalize::error::FormatError;
use crate::schema::{FieldSchema, FieldValue, Record};
use crate::sites::error::CatalogError;
use crate::sites::geocoder::AdminRegion;
use crate::types::LatLon;
use bon::Builder;
use log::info;
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tokio::task;

pub const CATALOG_DATA_FILE: &str = "data.csv";
pub const CATALOG_METADATA_FILE: &str = "metadata.json";

/// One AEMET climatological station.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// AEMET station code (`indicativo`), e.g. `"1111X"`.
    pub site: String,
    pub name: Option<String>,
    pub synoptic_indicator: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub subregion: Option<String>,
    pub region: Option<String>,
    /// Province as reported by AEMET.
    pub subregion_aemet: Option<String>,
}

impl Site {
    pub fn location(&self) -> LatLon {
        LatLon(self.latitude, self.longitude)
    }

    /// Builds a site from a record translated with [`FieldSchema::SITES`].
    ///
    /// # Errors
    ///
    /// [`FormatError::MissingField`] if the code or a coordinate is missing.
    pub fn from_record(record: &Record) -> Result<Self, FormatError> {
        let text = |name: &str| record.get(name).and_then(FieldValue::as_str).map(str::to_string);
        let float = |name: &str| record.get(name).and_then(FieldValue::as_f64);
        let required = |name: &str| FormatError::MissingField(name.to_string());

        Ok(Self {
            site: text("site").ok_or_else(|| required("site"))?,
            name: text("name"),
            synoptic_indicator: text("synoptic_indicator"),
            latitude: float("latitude").ok_or_else(|| required("latitude"))?,
            longitude: float("longitude").ok_or_else(|| required("longitude"))?,
            altitude: float("altitude"),
            district: text("district"),
            city: text("city"),
            subregion: text("subregion"),
            region: text("region"),
            subregion_aemet: text("subregion_aemet"),
        })
    }

    pub fn to_record(&self) -> Record {
        let text = |v: &Option<String>| v.clone().map_or(FieldValue::Missing, FieldValue::Text);
        Record::from([
            ("site", FieldValue::Text(self.site.clone())),
            ("name", text(&self.name)),
            ("synoptic_indicator", text(&self.synoptic_indicator)),
            ("latitude", FieldValue::Float(self.latitude)),
            ("longitude", FieldValue::Float(self.longitude)),
            ("altitude", self.altitude.map_or(FieldValue::Missing, FieldValue::Float)),
            ("district", text(&self.district)),
            ("city", text(&self.city)),
            ("subregion", text(&self.subregion)),
            ("region", text(&self.region)),
            ("subregion_aemet", text(&self.subregion_aemet)),
        ])
    }

    pub fn admin_region(&self) -> AdminRegion {
        AdminRegion {
            district: self.district.clone(),
            city: self.city.clone(),
            subregion: self.subregion.clone(),
            region: self.region.clone(),
        }
    }

    pub fn set_admin_region(&mut self, region: AdminRegion) {
        self.district = region.district;
        self.city = region.city;
        self.subregion = region.subregion;
        self.region = region.region;
    }

    /// True when every field AEMET itself sends is equal.
    pub fn same_provider_fields(&self, other: &Site) -> bool {
        self.site == other.site
            && self.name == other.name
            && self.synoptic_indicator == other.synoptic_indicator
            && self.latitude == other.latitude
            && self.longitude == other.longitude
            && self.altitude == other.altitude
            && self.subregion_aemet == other.subregion_aemet
    }
}

/// Exact-match filter over the text columns of a catalog.
///
/// Empty lists don't filter. A site must match every non-empty list. The
/// numeric columns (coordinates, altitude) are searched with
/// [`crate::sites::proximity::nearest`] instead.
///
/// ```
/// use aemet_clima::SiteFilter;
///
/// let filter = SiteFilter::builder()
///     .subregions(vec!["Cantabria".to_string()])
///     .build();
/// assert!(filter.cities.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct SiteFilter {
    #[builder(default)]
    pub sites: Vec<String>,
    #[builder(default)]
    pub names: Vec<String>,
    #[builder(default)]
    pub synoptic_indicators: Vec<String>,
    #[builder(default)]
    pub districts: Vec<String>,
    #[builder(default)]
    pub cities: Vec<String>,
    #[builder(default)]
    pub subregions: Vec<String>,
    #[builder(default)]
    pub regions: Vec<String>,
    /// Provinces as reported by AEMET, e.g. `"CANTABRIA"`.
    #[builder(default)]
    pub subregions_aemet: Vec<String>,
}

impl SiteFilter {
    pub fn matches(&self, site: &Site) -> bool {
        fn accepts(allowed: &[String], value: Option<&str>) -> bool {
            allowed.is_empty() || value.is_some_and(|v| allowed.iter().any(|a| a == v))
        }
        accepts(&self.sites, Some(site.site.as_str()))
            && accepts(&self.names, site.name.as_deref())
            && accepts(&self.synoptic_indicators, site.synoptic_indicator.as_deref())
            && accepts(&self.districts, site.district.as_deref())
            && accepts(&self.cities, site.city.as_deref())
            && accepts(&self.subregions, site.subregion.as_deref())
            && accepts(&self.regions, site.region.as_deref())
            && accepts(&self.subregions_aemet, site.subregion_aemet.as_deref())
    }
}

/// The AEMET station inventory plus its metadata.
///
/// Site codes are unique: construction keeps the first occurrence of a code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteCatalog {
    sites: Vec<Site>,
    pub metadata: Metadata,
}

impl SiteCatalog {
    pub fn new(sites: Vec<Site>, metadata: Metadata) -> Self {
        let mut seen = HashSet::with_capacity(sites.len());
        let sites = sites
            .into_iter()
            .filter(|s| seen.insert(s.site.clone()))
            .collect();
        Self { sites, metadata }
    }

    pub fn empty(metadata: Metadata) -> Self {
        Self {
            sites: Vec::new(),
            metadata,
        }
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn into_sites(self) -> Vec<Site> {
        self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.site == code)
    }

    pub fn codes(&self) -> Vec<String> {
        self.sites.iter().map(|s| s.site.clone()).collect()
    }

    /// Sites matching `filter`, with the same metadata.
    pub fn filter_in(&self, filter: &SiteFilter) -> SiteCatalog {
        SiteCatalog {
            sites: self
                .sites
                .iter()
                .filter(|s| filter.matches(s))
                .cloned()
                .collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// The catalog as a DataFrame with the canonical site columns.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let records: Vec<Record> = self.sites.iter().map(Site::to_record).collect();
        FieldSchema::SITES.to_frame(&records)
    }

    /// Writes `data.csv` and `metadata.json` into `folder`, creating it if needed.
    pub async fn save(&self, folder: &Path) -> Result<(), CatalogError> {
        tokio::fs::create_dir_all(folder)
            .await
            .map_err(|e| CatalogError::CatalogWrite(folder.to_path_buf(), e))?;

        let data_path = folder.join(CATALOG_DATA_FILE);
        let mut df = self
            .to_frame()
            .map_err(|e| CatalogError::CsvWrite(data_path.clone(), e))?;
        let csv_path = data_path.clone();
        task::spawn_blocking(move || {
            let file = std::fs::File::create(&csv_path)
                .map_err(|e| CatalogError::CatalogWrite(csv_path.clone(), e))?;
            CsvWriter::new(file)
                .include_header(true)
                .finish(&mut df)
                .map_err(|e| CatalogError::CsvWrite(csv_path, e))
        })
        .await??;

        let metadata_path = folder.join(CATALOG_METADATA_FILE);
        let json =
            serde_json::to_vec_pretty(&self.metadata).map_err(CatalogError::MetadataEncode)?;
        tokio::fs::write(&metadata_path, json)
            .await
            .map_err(|e| CatalogError::CatalogWrite(metadata_path.clone(), e))?;

        info!("Saved {} sites to {}", self.len(), folder.display());
        Ok(())
    }

    /// Reads a catalog written by [`SiteCatalog::save`].
    pub async fn open_from(data_path: &Path, metadata_path: &Path) -> Result<Self, CatalogError> {
        let metadata_bytes = tokio::fs::read(metadata_path)
            .await
            .map_err(|e| CatalogError::CatalogRead(metadata_path.to_path_buf(), e))?;
        let metadata: Metadata = serde_json::from_slice(&metadata_bytes)
            .map_err(|e| CatalogError::MetadataDecode(metadata_path.to_path_buf(), e))?;

        let path = data_path.to_path_buf();
        let sites = task::spawn_blocking(move || {
            // Everything as text; floats are parsed per column below.
            let df = CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .try_into_reader_with_file_path(Some(path.clone()))
                .map_err(|e| CatalogError::CsvRead(path.clone(), e))?
                .finish()
                .map_err(|e| CatalogError::CsvRead(path.clone(), e))?;
            sites_from_frame(&df, &path)
        })
        .await??;

        Ok(Self::new(sites, metadata))
    }

    /// Opens `data.csv` + `metadata.json` from `folder`.
    pub async fn open_folder(folder: &Path) -> Result<Self, CatalogError> {
        Self::open_from(
            &folder.join(CATALOG_DATA_FILE),
            &folder.join(CATALOG_METADATA_FILE),
        )
        .await
    }
}

fn sites_from_frame(df: &DataFrame, path: &Path) -> Result<Vec<Site>, CatalogError> {
    let height = df.height();
    let text = |name: &str| -> Result<Vec<Option<String>>, CatalogError> {
        let Ok(column) = df.column(name) else {
            return Ok(vec![None; height]);
        };
        let values = column
            .str()
            .map_err(|e| CatalogError::CsvRead(path.to_path_buf(), e))?;
        Ok(values
            .into_iter()
            .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
            .collect())
    };
    let float = |name: &str| -> Result<Vec<Option<f64>>, CatalogError> {
        text(name)?
            .into_iter()
            .map(|v| {
                v.map(|s| {
                    s.parse::<f64>().map_err(|_| CatalogError::InvalidValue {
                        column: name.to_string(),
                        value: s,
                    })
                })
                .transpose()
            })
            .collect()
    };
    let missing = |column: &str| CatalogError::InvalidValue {
        column: column.to_string(),
        value: String::new(),
    };

    let codes = text("site")?;
    let names = text("name")?;
    let synoptic = text("synoptic_indicator")?;
    let latitudes = float("latitude")?;
    let longitudes = float("longitude")?;
    let altitudes = float("altitude")?;
    let districts = text("district")?;
    let cities = text("city")?;
    let subregions = text("subregion")?;
    let regions = text("region")?;
    let subregions_aemet = text("subregion_aemet")?;

    (0..height)
        .map(|i| {
            Ok(Site {
                site: codes[i].clone().ok_or_else(|| missing("site"))?,
                name: names[i].clone(),
                synoptic_indicator: synoptic[i].clone(),
                latitude: latitudes[i].ok_or_else(|| missing("latitude"))?,
                longitude: longitudes[i].ok_or_else(|| missing("longitude"))?,
                altitude: altitudes[i],
                district: districts[i].clone(),
                city: cities[i].clone(),
                subregion: subregions[i].clone(),
                region: regions[i].clone(),
                subregion_aemet: subregions_aemet[i].clone(),
            })
        })
        .collect()
}
