//! Nearest-site search over a [`SiteCatalog`].

use crate::metadata::Metadata;
use crate::sites::catalog::{Site, SiteCatalog};
use crate::types::LatLon;
use ordered_float::OrderedFloat;
use polars::prelude::*;

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const DEFAULT_N_NEAR: usize = 100;
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 6237.0;

/// Great-circle distance in kilometres on a spherical earth.
///
/// Uses `R·acos(cos(Δφ) − cos φ1·cos φ2·(1 − cos Δλ))`. This is the
/// spherical law of cosines rewritten, not haversine; values differ from
/// haversine only by floating-point rounding. The `acos` argument is clamped
/// to `[-1, 1]` so rounding can't produce NaN.
///
/// ```
/// use aemet_clima::LatLon;
/// use aemet_clima::sites::proximity::distance_km;
///
/// let madrid = LatLon(40.4168, -3.7038);
/// assert_eq!(distance_km(madrid, madrid), 0.0);
/// ```
pub fn distance_km(from: LatLon, to: LatLon) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let cosine = (lat1 - lat2).cos() - lat1.cos() * lat2.cos() * (1.0 - (lon1 - lon2).cos());
    EARTH_RADIUS_KM * cosine.clamp(-1.0, 1.0).acos()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearSite {
    pub site: Site,
    pub distance_km: f64,
}

/// Result of [`nearest`]: sites ordered by distance, closest first.
#[derive(Debug, Clone, PartialEq)]
pub struct NearSites {
    pub sites: Vec<NearSite>,
    pub reference_point: LatLon,
    /// Catalog metadata with `reference_point` set.
    pub metadata: Metadata,
}

impl NearSites {
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn codes(&self) -> Vec<String> {
        self.sites.iter().map(|s| s.site.site.clone()).collect()
    }

    pub fn closest(&self) -> Option<&NearSite> {
        self.sites.first()
    }

    /// Site columns plus a trailing `distance` column (km).
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let sites: Vec<Site> = self.sites.iter().map(|s| s.site.clone()).collect();
        let mut df = SiteCatalog::new(sites, Metadata::default()).to_frame()?;
        let distances: Vec<f64> = self.sites.iter().map(|s| s.distance_km).collect();
        df.with_column(Column::new("distance".into(), distances))?;
        Ok(df)
    }
}

/// The `n` sites of `catalog` closest to `reference` and no further than
/// `max_distance_km`, ascending by distance. Ties keep catalog order.
pub fn nearest(catalog: &SiteCatalog, reference: LatLon, n: usize, max_distance_km: f64) -> NearSites {
    let mut metadata = catalog.metadata.clone();
    metadata.reference_point = Some(reference);

    let mut candidates: Vec<(f64, &Site)> = if n == 0 {
        Vec::new()
    } else {
        catalog
            .sites()
            .iter()
            .map(|site| (distance_km(reference, site.location()), site))
            .filter(|(distance, _)| *distance <= max_distance_km)
            .collect()
    };
    // sort_by_key is stable.
    candidates.sort_by_key(|(distance, _)| OrderedFloat(*distance));
    candidates.truncate(n);

    NearSites {
        sites: candidates
            .into_iter()
            .map(|(distance_km, site)| NearSite {
                site: site.clone(),
                distance_km,
            })
            .collect(),
        reference_point: reference,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::site;

    /// `R·acos(cos(φ1−φ2) − cos φ1·cos φ2·(1 − cos(λ1−λ2)))`, term by term.
    fn law_of_cosines(from: LatLon, to: LatLon) -> f64 {
        let phi1 = from.0.to_radians();
        let phi2 = to.0.to_radians();
        let lambda1 = from.1.to_radians();
        let lambda2 = to.1.to_radians();
        let first = f64::cos(phi1 - phi2);
        let second = f64::cos(phi1) * f64::cos(phi2) * (1.0 - f64::cos(lambda1 - lambda2));
        let argument = (first - second).max(-1.0).min(1.0);
        6371.0 * f64::acos(argument)
    }

    fn catalog() -> SiteCatalog {
        SiteCatalog::new(
            vec![
                site("BCN", 41.3874, 2.1686),
                site("MAD", 40.4168, -3.7038),
                site("SEV", 37.3891, -5.9845),
                site("MAD2", 40.4168, -3.7038),
            ],
            Metadata::default(),
        )
    }

    #[test]
    fn test_identical_points() {
        let p = LatLon(43.4747, -3.8);
        assert_eq!(distance_km(p, p), 0.0);
    }

    #[test]
    fn test_matches_independent_computation() {
        let madrid = LatLon(40.4168, -3.7038);
        let pairs = [
            (madrid, LatLon(41.3874, 2.1686)),
            (madrid, LatLon(-40.0, 176.0)),
            (LatLon(40.0, -4.0), LatLon(40.000001, -4.0)),
            (LatLon(43.4747, -3.8), LatLon(28.4636, -16.2518)),
        ];
        for (from, to) in pairs {
            assert_eq!(distance_km(from, to), law_of_cosines(from, to), "{:?} -> {:?}", from, to);
        }
    }

    #[test]
    fn test_literal_distances() {
        let madrid = LatLon(40.4168, -3.7038);
        let d = distance_km(madrid, LatLon(41.3874, 2.1686));
        assert!((d - 505.0956641013756).abs() < 1e-9, "got {}", d);

        // Near-antipodal: the clamp keeps it finite.
        let d = distance_km(madrid, LatLon(-40.0, 176.0));
        assert!((d - 19962.35510629813).abs() < 1e-6, "got {}", d);
    }

    #[test]
    fn test_tiny_separations_round_like_the_cosine_form() {
        // cos(Δφ) rounds to exactly 1 here, so the distance collapses to zero
        // where haversine would give about 1.1e-5 km.
        let d = distance_km(LatLon(40.0, -4.0), LatLon(40.0000001, -4.0));
        assert_eq!(d, 0.0);

        // One ulp below 1 inside the acos; haversine gives about 1.112e-4 km.
        let d = distance_km(LatLon(40.0, -4.0), LatLon(40.000001, -4.0));
        assert!((d - 9.493529796600342e-5).abs() < 1e-12, "got {}", d);
    }

    #[test]
    fn test_nearest_orders_and_limits() {
        let result = nearest(&catalog(), LatLon(40.0, -4.0), 3, DEFAULT_MAX_DISTANCE_KM);
        assert_eq!(result.codes(), vec!["MAD", "MAD2", "SEV"]);
        assert_eq!(result.reference_point, LatLon(40.0, -4.0));
        assert_eq!(result.metadata.reference_point, Some(LatLon(40.0, -4.0)));
        assert!(result.sites.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn test_nearest_max_distance() {
        let result = nearest(&catalog(), LatLon(40.4168, -3.7038), 10, 100.0);
        assert_eq!(result.codes(), vec!["MAD", "MAD2"]);
        assert_eq!(result.closest().unwrap().distance_km, 0.0);
    }

    #[test]
    fn test_nearest_zero_is_empty() {
        assert!(nearest(&catalog(), LatLon(40.0, -4.0), 0, DEFAULT_MAX_DISTANCE_KM).is_empty());
    }

    #[test]
    fn test_to_frame_has_distance() -> Result<(), Box<dyn std::error::Error>> {
        let df = nearest(&catalog(), LatLon(40.4168, -3.7038), 2, 1000.0).to_frame()?;
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("distance")?.f64()?.get(0), Some(0.0));
        Ok(())
    }
}
