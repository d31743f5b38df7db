//! Port region catalog and point-in-region resolution.
//!
//! A catalog is an ordered list of named bounding boxes plus one fallback
//! name that matches when nothing else does. Catalogs are plain immutable
//! values: build one (or take [`RegionCatalog::us_ports`]) and pass it to
//! whatever needs to resolve positions.

use crate::constants::FALLBACK_REGION;
use crate::error::{AisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Latitude/longitude rectangle with inclusive edges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Whether the point lies inside the box grown by `tolerance` on every edge
    #[inline]
    pub fn contains(&self, lat: f64, lon: f64, tolerance: f64) -> bool {
        (self.min_lat - tolerance) <= lat
            && lat <= (self.max_lat + tolerance)
            && (self.min_lon - tolerance) <= lon
            && lon <= (self.max_lon + tolerance)
    }

    fn is_well_formed(&self) -> bool {
        [self.min_lat, self.max_lat, self.min_lon, self.max_lon]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
    }
}

/// A named port approach area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub bounds: BoundingBox,
}

impl Region {
    pub fn new(name: impl Into<String>, bounds: BoundingBox) -> Self {
        Self {
            name: name.into(),
            bounds,
        }
    }
}

/// Ordered set of port regions with a fallback label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCatalog {
    regions: Vec<Region>,
    fallback: String,
}

impl RegionCatalog {
    /// Build a catalog, rejecting malformed boxes and duplicate names.
    ///
    /// Regions are resolved in the order given; the fallback is implicitly last.
    pub fn new(regions: Vec<Region>, fallback: impl Into<String>) -> Result<Self> {
        let fallback = fallback.into();
        if fallback.trim().is_empty() {
            return Err(AisError::InvalidRegion {
                name: fallback,
                reason: "fallback name must not be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for region in &regions {
            if region.name == fallback {
                return Err(AisError::InvalidRegion {
                    name: region.name.clone(),
                    reason: "name collides with the fallback region".to_string(),
                });
            }
            if !seen.insert(region.name.as_str()) {
                return Err(AisError::InvalidRegion {
                    name: region.name.clone(),
                    reason: "duplicate region name".to_string(),
                });
            }
            if !region.bounds.is_well_formed() {
                return Err(AisError::InvalidRegion {
                    name: region.name.clone(),
                    reason: format!("malformed bounds {:?}", region.bounds),
                });
            }
        }

        Ok(Self { regions, fallback })
    }

    /// Major US port approach areas with `"Unknown"` as the fallback
    pub fn us_ports() -> Self {
        let regions = US_PORTS
            .iter()
            .map(|&(name, min_lat, max_lat, min_lon, max_lon)| {
                Region::new(name, BoundingBox::new(min_lat, max_lat, min_lon, max_lon))
            })
            .collect();

        Self {
            regions,
            fallback: FALLBACK_REGION.to_string(),
        }
    }

    /// Name of the first region whose tolerance-expanded box contains the
    /// point, or the fallback name.
    pub fn resolve(&self, lat: f64, lon: f64, tolerance: f64) -> &str {
        self.regions
            .iter()
            .find(|region| region.bounds.contains(lat, lon, tolerance))
            .map(|region| region.name.as_str())
            .unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn is_fallback(&self, name: &str) -> bool {
        name == self.fallback
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl Default for RegionCatalog {
    fn default() -> Self {
        Self::us_ports()
    }
}

/// (name, min_lat, max_lat, min_lon, max_lon)
const US_PORTS: &[(&str, f64, f64, f64, f64)] = &[
    ("Los Angeles", 33.6, 33.9, -118.5, -118.0),
    ("Long Beach", 33.7, 33.9, -118.25, -118.15),
    ("Oakland", 37.7, 37.85, -122.35, -122.2),
    ("Seattle", 47.5, 47.7, -122.4, -122.2),
    ("New York", 40.6, 40.8, -74.1, -73.9),
    ("Norfolk", 36.8, 37.1, -76.4, -76.2),
    ("Savannah", 32.0, 32.2, -81.2, -80.8),
    ("Charleston", 32.7, 32.9, -80.0, -79.8),
    ("Miami", 25.75, 25.85, -80.2, -80.0),
    ("Port Everglades", 26.05, 26.1, -80.15, -80.1),
    ("Baltimore", 39.2, 39.3, -76.6, -76.5),
    ("Philadelphia", 39.9, 40.0, -75.2, -75.1),
    ("Houston", 29.6, 29.8, -95.2, -94.8),
    ("New Orleans", 29.9, 30.1, -90.1, -89.9),
    ("Jacksonville", 30.3, 30.5, -81.7, -81.3),
    ("San Diego", 32.7, 32.8, -117.2, -117.1),
    ("Boston", 42.3, 42.4, -71.1, -70.9),
    ("Anchorage", 61.1, 61.3, -149.95, -149.8),
    ("Honolulu", 21.3, 21.4, -157.9, -157.8),
    ("Portland", 45.6, 45.7, -122.7, -122.6),
    ("Puerto Rico", 18.2, 18.3, -66.3, -66.2),
    ("Tacoma", 47.2, 47.4, -122.55, -122.35),
    ("Port Arthur", 29.85, 29.95, -93.95, -93.85),
    ("Beaumont", 30.0, 30.1, -94.15, -94.05),
    ("Corpus Christi", 27.75, 27.9, -97.45, -97.25),
    ("Baton Rouge", 30.4, 30.5, -91.25, -91.15),
    ("Mobile", 30.6, 30.7, -88.1, -88.0),
    ("Tampa", 27.9, 28.0, -82.5, -82.4),
    ("San Francisco", 37.75, 37.85, -122.45, -122.3),
    ("Wilmington (DE)", 39.7, 39.75, -75.55, -75.5),
    ("Camden (NJ)", 39.9, 39.95, -75.1, -75.05),
    ("Providence", 41.7, 41.8, -71.45, -71.35),
];
