//! Key derivation and great-circle distance.

use crate::error::CacheError;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Coordinates are quantized to this many decimal places (~110 m).
const COORDINATE_DECIMALS: i32 = 3;

/// Radii are quantized to the nearest multiple of this many meters.
const RADIUS_STEP_METERS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_meters(self.lat, self.lon, other.lat, other.lon)
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(CacheError::invalid(format!(
                "latitude {} is outside [-90, 90]",
                self.lat
            )));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(CacheError::invalid(format!(
                "longitude {} is outside [-180, 180]",
                self.lon
            )));
        }
        Ok(())
    }
}

/// A search center plus radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchArea {
    pub center: GeoPoint,
    pub radius: u32,
}

impl SearchArea {
    pub fn new(lat: f64, lon: f64, radius: u32) -> Self {
        Self {
            center: GeoPoint::new(lat, lon),
            radius,
        }
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        self.center.validate()?;
        if self.radius == 0 {
            return Err(CacheError::invalid("radius must be a positive number of meters"));
        }
        Ok(())
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.center.distance_to(point) <= f64::from(self.radius)
    }
}

/// Great-circle distance between two points in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Trim and lowercase a stream tag; empty tags are rejected.
pub fn normalize_category(category: &str) -> Result<String, CacheError> {
    let category = category.trim().to_lowercase();
    if category.is_empty() {
        return Err(CacheError::invalid("stream must not be empty"));
    }
    Ok(category)
}

fn quantize_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    // adding 0.0 folds -0.0 into 0.0 so both format identically
    (value * scale).round() / scale + 0.0
}

fn quantize_radius(radius: u32) -> u64 {
    let steps = (f64::from(radius) / RADIUS_STEP_METERS).round_ties_even();
    (steps * RADIUS_STEP_METERS) as u64
}

/// Derive the exact-match index key for an area and an already normalized stream.
///
/// Nearby queries (same ~110 m cell, same radius to the nearest kilometre)
/// collapse onto the same key.
pub fn derive_key(area: &SearchArea, category: &str) -> String {
    format!(
        "{:.3}_{:.3}_{}_{}",
        quantize_coordinate(area.center.lat),
        quantize_coordinate(area.center.lon),
        quantize_radius(area.radius),
        category
    )
}
