use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// A single college record as produced by the upstream finder.
///
/// Only `name`, `lat` and `lon` are interpreted; every other field
/// (amenity, operator, website, tags, ...) is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct College {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl College {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A college found by free-text search, tagged with the cache entry it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedCollege {
    #[serde(flatten)]
    pub college: College,
    pub cached_location: String,
    pub cache_key: String,
}

/// Summary of one cached search location
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationSummary {
    pub key: String,
    pub location_name: String,
    pub lat: f64,
    pub lon: f64,
    pub radius: u32,
    pub stream: String,
    pub college_count: usize,
    pub access_count: u64,
    pub timestamp: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

/// Aggregate cache statistics
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheStats {
    pub total_cached_locations: usize,
    pub total_cached_colleges: usize,
    pub total_accesses: u64,
    pub most_popular_location: Option<String>,
    pub most_popular_access_count: u64,
    pub cache_file_size: u64,
}

/// Nearby college search request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchRequest {
    pub lat: f64,
    pub lon: f64,
    /// Search radius in kilometres
    #[serde(default = "default_radius_km")]
    pub radius_km: u32,
    #[serde(default = "default_stream")]
    pub stream: String,
    #[serde(default)]
    pub location_name: Option<String>,
}

fn default_radius_km() -> u32 {
    10
}

fn default_stream() -> String {
    "all".to_string()
}

/// Where a search answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Cache,
    Api,
}

/// Searched center echoed back to the caller
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchLocation {
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// Nearby college search response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub success: bool,
    #[schema(value_type = Vec<Object>)]
    pub colleges: Vec<College>,
    pub location: SearchLocation,
    pub total_found: usize,
    pub source: ResultSource,
    pub cache_key: String,
}

/// Free-text search over cached colleges
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheSearchRequest {
    pub query: String,
    #[serde(default = "default_stream")]
    pub stream: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CacheSearchResponse {
    pub success: bool,
    #[schema(value_type = Vec<Object>)]
    pub colleges: Vec<CachedCollege>,
    pub total_found: usize,
    pub source: ResultSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocationsResponse {
    pub success: bool,
    pub locations: Vec<LocationSummary>,
    pub total_locations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub success: bool,
    pub message: Option<String>,
    pub stats: CacheStats,
}

/// Expired-entry sweep request; `days` defaults to the freshness window
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CleanupRequest {
    #[serde(default)]
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
    pub removed_count: usize,
    pub stats: CacheStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn college_keeps_unknown_fields() {
        let raw = json!({
            "name": "Jabalpur Engineering College",
            "lat": 23.1815,
            "lon": 79.9864,
            "amenity": "college",
            "tags": { "amenity": "college" }
        });

        let college: College = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(college.name, "Jabalpur Engineering College");
        assert_eq!(college.extra["amenity"], "college");
        assert_eq!(serde_json::to_value(&college).unwrap(), raw);
    }

    #[test]
    fn search_request_defaults() {
        let req: SearchRequest = serde_json::from_value(json!({ "lat": 1.0, "lon": 2.0 })).unwrap();
        assert_eq!(req.radius_km, 10);
        assert_eq!(req.stream, "all");
        assert!(req.location_name.is_none());
    }
}
