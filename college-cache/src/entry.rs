use crate::geo::{GeoPoint, SearchArea, derive_key};
use chrono::{DateTime, Duration, Utc};
use common::models::{College, LocationSummary};
use serde::{Deserialize, Serialize};

/// One stored search answer.
///
/// Field names follow the on-disk document: `timestamp` is the creation
/// time and `stream` the category tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "timestamp", with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub location_name: String,
    pub lat: f64,
    pub lon: f64,
    pub radius: u32,
    #[serde(rename = "stream")]
    pub category: String,
    pub colleges: Vec<College>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(rename = "last_accessed", with = "iso8601")]
    pub last_accessed_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(
        area: SearchArea,
        category: String,
        colleges: Vec<College>,
        location_name: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            created_at: now,
            location_name,
            lat: area.center.lat,
            lon: area.center.lon,
            radius: area.radius,
            category,
            colleges,
            access_count: 1,
            last_accessed_at: now,
        }
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    pub fn area(&self) -> SearchArea {
        SearchArea {
            center: self.center(),
            radius: self.radius,
        }
    }

    /// Index key derived from the stored fields.
    pub fn key(&self) -> String {
        derive_key(&self.area(), &self.category)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.created_at < window
    }

    pub fn record_access(&mut self, now: DateTime<Utc>) {
        self.access_count += 1;
        self.last_accessed_at = self.last_accessed_at.max(now);
    }

    pub fn display_name(&self) -> &str {
        if self.location_name.is_empty() {
            "Unknown"
        } else {
            &self.location_name
        }
    }

    pub fn summary(&self, key: &str) -> LocationSummary {
        LocationSummary {
            key: key.to_string(),
            location_name: self.display_name().to_string(),
            lat: self.lat,
            lon: self.lon,
            radius: self.radius,
            stream: self.category.clone(),
            college_count: self.colleges.len(),
            access_count: self.access_count,
            timestamp: self.created_at,
            last_accessed: self.last_accessed_at,
        }
    }
}

/// Timestamps are written as RFC 3339 but also read back from naive
/// `YYYY-MM-DDTHH:MM:SS[.ffffff]` strings, which are taken as UTC.
pub mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}
