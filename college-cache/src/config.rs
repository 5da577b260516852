use crate::error::CacheError;
use crate::geo::GeoPoint;
use chrono::Duration;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_CACHE_FILE: &str = "college_cache.json";
pub const DEFAULT_FRESHNESS_DAYS: u32 = 7;
pub const DEFAULT_FUZZY_DISTANCE_METERS: f64 = 2000.0;
pub const DEFAULT_FUZZY_RADIUS_TOLERANCE_METERS: u32 = 2000;

/// A place whose cached answers are matched by name before coordinates.
///
/// Geocoders and IP geolocation rarely agree on the exact center of a
/// city, so a request naming the place reuses any fresh entry stored under
/// that name. When `center` is set, coordinate matching for such requests
/// is done against it instead of the caller's coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct NameOverride {
    pub pattern: String,
    pub center: Option<GeoPoint>,
}

impl NameOverride {
    pub fn new(pattern: impl AsRef<str>, center: Option<GeoPoint>) -> Self {
        Self {
            pattern: pattern.as_ref().trim().to_lowercase(),
            center,
        }
    }

    pub fn matches(&self, location_name: &str) -> bool {
        location_name.to_lowercase().contains(&self.pattern)
    }

    /// Parse a `;`-separated list such as `bhopal=23.2599,77.4126;indore`.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, CacheError> {
        raw.split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| item.parse::<NameOverride>())
            .collect()
    }
}

impl FromStr for NameOverride {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (pattern, center) = match s.split_once('=') {
            Some((pattern, coords)) => {
                let (lat, lon) = coords.split_once(',').ok_or_else(|| {
                    CacheError::invalid(format!("override '{s}' must look like name=lat,lon"))
                })?;
                let parse = |v: &str| {
                    v.trim()
                        .parse::<f64>()
                        .map_err(|_| CacheError::invalid(format!("bad coordinate '{v}' in '{s}'")))
                };
                let center = GeoPoint::new(parse(lat)?, parse(lon)?);
                center.validate()?;
                (pattern, Some(center))
            }
            None => (s, None),
        };

        if pattern.trim().is_empty() {
            return Err(CacheError::invalid(format!("override '{s}' has an empty name")));
        }
        Ok(Self::new(pattern, center))
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub freshness_days: u32,
    pub fuzzy_distance_meters: f64,
    pub fuzzy_radius_tolerance_meters: u32,
    pub name_overrides: Vec<NameOverride>,
}

impl CacheConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::days(i64::from(self.freshness_days))
    }

    pub fn with_name_overrides(mut self, overrides: Vec<NameOverride>) -> Self {
        self.name_overrides = overrides;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CACHE_FILE),
            freshness_days: DEFAULT_FRESHNESS_DAYS,
            fuzzy_distance_meters: DEFAULT_FUZZY_DISTANCE_METERS,
            fuzzy_radius_tolerance_meters: DEFAULT_FUZZY_RADIUS_TOLERANCE_METERS,
            name_overrides: vec![NameOverride::new(
                "bhopal",
                Some(GeoPoint::new(23.2599, 77.4126)),
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_override_list() {
        let overrides = NameOverride::parse_list(" Bhopal=23.2599, 77.4126 ; indore;").unwrap();
        assert_eq!(
            overrides,
            vec![
                NameOverride::new("bhopal", Some(GeoPoint::new(23.2599, 77.4126))),
                NameOverride::new("indore", None),
            ]
        );
    }

    #[test]
    fn rejects_malformed_overrides() {
        assert!("bhopal=23.2".parse::<NameOverride>().is_err());
        assert!("bhopal=abc,77".parse::<NameOverride>().is_err());
        assert!("bhopal=95,77".parse::<NameOverride>().is_err());
        assert!("=23,77".parse::<NameOverride>().is_err());
    }

    #[test]
    fn override_matches_case_insensitively() {
        let ov = NameOverride::new("Bhopal", None);
        assert!(ov.matches("BHOPAL, Madhya Pradesh"));
        assert!(!ov.matches("Indore"));
    }

    #[test]
    fn defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.freshness_window(), Duration::days(7));
        assert_eq!(config.fuzzy_radius_tolerance_meters, 2000);
        assert_eq!(config.name_overrides.len(), 1);
    }
}
