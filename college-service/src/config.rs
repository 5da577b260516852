use college_cache::config::{
    DEFAULT_CACHE_FILE, DEFAULT_FRESHNESS_DAYS, DEFAULT_FUZZY_DISTANCE_METERS,
    DEFAULT_FUZZY_RADIUS_TOLERANCE_METERS,
};
use college_cache::{CacheConfig, NameOverride};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub struct Config {
    pub port: u16,
    pub cache: CacheConfig,
    pub finder_url: String,
    pub finder_timeout_secs: u64,
    pub finder_rate_limit_per_minute: u32,
    pub seed_cache_on_empty: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: parse_or(&lookup, "PORT", 3004),
            cache: cache_config(&lookup),
            finder_url: lookup("COLLEGE_FINDER_URL")
                .unwrap_or_else(|| "http://localhost:5000/api/colleges".to_string()),
            finder_timeout_secs: parse_or(&lookup, "FINDER_TIMEOUT_SECONDS", 25),
            finder_rate_limit_per_minute: parse_or(&lookup, "FINDER_RATE_LIMIT_PER_MINUTE", 30),
            seed_cache_on_empty: lookup("SEED_CACHE_ON_EMPTY")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(true),
        }
    }
}

/// Cache settings shared by the service and the admin CLI.
pub fn cache_config(lookup: &impl Fn(&str) -> Option<String>) -> CacheConfig {
    let mut config = CacheConfig {
        path: lookup("CACHE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE)),
        freshness_days: parse_or(lookup, "CACHE_FRESHNESS_DAYS", DEFAULT_FRESHNESS_DAYS),
        fuzzy_distance_meters: parse_or(lookup, "CACHE_FUZZY_DISTANCE_METERS", DEFAULT_FUZZY_DISTANCE_METERS),
        fuzzy_radius_tolerance_meters: parse_or(
            lookup,
            "CACHE_FUZZY_RADIUS_TOLERANCE_METERS",
            DEFAULT_FUZZY_RADIUS_TOLERANCE_METERS,
        ),
        ..CacheConfig::default()
    };

    if let Some(raw) = lookup("CACHE_NAME_OVERRIDES") {
        match NameOverride::parse_list(&raw) {
            Ok(overrides) => config.name_overrides = overrides,
            Err(e) => warn!(error = %e, "Ignoring CACHE_NAME_OVERRIDES, keeping defaults"),
        }
    }

    config
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
