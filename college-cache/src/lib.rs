//! Persistent geographic result cache for nearby-college searches.
//!
//! Upstream geographic lookups are slow, rate-limited and not deterministic,
//! so their answers are kept in a local JSON document and reused for repeated
//! or nearby queries:
//!
//! - exact hits on a quantized (lat, lon, radius, stream) key
//! - name overrides for places whose coordinates vary between geocoders
//! - nearby hits within a fixed distance, re-filtered to the requested radius
//! - lazy expiry on read plus an explicit age-based sweep

pub mod cache;
pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod geo;
pub mod seed;
pub mod storage;

pub use cache::{CacheHit, GeoResultCache, HitKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, NameOverride};
pub use error::CacheError;
pub use geo::{GeoPoint, SearchArea};
