//! JSON document persistence for the cache.
//!
//! The whole entry set is one document:
//!
//! ```json
//! { "locations": { "<key>": { "timestamp": "...", "lat": 0.0, ... } },
//!   "metadata": { "created": "...", "last_updated": "..." } }
//! ```
//!
//! Loading never fails: a missing or unreadable file is an empty cache and
//! entries that do not decode are skipped. Saves go through a temporary file
//! in the same directory followed by a rename.

use crate::entry::{CacheEntry, iso8601};
use crate::error::CacheError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(with = "iso8601")]
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "optional_iso8601")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Metadata {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created: now,
            last_updated: None,
        }
    }
}

mod optional_iso8601 {
    use super::iso8601;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => iso8601::serialize(dt, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(iso8601::parse))
    }
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    locations: BTreeMap<String, Value>,
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    locations: &'a BTreeMap<String, CacheEntry>,
    metadata: &'a Metadata,
}

/// In-memory state decoded from the cache file.
#[derive(Debug)]
pub struct Snapshot {
    pub entries: BTreeMap<String, CacheEntry>,
    pub metadata: Metadata,
    pub skipped: usize,
}

impl Snapshot {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            entries: BTreeMap::new(),
            metadata: Metadata::new(now),
            skipped: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file on disk, or 0 when it does not exist yet.
    pub fn size(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    pub fn load(&self, now: DateTime<Utc>) -> Snapshot {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No cache file yet, starting empty");
                return Snapshot::empty(now);
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read cache file, starting empty");
                return Snapshot::empty(now);
            }
        };

        match serde_json::from_str::<RawDocument>(&text) {
            Ok(raw) => decode(raw, now),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cache file is corrupt, starting empty");
                Snapshot::empty(now)
            }
        }
    }

    pub fn save(
        &self,
        entries: &BTreeMap<String, CacheEntry>,
        metadata: &Metadata,
    ) -> Result<(), CacheError> {
        let body = serde_json::to_string_pretty(&DocumentRef {
            locations: entries,
            metadata,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, body).map_err(|e| CacheError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            CacheError::io(&self.path, e)
        })?;

        debug!(path = %self.path.display(), entries = entries.len(), "Cache saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "college_cache.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn decode(raw: RawDocument, now: DateTime<Utc>) -> Snapshot {
    let metadata = raw
        .metadata
        .and_then(|m| serde_json::from_value::<Metadata>(m).ok())
        .unwrap_or_else(|| Metadata::new(now));

    let mut entries: BTreeMap<String, CacheEntry> = BTreeMap::new();
    let mut skipped = 0;

    for (stored_key, value) in raw.locations {
        let mut entry = match serde_json::from_value::<CacheEntry>(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %stored_key, error = %e, "Skipping malformed cache entry");
                skipped += 1;
                continue;
            }
        };

        entry.category = entry.category.trim().to_lowercase();
        if entry.category.is_empty() || entry.area().validate().is_err() {
            warn!(key = %stored_key, "Skipping cache entry with invalid area or stream");
            skipped += 1;
            continue;
        }

        let key = entry.key();
        match entries.get(&key) {
            Some(existing) if existing.created_at >= entry.created_at => {
                debug!(key = %key, "Dropping older duplicate cache entry");
            }
            _ => {
                entries.insert(key, entry);
            }
        }
    }

    Snapshot {
        entries,
        metadata,
        skipped,
    }
}
