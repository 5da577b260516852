use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::geo::{GeoPoint, SearchArea, derive_key, normalize_category};
use crate::storage::{CacheFile, Metadata};
use chrono::{DateTime, Duration, Utc};
use common::models::{CacheStats, CachedCollege, College, LocationSummary};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Stream tag meaning "no subject filter".
pub const ALL_STREAMS: &str = "all";

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    /// Matched through a configured place name.
    Named,
    /// Matched the derived key of the request.
    Exact,
    /// Borrowed from a nearby entry and re-filtered to the requested radius.
    Nearby,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub key: String,
    pub kind: HitKind,
    pub colleges: Vec<College>,
}

/// Persistent cache of nearby-college search results.
///
/// The instance owns the whole entry set and rewrites the cache file after
/// every mutation. It is not internally synchronized; share it behind a
/// single lock.
pub struct GeoResultCache {
    config: CacheConfig,
    file: CacheFile,
    clock: Arc<dyn Clock>,
    entries: BTreeMap<String, CacheEntry>,
    metadata: Metadata,
    dirty: bool,
}

impl GeoResultCache {
    pub fn open(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let file = CacheFile::new(config.path.clone());
        let snapshot = file.load(clock.now());

        info!(
            path = %file.path().display(),
            entries = snapshot.entries.len(),
            skipped = snapshot.skipped,
            "College cache loaded"
        );

        Self {
            config,
            file,
            clock,
            entries: snapshot.entries,
            metadata: snapshot.metadata,
            dirty: false,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inspect an entry without counting it as an access.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// True when a save failed and the file is behind the in-memory state.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Find a fresh cached answer for the request.
    ///
    /// Tried in order: a configured place name, the exact derived key, then
    /// the nearest compatible entry. A stale exact entry is deleted on the way.
    /// When the name has a configured center and the requested area misses,
    /// the exact and nearby steps are repeated around that center.
    #[instrument(skip(self), fields(lat = area.center.lat, lon = area.center.lon, radius = area.radius))]
    pub fn lookup(
        &mut self,
        area: SearchArea,
        category: &str,
        location_name: Option<&str>,
    ) -> Result<Option<CacheHit>, CacheError> {
        area.validate()?;
        let category = normalize_category(category)?;
        let now = self.clock.now();

        let name_override = location_name
            .and_then(|name| self.config.name_overrides.iter().find(|o| o.matches(name)))
            .cloned();

        if let Some(name_override) = &name_override
            && let Some(key) = self.find_named(&name_override.pattern, &category, now)
            && let Some(hit) = self.record_hit(key, HitKind::Named, None, now)
        {
            return Ok(Some(hit));
        }

        if let Some(hit) = self.match_area(&area, &category, now) {
            return Ok(Some(hit));
        }

        if let Some(center) = name_override.and_then(|o| o.center)
            && center != area.center
        {
            let named_area = SearchArea {
                center,
                radius: area.radius,
            };
            if let Some(hit) = self.match_area(&named_area, &category, now) {
                return Ok(Some(hit));
            }
        }

        debug!(stream = %category, "Cache miss");
        Ok(None)
    }

    /// Record the answer to a search, replacing any entry with the same key.
    ///
    /// An empty `colleges` list is a valid answer ("searched, found nothing").
    #[instrument(skip(self, colleges), fields(count = colleges.len()))]
    pub fn store(
        &mut self,
        area: SearchArea,
        category: &str,
        colleges: Vec<College>,
        location_name: Option<&str>,
    ) -> Result<String, CacheError> {
        area.validate()?;
        let category = normalize_category(category)?;
        let now = self.clock.now();

        let key = derive_key(&area, &category);
        let location_name = location_name.unwrap_or_default().trim().to_string();
        let count = colleges.len();

        let entry = CacheEntry::new(area, category, colleges, location_name, now);
        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            debug!(key = %key, previous = previous.colleges.len(), "Replacing cached entry");
        }

        info!(key = %key, colleges = count, "Cached colleges");
        self.persist();
        Ok(key)
    }

    /// Case-insensitive substring search over place names and college names.
    ///
    /// Stale entries are included; this is a browse operation.
    pub fn search(&self, query: &str, category: &str) -> Vec<CachedCollege> {
        let query = query.trim().to_lowercase();
        let category = category.trim().to_lowercase();
        let any_stream = category.is_empty() || category == ALL_STREAMS;

        let mut results = Vec::new();
        for (key, entry) in &self.entries {
            if !any_stream && entry.category != category {
                continue;
            }

            let location_match = entry.location_name.to_lowercase().contains(&query);
            for college in &entry.colleges {
                if location_match || college.name.to_lowercase().contains(&query) {
                    results.push(CachedCollege {
                        college: college.clone(),
                        cached_location: entry.display_name().to_string(),
                        cache_key: key.clone(),
                    });
                }
            }
        }
        results
    }

    /// One summary per entry, most accessed first.
    pub fn list_locations(&self) -> Vec<LocationSummary> {
        let mut locations: Vec<LocationSummary> = self
            .entries
            .iter()
            .map(|(key, entry)| entry.summary(key))
            .collect();
        locations.sort_by(|a, b| b.access_count.cmp(&a.access_count));
        locations
    }

    /// Delete every entry created more than `max_age_days` ago.
    pub fn purge_expired(&mut self, max_age_days: u32) -> usize {
        let now = self.clock.now();
        let max_age = Duration::days(i64::from(max_age_days));

        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.created_at <= max_age);
        let removed = before - self.entries.len();

        if removed > 0 {
            info!(removed, max_age_days, "Removed expired cache entries");
            self.persist();
        }
        removed
    }

    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.metadata = Metadata::new(self.clock.now());
        info!(removed, "College cache cleared");
        self.persist();
    }

    pub fn stats(&self) -> CacheStats {
        let mut most_popular: Option<&CacheEntry> = None;
        for entry in self.entries.values() {
            let current = most_popular.map_or(0, |e| e.access_count);
            if entry.access_count > current {
                most_popular = Some(entry);
            }
        }

        CacheStats {
            total_cached_locations: self.entries.len(),
            total_cached_colleges: self.entries.values().map(|e| e.colleges.len()).sum(),
            total_accesses: self.entries.values().map(|e| e.access_count).sum(),
            most_popular_location: most_popular.map(|e| e.display_name().to_string()),
            most_popular_access_count: most_popular.map_or(0, |e| e.access_count),
            cache_file_size: self.file.size(),
        }
    }

    /// Write out state left unsaved by an earlier failed save.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        if !self.dirty {
            return Ok(());
        }
        self.metadata.last_updated = Some(self.clock.now());
        self.file.save(&self.entries, &self.metadata)?;
        self.dirty = false;
        info!(path = %self.file.path().display(), "College cache flushed");
        Ok(())
    }

    /// Exact derived key, then the nearest compatible entry.
    fn match_area(&mut self, area: &SearchArea, category: &str, now: DateTime<Utc>) -> Option<CacheHit> {
        let key = derive_key(area, category);
        if let Some(entry) = self.entries.get(&key) {
            if entry.is_fresh(now, self.config.freshness_window()) {
                if let Some(hit) = self.record_hit(key, HitKind::Exact, None, now) {
                    return Some(hit);
                }
            } else {
                info!(key = %key, location = %entry.display_name(), "Cache entry expired, purging");
                self.entries.remove(&key);
                self.persist();
            }
        }

        let (key, colleges) = self.find_nearby(area, category, now)?;
        self.record_hit(key, HitKind::Nearby, Some(colleges), now)
    }

    // Stale matches are skipped, not purged; only the exact-key step deletes.
    fn find_named(&self, pattern: &str, category: &str, now: DateTime<Utc>) -> Option<String> {
        let window = self.config.freshness_window();
        self.entries
            .iter()
            .filter(|(_, e)| e.category == category)
            .filter(|(_, e)| e.location_name.to_lowercase().contains(pattern))
            .filter(|(_, e)| e.is_fresh(now, window))
            .max_by_key(|(_, e)| e.last_accessed_at)
            .map(|(key, _)| key.clone())
    }

    /// Nearest fresh entry for the same stream with a similar radius whose
    /// results, re-filtered to the requested circle, are not empty.
    fn find_nearby(
        &self,
        area: &SearchArea,
        category: &str,
        now: DateTime<Utc>,
    ) -> Option<(String, Vec<College>)> {
        let window = self.config.freshness_window();

        let mut candidates: Vec<(f64, &String, &CacheEntry)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.category == category)
            .filter(|(_, e)| e.radius.abs_diff(area.radius) <= self.config.fuzzy_radius_tolerance_meters)
            .filter(|(_, e)| e.is_fresh(now, window))
            .map(|(key, e)| (area.center.distance_to(&e.center()), key, e))
            .filter(|(distance, _, _)| *distance <= self.config.fuzzy_distance_meters)
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (distance, key, entry) in candidates {
            let colleges: Vec<College> = entry
                .colleges
                .iter()
                .filter(|c| area.contains(&GeoPoint::new(c.lat, c.lon)))
                .cloned()
                .collect();

            if colleges.is_empty() {
                debug!(key = %key, "Nearby entry has nothing inside the requested radius");
                continue;
            }

            debug!(key = %key, distance_m = distance, kept = colleges.len(), "Using nearby cached entry");
            return Some((key.clone(), colleges));
        }
        None
    }

    fn record_hit(
        &mut self,
        key: String,
        kind: HitKind,
        filtered: Option<Vec<College>>,
        now: DateTime<Utc>,
    ) -> Option<CacheHit> {
        let entry = self.entries.get_mut(&key)?;
        entry.record_access(now);
        let colleges = filtered.unwrap_or_else(|| entry.colleges.clone());

        info!(
            key = %key,
            kind = ?kind,
            location = %entry.display_name(),
            colleges = colleges.len(),
            access_count = entry.access_count,
            "Cache hit"
        );

        self.persist();
        Some(CacheHit {
            key,
            kind,
            colleges,
        })
    }

    fn persist(&mut self) {
        self.metadata.last_updated = Some(self.clock.now());
        match self.file.save(&self.entries, &self.metadata) {
            Ok(()) => self.dirty = false,
            Err(e) => {
                error!(error = %e, "Failed to persist college cache; keeping in-memory state");
                self.dirty = true;
            }
        }
    }
}

impl Drop for GeoResultCache {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "College cache still unsaved at shutdown");
        }
    }
}
