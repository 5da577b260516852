use chrono::{Duration, TimeZone, Utc};
use college_cache::seed::seed_sample_locations;
use college_cache::{CacheConfig, GeoResultCache, HitKind, ManualClock, SearchArea};
use common::models::College;
use std::sync::Arc;
use tempfile::TempDir;

fn open(dir: &TempDir, clock: Arc<ManualClock>) -> GeoResultCache {
    GeoResultCache::with_clock(CacheConfig::new(dir.path().join("college_cache.json")), clock)
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 9, 15, 10, 0, 0).unwrap()))
}

fn bhopal_colleges() -> Vec<College> {
    vec![
        College::new("Govt Motilal Vigyan Mahavidyalaya (MVM)", 23.2599, 77.4126).with_field("amenity", "college"),
        College::new("Government Science and Commerce College", 23.2550, 77.4100),
        College::new("Government Geetanjali Girls' College", 23.2620, 77.4150),
        College::new("Government Post Graduate College, BHEL", 23.2400, 77.4800),
        College::new("Government College, Bhopal", 23.2580, 77.4080),
    ]
}

#[test]
fn repeated_search_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let mut cache = open(&dir, clock());
    let area = SearchArea::new(23.2599, 77.4126, 15_000);

    let key = cache.store(area, "pcm", bhopal_colleges(), Some("Bhopal")).unwrap();
    let hit = cache.lookup(area, "pcm", Some("Bhopal")).unwrap().unwrap();

    assert_eq!(hit.colleges, bhopal_colleges());
    assert_eq!(cache.entry(&key).unwrap().access_count, 2);
}

#[test]
fn free_text_search_reports_source_location() {
    let dir = TempDir::new().unwrap();
    let mut cache = open(&dir, clock());

    cache
        .store(
            SearchArea::new(23.1815, 79.9864, 10_000),
            "all",
            vec![College::new("Jabalpur Engineering College", 23.1815, 79.9864)],
            Some("Jabalpur"),
        )
        .unwrap();

    let found = cache.search("engineering", "all");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].college.name, "Jabalpur Engineering College");
    assert_eq!(found[0].cached_location, "Jabalpur");
    assert_eq!(found[0].cache_key, "23.182_79.986_10000_all");
}

#[test]
fn sweep_removes_old_entries_and_lookup_misses() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    let mut cache = open(&dir, clock.clone());
    let area = SearchArea::new(22.7196, 75.8577, 12_000);

    clock.advance(Duration::days(-10));
    cache
        .store(area, "all", vec![College::new("Government Holkar Science College", 22.7085, 75.8735)], Some("Indore"))
        .unwrap();
    clock.advance(Duration::days(10));

    assert_eq!(cache.purge_expired(7), 1);
    assert!(cache.lookup(area, "all", Some("Indore")).unwrap().is_none());
}

#[test]
fn clear_empties_the_cache() {
    let dir = TempDir::new().unwrap();
    let mut cache = open(&dir, clock());

    for (i, name) in ["Indore", "Jabalpur", "Gwalior"].iter().enumerate() {
        let area = SearchArea::new(22.0 + i as f64, 77.0, 10_000);
        cache.store(area, "all", Vec::new(), Some(*name)).unwrap();
    }
    assert_eq!(cache.stats().total_cached_locations, 3);

    cache.clear();
    assert_eq!(cache.stats().total_cached_locations, 0);

    let reopened = open(&dir, clock());
    assert!(reopened.is_empty());
}

#[test]
fn overwrite_wins_over_merge() {
    let dir = TempDir::new().unwrap();
    let mut cache = open(&dir, clock());
    let area = SearchArea::new(23.2599, 77.4126, 15_000);

    cache.store(area, "commerce", bhopal_colleges(), None).unwrap();
    let replacement = vec![College::new("Government Arts & Commerce (Naveen) College", 23.2580, 77.4090)];
    cache.store(area, "commerce", replacement.clone(), None).unwrap();

    let hit = cache.lookup(area, "commerce", None).unwrap().unwrap();
    assert_eq!(hit.kind, HitKind::Exact);
    assert_eq!(hit.colleges, replacement);
}

#[test]
fn seeded_cache_answers_city_searches() {
    let dir = TempDir::new().unwrap();
    let mut cache = open(&dir, clock());

    assert_eq!(seed_sample_locations(&mut cache).unwrap(), 7);

    let jabalpur = cache
        .lookup(SearchArea::new(23.1815, 79.9864, 10_000), "all", Some("Jabalpur"))
        .unwrap()
        .unwrap();
    assert_eq!(jabalpur.colleges.len(), 3);

    let bhopal_pcb = cache
        .lookup(SearchArea::new(23.30, 77.35, 10_000), "PCB", Some("Bhopal"))
        .unwrap()
        .unwrap();
    assert_eq!(bhopal_pcb.kind, HitKind::Named);
    assert_eq!(bhopal_pcb.colleges.len(), 3);
}

#[test]
fn reads_documents_written_with_naive_timestamps() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("college_cache.json");
    std::fs::write(
        &path,
        r#"{
          "locations": {
            "23.26_77.413_15000_pcm": {
              "timestamp": "2025-09-14T18:22:05.123456",
              "location_name": "Bhopal, Madhya Pradesh",
              "lat": 23.2599, "lon": 77.4126, "radius": 15000, "stream": "pcm",
              "colleges": [
                { "name": "Government College, Bhopal", "lat": 23.258, "lon": 77.408, "phone": "" }
              ],
              "access_count": 5,
              "last_accessed": "2025-09-15T08:00:00"
            }
          },
          "metadata": { "created": "2025-09-01T00:00:00", "last_updated": "2025-09-15T08:00:00" }
        }"#,
    )
    .unwrap();

    let mut cache = open(&dir, clock());
    let hit = cache
        .lookup(SearchArea::new(23.2599, 77.4126, 15_000), "pcm", None)
        .unwrap()
        .unwrap();

    assert_eq!(hit.key, "23.260_77.413_15000_pcm");
    assert_eq!(hit.colleges[0].extra["phone"], "");
    assert_eq!(cache.stats().total_accesses, 6);
}
