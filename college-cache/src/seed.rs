//! Bundled sample answers for a few Madhya Pradesh cities.

use crate::cache::{ALL_STREAMS, GeoResultCache};
use crate::error::CacheError;
use crate::geo::SearchArea;
use common::models::College;
use serde::Deserialize;
use tracing::info;

const SAMPLE_LOCATIONS: &str = include_str!("../data/sample_locations.json");

#[derive(Debug, Clone, Deserialize)]
pub struct SampleLocation {
    pub location_name: String,
    pub lat: f64,
    pub lon: f64,
    pub radius: u32,
    pub stream: String,
    pub colleges: Vec<College>,
}

impl SampleLocation {
    fn area(&self) -> SearchArea {
        SearchArea::new(self.lat, self.lon, self.radius)
    }
}

/// The bundled samples, plus a combined `all` entry for every place that
/// only has per-stream samples.
pub fn sample_locations() -> Result<Vec<SampleLocation>, CacheError> {
    let mut samples: Vec<SampleLocation> = serde_json::from_str(SAMPLE_LOCATIONS)?;

    let mut combined: Vec<SampleLocation> = Vec::new();
    for sample in samples.iter().filter(|s| s.stream != ALL_STREAMS) {
        let has_all = samples
            .iter()
            .any(|s| s.location_name == sample.location_name && s.stream == ALL_STREAMS);
        if has_all {
            continue;
        }

        match combined.iter_mut().find(|c| c.location_name == sample.location_name) {
            Some(all) => {
                for college in &sample.colleges {
                    if !all.colleges.contains(college) {
                        all.colleges.push(college.clone());
                    }
                }
            }
            None => {
                let mut all = sample.clone();
                all.stream = ALL_STREAMS.to_string();
                all.colleges.dedup();
                combined.push(all);
            }
        }
    }

    samples.extend(combined);
    Ok(samples)
}

/// Store every sample through the normal write path. Returns how many
/// locations were written.
pub fn seed_sample_locations(cache: &mut GeoResultCache) -> Result<usize, CacheError> {
    let samples = sample_locations()?;
    let count = samples.len();

    for sample in samples {
        let area = sample.area();
        cache.store(area, &sample.stream, sample.colleges, Some(&sample.location_name))?;
    }

    info!(locations = count, "Seeded college cache with sample data");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_entry_deduplicates_colleges() {
        let samples = sample_locations().unwrap();
        let bhopal_all = samples
            .iter()
            .find(|s| s.location_name.starts_with("Bhopal") && s.stream == ALL_STREAMS)
            .unwrap();

        let per_stream: usize = samples
            .iter()
            .filter(|s| s.location_name.starts_with("Bhopal") && s.stream != ALL_STREAMS)
            .map(|s| s.colleges.len())
            .sum();

        assert_eq!(per_stream, 17);
        assert_eq!(bhopal_all.colleges.len(), 16);
        assert_eq!(samples.len(), 7);
    }
}
