use college_cache::{GeoResultCache, SearchArea};
use common::errors::AppError;
use common::models::{College, ResultSource, SearchLocation, SearchRequest, SearchResponse};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::finder::CollegeFinder;

/// The one cache instance of the process; every operation takes the lock.
///
/// Mutations rewrite the cache file synchronously while the lock is held,
/// so a large file blocks the calling worker for the duration of the write.
pub type SharedCache = Arc<Mutex<GeoResultCache>>;

/// Answers nearby-college searches from the cache, falling back to the
/// upstream finder and recording what it returns.
pub struct CollegeSearch {
    cache: SharedCache,
    finder: Arc<dyn CollegeFinder>,
    cancellation_token: CancellationToken,
}

impl CollegeSearch {
    pub fn new(
        cache: SharedCache,
        finder: Arc<dyn CollegeFinder>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            cache,
            finder,
            cancellation_token,
        }
    }

    #[instrument(skip(self, request), fields(lat = request.lat, lon = request.lon, stream = %request.stream))]
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, AppError> {
        let radius = request
            .radius_km
            .checked_mul(1000)
            .ok_or_else(|| AppError::validation("radius_km is too large"))?;
        let area = SearchArea::new(request.lat, request.lon, radius);
        let location_name = request
            .location_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let cached = self
            .cache
            .lock()
            .await
            .lookup(area, &request.stream, location_name)?;

        if let Some(hit) = cached {
            info!(key = %hit.key, kind = ?hit.kind, count = hit.colleges.len(), "Serving colleges from cache");
            return Ok(build_response(&request, ResultSource::Cache, hit.key, hit.colleges));
        }

        info!("No cached answer, querying upstream finder");
        let colleges = tokio::select! {
            _ = self.cancellation_token.cancelled() => {
                warn!("Search cancelled by shutdown");
                return Err(AppError::internal("Service is shutting down"));
            }
            result = self.finder.find(area, &request.stream) => result?,
        };

        let key = self
            .cache
            .lock()
            .await
            .store(area, &request.stream, colleges.clone(), location_name)?;

        Ok(build_response(&request, ResultSource::Api, key, colleges))
    }
}

fn build_response(
    request: &SearchRequest,
    source: ResultSource,
    cache_key: String,
    colleges: Vec<College>,
) -> SearchResponse {
    SearchResponse {
        success: true,
        total_found: colleges.len(),
        colleges,
        location: SearchLocation {
            name: request.location_name.clone(),
            lat: request.lat,
            lon: request.lon,
        },
        source,
        cache_key,
    }
}
