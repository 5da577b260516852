use async_trait::async_trait;
use college_cache::SearchArea;
use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::College;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{info, instrument, warn};

/// Live source of nearby colleges, consulted only on a cache miss.
#[async_trait]
pub trait CollegeFinder: Send + Sync {
    async fn find(&self, area: SearchArea, stream: &str) -> Result<Vec<College>, AppError>;
}

#[derive(Debug, Deserialize)]
struct FinderResponse {
    colleges: Vec<College>,
}

/// Calls an upstream finder endpoint:
/// `GET {base_url}?lat=..&lon=..&radius=..&stream=..` returning `{"colleges": [...]}`.
pub struct HttpCollegeFinder {
    http_client: HttpClient,
    base_url: String,
    rate_limiter: Arc<Semaphore>,
    last_request_time: Arc<Mutex<Option<Instant>>>,
    min_request_interval: Duration,
}

impl HttpCollegeFinder {
    pub fn new(
        base_url: String,
        timeout_secs: u64,
        rate_limit_per_minute: u32,
    ) -> Result<Self, AppError> {
        let rate_limit = rate_limit_per_minute.max(1);
        Ok(Self {
            http_client: HttpClient::new(timeout_secs, 2)?,
            base_url,
            // at most two concurrent upstream queries
            rate_limiter: Arc::new(Semaphore::new(rate_limit.min(2) as usize)),
            last_request_time: Arc::new(Mutex::new(None)),
            min_request_interval: Duration::from_millis(60_000 / u64::from(rate_limit)),
        })
    }

    fn request_url(&self, area: &SearchArea, stream: &str) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}lat={}&lon={}&radius={}&stream={}",
            self.base_url,
            separator,
            area.center.lat,
            area.center.lon,
            area.radius,
            urlencoding::encode(stream)
        )
    }

    async fn debounce(&self) {
        let mut last_request = self.last_request_time.lock().await;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_request_interval {
                let wait_time = self.min_request_interval - elapsed;
                warn!(wait_ms = wait_time.as_millis(), "Debouncing finder request");
                tokio::time::sleep(wait_time).await;
            }
        }
        *last_request = Some(Instant::now());
    }
}

#[async_trait]
impl CollegeFinder for HttpCollegeFinder {
    #[instrument(skip(self), fields(lat = area.center.lat, lon = area.center.lon, radius = area.radius))]
    async fn find(&self, area: SearchArea, stream: &str) -> Result<Vec<College>, AppError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| AppError::internal(format!("Rate limiter error: {}", e)))?;

        self.debounce().await;

        let url = self.request_url(&area, stream);
        info!(stream = %stream, "Querying upstream college finder");

        let response: FinderResponse = self.http_client.get_json(&url).await?;
        info!(count = response.colleges.len(), "Upstream finder answered");

        Ok(response.colleges)
    }
}
