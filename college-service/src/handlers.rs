use axum::{body::Bytes, extract::State, response::Json};
use college_cache::seed::seed_sample_locations;
use common::errors::AppError;
use common::models::{
    CacheSearchRequest, CacheSearchResponse, CleanupRequest, CleanupResponse, LocationsResponse,
    MessageResponse, ResultSource, SearchRequest, SearchResponse, StatsResponse,
};
use std::sync::Arc;
use tracing::info;

use crate::search::{CollegeSearch, SharedCache};

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<CollegeSearch>,
    pub cache: SharedCache,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health check")
    )
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "college-service" }))
}

#[utoipa::path(
    post,
    path = "/api/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Colleges near the requested point", body = SearchResponse),
        (status = 400, description = "Invalid coordinates, radius or stream"),
        (status = 502, description = "Upstream college finder failed"),
        (status = 504, description = "Upstream college finder timed out")
    ),
    tag = "search"
)]
pub async fn search_colleges(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    info!(lat = request.lat, lon = request.lon, radius_km = request.radius_km, "Search request received");

    let response = state.search.search(request).await?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/cache/search",
    request_body = CacheSearchRequest,
    responses(
        (status = 200, description = "Cached colleges matching the query", body = CacheSearchResponse),
        (status = 400, description = "Empty query")
    ),
    tag = "cache"
)]
pub async fn search_cache(
    State(state): State<AppState>,
    Json(request): Json<CacheSearchRequest>,
) -> Result<Json<CacheSearchResponse>, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError::validation("query must not be empty"));
    }

    let colleges = state.cache.lock().await.search(&request.query, &request.stream);
    info!(query = %request.query, count = colleges.len(), "Cache search answered");

    Ok(Json(CacheSearchResponse {
        success: true,
        total_found: colleges.len(),
        colleges,
        source: ResultSource::Cache,
    }))
}

#[utoipa::path(
    get,
    path = "/api/cache/locations",
    responses(
        (status = 200, description = "Every cached location, most accessed first", body = LocationsResponse)
    ),
    tag = "cache"
)]
pub async fn cached_locations(State(state): State<AppState>) -> Json<LocationsResponse> {
    let locations = state.cache.lock().await.list_locations();

    Json(LocationsResponse {
        success: true,
        total_locations: locations.len(),
        locations,
    })
}

#[utoipa::path(
    get,
    path = "/api/cache/stats",
    responses(
        (status = 200, description = "Cache statistics", body = StatsResponse)
    ),
    tag = "cache"
)]
pub async fn cache_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.lock().await.stats();

    Json(StatsResponse {
        success: true,
        message: None,
        stats,
    })
}

#[utoipa::path(
    post,
    path = "/api/cache/populate",
    responses(
        (status = 200, description = "Sample locations written to the cache", body = StatsResponse),
        (status = 500, description = "Cache file could not be written")
    ),
    tag = "cache"
)]
pub async fn populate_cache(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let mut cache = state.cache.lock().await;
    let seeded = seed_sample_locations(&mut cache)?;

    Ok(Json(StatsResponse {
        success: true,
        message: Some(format!("Cache populated with {} sample locations", seeded)),
        stats: cache.stats(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/cache/clear",
    responses(
        (status = 200, description = "Cache emptied", body = MessageResponse)
    ),
    tag = "cache"
)]
pub async fn clear_cache(State(state): State<AppState>) -> Json<MessageResponse> {
    state.cache.lock().await.clear();

    Json(MessageResponse {
        success: true,
        message: "Cache cleared successfully".to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/api/cache/cleanup",
    request_body(content = CleanupRequest, description = "Optional; `days` defaults to the freshness window"),
    responses(
        (status = 200, description = "Expired entries removed", body = CleanupResponse),
        (status = 400, description = "Malformed request body")
    ),
    tag = "cache"
)]
pub async fn cleanup_cache(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CleanupResponse>, AppError> {
    // an empty body means "use the default window"
    let request: CleanupRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CleanupRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };

    let mut cache = state.cache.lock().await;
    let days = request.days.unwrap_or(cache.config().freshness_days);
    let removed_count = cache.purge_expired(days);

    Ok(Json(CleanupResponse {
        success: true,
        message: format!("Removed {} entries older than {} days", removed_count, days),
        removed_count,
        stats: cache.stats(),
    }))
}
