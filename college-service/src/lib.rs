pub mod config;
pub mod finder;
pub mod handlers;
pub mod openapi;
pub mod search;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/search", post(handlers::search_colleges))
        .route("/api/cache/search", post(handlers::search_cache))
        .route("/api/cache/locations", get(handlers::cached_locations))
        .route("/api/cache/stats", get(handlers::cache_stats))
        .route("/api/cache/populate", post(handlers::populate_cache))
        .route("/api/cache/clear", post(handlers::clear_cache))
        .route("/api/cache/cleanup", post(handlers::cleanup_cache))
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
