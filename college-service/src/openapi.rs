use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use common::models::{
    CacheSearchRequest, CacheSearchResponse, CacheStats, CleanupRequest, CleanupResponse,
    LocationSummary, LocationsResponse, MessageResponse, ResultSource, SearchLocation,
    SearchRequest, SearchResponse, StatsResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::search_colleges,
        handlers::search_cache,
        handlers::cached_locations,
        handlers::cache_stats,
        handlers::populate_cache,
        handlers::clear_cache,
        handlers::cleanup_cache,
    ),
    components(schemas(
        SearchRequest,
        SearchResponse,
        SearchLocation,
        ResultSource,
        CacheSearchRequest,
        CacheSearchResponse,
        LocationsResponse,
        LocationSummary,
        StatsResponse,
        CacheStats,
        CleanupRequest,
        CleanupResponse,
        MessageResponse,
    )),
    tags(
        (name = "search", description = "Nearby college search"),
        (name = "cache", description = "Cache inspection and maintenance"),
    ),
)]
struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
