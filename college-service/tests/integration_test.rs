use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use college_cache::{CacheConfig, GeoResultCache};
use college_service::finder::HttpCollegeFinder;
use college_service::handlers::AppState;
use college_service::search::{CollegeSearch, SharedCache};
use common::models::{ResultSource, SearchRequest};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

struct Harness {
    _dir: TempDir,
    cache: SharedCache,
    search: Arc<CollegeSearch>,
}

fn harness(finder_url: &str, token: CancellationToken) -> Harness {
    let dir = TempDir::new().unwrap();
    let cache = GeoResultCache::open(CacheConfig::new(dir.path().join("college_cache.json")));
    let cache = Arc::new(Mutex::new(cache));
    let finder = Arc::new(HttpCollegeFinder::new(finder_url.to_string(), 5, 600).unwrap());
    let search = Arc::new(CollegeSearch::new(cache.clone(), finder, token));
    Harness {
        _dir: dir,
        cache,
        search,
    }
}

fn bhopal_request(stream: &str) -> SearchRequest {
    SearchRequest {
        lat: 23.2599,
        lon: 77.4126,
        radius_km: 15,
        stream: stream.to_string(),
        location_name: None,
    }
}

async fn call(h: &Harness, request: Request<Body>) -> (StatusCode, Value) {
    let state = AppState {
        search: h.search.clone(),
        cache: h.cache.clone(),
    };
    let response = college_service::app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn miss_queries_finder_then_serves_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/colleges"))
        .and(query_param("radius", "15000"))
        .and(query_param("stream", "pcm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "colleges": [
                { "name": "Government College, Bhopal", "lat": 23.258, "lon": 77.408, "phone": "0755-2540000" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&format!("{}/api/colleges", server.uri()), CancellationToken::new());

    let first = h.search.search(bhopal_request("pcm")).await.unwrap();
    assert_eq!(first.source, ResultSource::Api);
    assert_eq!(first.total_found, 1);
    assert_eq!(first.cache_key, "23.260_77.413_15000_pcm");
    assert_eq!(first.colleges[0].extra["phone"], "0755-2540000");

    let second = h.search.search(bhopal_request("PCM")).await.unwrap();
    assert_eq!(second.source, ResultSource::Cache);
    assert_eq!(second.colleges, first.colleges);
}

#[tokio::test]
async fn empty_finder_answer_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/colleges"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "colleges": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&format!("{}/api/colleges", server.uri()), CancellationToken::new());

    let first = h.search.search(bhopal_request("arts")).await.unwrap();
    assert_eq!(first.source, ResultSource::Api);
    assert_eq!(first.total_found, 0);

    let second = h.search.search(bhopal_request("arts")).await.unwrap();
    assert_eq!(second.source, ResultSource::Cache);
    assert_eq!(second.total_found, 0);
}

#[tokio::test]
async fn finder_failure_stores_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/colleges"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let h = harness(&format!("{}/api/colleges", server.uri()), CancellationToken::new());

    let err = h.search.search(bhopal_request("pcm")).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    assert!(h.cache.lock().await.is_empty());
}

#[tokio::test]
async fn shutdown_abandons_upstream_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/colleges"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "colleges": [] }))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let h = harness(&format!("{}/api/colleges", server.uri()), token.clone());
    token.cancel();

    let err = h.search.search(bhopal_request("pcm")).await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(h.cache.lock().await.is_empty());
}

#[tokio::test]
async fn search_route_rejects_invalid_coordinates() {
    let h = harness("http://127.0.0.1:9/api/colleges", CancellationToken::new());

    let (status, body) = call(&h, post_json("/api/search", json!({ "lat": 120.0, "lon": 77.0 }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn cache_routes_cover_maintenance_flow() {
    let h = harness("http://127.0.0.1:9/api/colleges", CancellationToken::new());

    let (status, body) = call(&h, get("/api/cache/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_cached_locations"], 0);

    let (status, body) = call(&h, post_json("/api/cache/populate", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_cached_locations"], 7);

    let (_, body) = call(&h, get("/api/cache/locations")).await;
    assert_eq!(body["total_locations"], 7);

    let (status, body) = call(&h, post_json("/api/cache/search", json!({ "query": "jabalpur" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "cache");
    assert_eq!(body["total_found"], 3);

    let (status, _) = call(&h, post_json("/api/cache/search", json!({ "query": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let cleanup = Request::builder()
        .method("POST")
        .uri("/api/cache/cleanup")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(&h, cleanup).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed_count"], 0);

    let (status, body) = call(&h, post_json("/api/cache/cleanup", json!({ "days": 30 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed_count"], 0);

    let (_, body) = call(&h, post_json("/api/cache/clear", json!({}))).await;
    assert_eq!(body["success"], true);
    assert!(h.cache.lock().await.is_empty());
}

#[tokio::test]
async fn serves_openapi_document() {
    let h = harness("http://127.0.0.1:9/api/colleges", CancellationToken::new());

    let (status, body) = call(&h, get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/search"].is_object());
    assert!(body["paths"]["/api/cache/cleanup"].is_object());
}
