use college_cache::GeoResultCache;
use college_cache::seed::seed_sample_locations;
use college_service::config::Config;
use college_service::finder::HttpCollegeFinder;
use college_service::handlers::AppState;
use college_service::search::CollegeSearch;
use common::tracing::init_tracing_with_format;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing_with_format(&std::env::var("LOG_FORMAT").unwrap_or_default());

    let config = Config::from_env();
    let cancellation_token = CancellationToken::new();

    let mut cache = GeoResultCache::open(config.cache.clone());
    if cache.is_empty() && config.seed_cache_on_empty {
        seed_sample_locations(&mut cache)?;
    }
    let stats = cache.stats();
    info!(
        locations = stats.total_cached_locations,
        colleges = stats.total_cached_colleges,
        path = %config.cache.path.display(),
        "College cache ready"
    );
    let cache = Arc::new(Mutex::new(cache));

    let finder = Arc::new(HttpCollegeFinder::new(
        config.finder_url.clone(),
        config.finder_timeout_secs,
        config.finder_rate_limit_per_minute,
    )?);
    let search = Arc::new(CollegeSearch::new(
        cache.clone(),
        finder,
        cancellation_token.clone(),
    ));

    let state = AppState {
        search,
        cache: cache.clone(),
    };
    let app = college_service::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("College service starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancellation_token))
        .await?;

    if let Err(e) = cache.lock().await.flush() {
        error!(error = %e, "Failed to write college cache on shutdown");
    }

    info!("College service stopped");
    Ok(())
}

async fn shutdown_signal(cancellation_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }

    // abandon upstream queries still in flight
    cancellation_token.cancel();
    warn!("Cancelled in-flight searches, shutting down gracefully...");
}
