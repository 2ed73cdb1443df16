//! Tenderhub API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Client context extraction
//! - Rate limiting
//! - Request routing to the tender, saved-link, and summary services
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tenderhub_common::{
    config::AppConfig,
    db::{DbPool, Repository},
    graph::{GraphClient, SparqlTenderReader},
    metrics,
    search::SearchIndex,
    summarizer::create_summarizer,
    tenders::TenderService,
};
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub tenders: Arc<TenderService>,
    pub search: SearchIndex,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    let config = Arc::new(config);

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Tenderhub API Gateway v{}", tenderhub_common::VERSION);

    // Initialize metrics exporter
    if config.observability.metrics_port > 0 {
        let metrics_addr =
            SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    // Initialize the relational store
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let repository = Arc::new(Repository::new(db.clone()));

    // Initialize the graph store reader
    let graph_client = GraphClient::new(&config.graph).await?;
    let reader = Arc::new(SparqlTenderReader::new(
        graph_client,
        config.graph.tender_uri_prefix.clone(),
    ));

    // Initialize the search index
    let search = SearchIndex::new(&config.search)?;
    if let Err(e) = search.ensure_settings().await {
        // Listing degrades until the index comes back; everything else works
        warn!(error = %e, "Could not apply search index settings");
    }

    // Initialize the summarizer
    let summarizer = create_summarizer(&config.summarizer)?;

    let tenders = Arc::new(TenderService::new(
        reader,
        repository.clone(),
        repository,
        summarizer,
        config.tenders.missing_tender_policy,
    ));

    let state = AppState {
        config: config.clone(),
        db,
        tenders,
        search,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no client context)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Tender listing (search index)
        .route("/tenders", get(handlers::tenders::list_tenders))
        .route("/tenders", post(handlers::tenders::search_tenders))
        // Saved tenders
        .route("/tenders/saved", get(handlers::saved::list_saved))
        .route("/tenders/saved/links", get(handlers::saved::list_links))
        .route("/tenders/{id}/save", post(handlers::saved::toggle_save))
        // Tender records (graph store)
        .route("/tenders/{id}", get(handlers::tenders::get_tender))
        .route("/tenders/{id}/preview", get(handlers::tenders::get_preview))
        // AI summaries
        .route("/tenders/{id}/summary", get(handlers::summaries::get_summary))
        .route("/tenders/{id}/summary", put(handlers::summaries::update_summary))
        .route(
            "/tenders/{id}/summary/generate",
            post(handlers::summaries::generate_summary),
        );

    let mut app = Router::new().nest("/v1", api_routes);

    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        app = app.layer(axum::middleware::from_fn(
            move |request: axum::extract::Request, next: axum::middleware::Next| {
                let limiter = limiter.clone();
                async move {
                    middleware::rate_limit::rate_limit_middleware(request, next, limiter).await
                }
            },
        ));
    }

    app.layer(axum::middleware::from_fn(
        middleware::metrics::track_requests,
    ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
