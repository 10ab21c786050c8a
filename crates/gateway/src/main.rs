//! Scholarport API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Bearer token verification and role checks
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    extract::FromRef,
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use scholarport_common::{
    auth::JwtManager,
    cache::Cache,
    catalog::CatalogService,
    config::AppConfig,
    db::{DbPool, Repository},
    metrics as app_metrics,
    moderation::ModerationService,
    storage::UploadVerifier,
    store::PaperStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub catalog: Arc<CatalogService>,
    pub moderation: Arc<ModerationService>,
    pub jwt: Arc<JwtManager>,
    pub verifier: Arc<UploadVerifier>,
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting Scholarport API Gateway v{}", scholarport_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Install the Prometheus recorder and register metric descriptions
    let prometheus = PrometheusBuilder::new()
        .set_buckets(app_metrics::LATENCY_BUCKETS)?
        .install_recorder()?;
    app_metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    let store: Arc<dyn PaperStore> = Arc::new(Repository::new(db.clone()));

    // The count cache is best-effort; a missing or unreachable Redis
    // only disables it.
    let cache = if config.redis.url.is_some() {
        match Cache::new(&config.redis).await {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                warn!(error = %e, "Redis unavailable, running without count cache");
                None
            }
        }
    } else {
        None
    };

    let mut catalog = CatalogService::new(store.clone(), config.upstream_timeout());
    if let Some(cache) = cache {
        catalog = catalog.with_cache(cache, config.catalog.count_cache_ttl_secs);
    }

    let state = AppState {
        config: config.clone(),
        db,
        catalog: Arc::new(catalog),
        moderation: Arc::new(ModerationService::new(store, config.upstream_timeout())),
        jwt: Arc::new(JwtManager::new(
            &config.auth.jwt_secret,
            config.auth.jwt_expiration_secs,
        )),
        verifier: Arc::new(UploadVerifier::new(&config.upload)?),
    };

    // Build the router
    let app = create_router(state, prometheus);

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
fn create_router(
    state: AppState,
    prometheus: metrics_exporter_prometheus::PrometheusHandle,
) -> Router {
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
        // Catalog endpoints (public)
        .route("/papers/featured", get(handlers::catalog::list_featured))
        .route("/papers/search", get(handlers::catalog::search))
        .route("/papers/count", get(handlers::catalog::count))

        // Paper endpoints
        .route("/papers", post(handlers::papers::submit_paper))
        .route("/papers/mine", get(handlers::papers::my_papers))
        .route("/papers/{id}", get(handlers::papers::get_paper))
        .route("/papers/{id}", delete(handlers::papers::delete_paper))
        .route("/papers/{id}/like", post(handlers::papers::like_paper))
        .route("/papers/{id}/download", post(handlers::papers::download_paper))

        // Comment endpoints
        .route("/papers/{id}/comments", get(handlers::comments::list_comments))
        .route("/papers/{id}/comments", post(handlers::comments::add_comment))

        // User endpoints
        .route("/users", post(handlers::users::register_profile))
        .route("/users/me", get(handlers::users::me))

        // Admin endpoints
        .route("/admin/papers", get(handlers::moderation::review_queue))
        .route("/admin/papers/{id}/status", post(handlers::moderation::update_status))
        .route("/admin/papers/{id}/history", get(handlers::moderation::history))
        .route("/admin/users", get(handlers::users::list_users))
        .route("/admin/users/{id}/activate", post(handlers::users::activate_user))
        .route("/admin/users/{id}/deactivate", post(handlers::users::deactivate_user))
        .route("/admin/stats", get(handlers::users::dashboard_stats));

    // Compose the app
    let mut app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(move || async move { prometheus.render() }))
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id);

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

    app.with_state(state)
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
