//! # Weft HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Graph and cache occupancy
//! - `POST /fact` - Write a base fact
//! - `GET /fact/{name}` - Read a fact (recomputes dirty derived facts)
//! - `POST /facts/query` - Pattern query over facts
//! - `GET /graph/edges` - Dependency introspection
//! - `POST /cache` - Store a cache entry
//! - `GET /cache/{key}` - Cache lookup (counts the access)
//! - `DELETE /cache/{key}` - Delete a cache entry (soft in Long)
//! - `POST /cache/query` - Pattern query across tiers (no touching)
//! - `POST /cache/tick` - Advance the maintenance cycle
//! - `GET /cache/stats` - Occupancy snapshot
//! - `GET /cache/history?n=` - Recently touched keys
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `WEFT_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `WEFT_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `WEFT_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

// Re-exports for external use
pub use auth::get_api_key_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
// Re-export handlers and types for integration tests (via `weft::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    cache_delete_handler, cache_get_handler, cache_history_handler, cache_put_handler,
    cache_query_handler, cache_stats_handler, cache_tick_handler, edges_handler, health_handler,
    query_facts_handler, read_fact_handler, set_fact_handler, status_handler,
};
#[allow(unused_imports)]
pub use types::{
    CacheDeleteResponse, CachePutRequest, CachePutResponse, CacheValueResponse, EdgesResponse,
    FactResponse, HealthResponse, HistoryParams, HistoryResponse, QueryRequest, QueryResponse,
    SetFactRequest, SetFactResponse, StatusResponse, TickResponse, validate_name, validate_pattern,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use weft_core::{Graph, TieredCache, WeftError};

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: one graph and one cache behind coarse locks.
#[derive(Clone)]
pub struct AppState {
    /// The reactive fact graph.
    pub graph: Arc<RwLock<Graph<Value>>>,
    /// The tiered cache.
    pub cache: Arc<RwLock<TieredCache<Value>>>,
}

impl AppState {
    /// Create new app state from a graph and a cache.
    #[must_use]
    pub fn new(graph: Graph<Value>, cache: TieredCache<Value>) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            cache: Arc::new(RwLock::new(cache)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `WEFT_CORS_ORIGINS` environment variable:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
///
/// # Security Note
///
/// The default is restrictive (localhost only). Set `WEFT_CORS_ORIGINS=*`
/// explicitly only for development or if you understand the security implications.
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("WEFT_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            // Explicit wildcard - warn about security implications
            tracing::warn!(
                "CORS: Allowing ALL origins (WEFT_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            // Parse comma-separated origins
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in WEFT_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            // No configuration - default to localhost only (restrictive)
            tracing::info!("CORS: No WEFT_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. CORS - handles preflight requests
/// 2. Tracing - logs all requests
/// 3. Rate Limiting - protects against DoS (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    // Check if rate limiting is enabled
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    // Check if authentication is enabled
    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "⚠️  API key authentication DISABLED - all endpoints are publicly accessible! \
             Set WEFT_API_KEY environment variable to enable authentication."
        );
    }

    // Build base router with routes
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/fact", post(handlers::set_fact_handler))
        .route("/fact/{name}", get(handlers::read_fact_handler))
        .route("/facts/query", post(handlers::query_facts_handler))
        .route("/graph/edges", get(handlers::edges_handler))
        .route("/cache", post(handlers::cache_put_handler))
        .route("/cache/query", post(handlers::cache_query_handler))
        .route("/cache/tick", post(handlers::cache_tick_handler))
        .route("/cache/stats", get(handlers::cache_stats_handler))
        .route("/cache/history", get(handlers::cache_history_handler))
        .route(
            "/cache/{key}",
            get(handlers::cache_get_handler).delete(handlers::cache_delete_handler),
        );

    // Apply authentication middleware (innermost - runs last on request)
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    // Apply rate limiting middleware
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    // Apply CORS, body limit, and tracing (outermost layers)
    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(
    addr: &str,
    graph: Graph<Value>,
    cache: TieredCache<Value>,
) -> Result<(), WeftError> {
    let state = AppState::new(graph, cache);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| WeftError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Weft HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| WeftError::IoError(format!("Server error: {}", e)))
}
