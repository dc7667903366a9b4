//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Lock discipline: graph reads go through `read(&mut self)` because dirty
//! derived facts recompute on read, so fact reads and queries take the write
//! lock. Cache lookups count accesses and promote, so they do too. Pure
//! snapshots (`edges`, `stats`, `query_pattern`, `recent_history`) take the
//! read lock.

use super::{
    AppState,
    types::{
        CacheDeleteResponse, CachePutRequest, CachePutResponse, CacheValueResponse, EdgesResponse,
        FactResponse, HealthResponse, HistoryParams, HistoryResponse, QueryRequest, QueryResponse,
        SetFactRequest, SetFactResponse, StatusResponse, TickResponse, validate_name,
        validate_pattern,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use weft_core::WeftError;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get graph and cache occupancy.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let graph = state.graph.read().await;
    let cache = state.cache.read().await;
    let stats = cache.stats();

    let response = StatusResponse {
        fact_count: graph.node_count(),
        base_count: graph.base_count(),
        derived_count: graph.derived_count(),
        dirty_count: graph.dirty_count(),
        long_count: stats.long_count,
        medium_count: stats.medium_count,
        short_count: stats.short_count,
        cycle: stats.cycle,
    };

    (StatusCode::OK, Json(response))
}

// =============================================================================
// FACT HANDLERS
// =============================================================================

/// Write a base fact, creating it if unknown.
pub async fn set_fact_handler(
    State(state): State<AppState>,
    Json(request): Json<SetFactRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate_name(&request.name) {
        return (
            StatusCode::BAD_REQUEST,
            Json(SetFactResponse::error(e.to_string())),
        );
    }

    let mut graph = state.graph.write().await;
    let created = !graph.contains(&request.name);
    match graph.set(&request.name, request.value) {
        Ok(()) => (StatusCode::OK, Json(SetFactResponse::success(created))),
        Err(e) => {
            let status = match e {
                WeftError::CannotSetDerived(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(SetFactResponse::error(format!("Set failed: {}", e))))
        }
    }
}

/// Read a fact's current value, recomputing a dirty derived fact.
pub async fn read_fact_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    if let Err(e) = validate_name(&name) {
        return (
            StatusCode::BAD_REQUEST,
            Json(FactResponse::error(name, e.to_string())),
        );
    }

    let mut graph = state.graph.write().await;
    match graph.read(&name) {
        Some(value) => match graph.kind_of(&name) {
            Some(kind) => (StatusCode::OK, Json(FactResponse::found(name, kind, value))),
            None => (StatusCode::OK, Json(FactResponse::not_found(name))),
        },
        None => (StatusCode::OK, Json(FactResponse::not_found(name))),
    }
}

/// Pattern query over the fact graph.
pub async fn query_facts_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate_pattern(&request.pattern) {
        return (
            StatusCode::BAD_REQUEST,
            Json(QueryResponse::error(e.to_string())),
        );
    }

    let mut graph = state.graph.write().await;
    let results = graph.query(&request.pattern);
    (StatusCode::OK, Json(QueryResponse::success(results)))
}

/// Dependency introspection: every fact mapped to its exact dependents.
pub async fn edges_handler(State(state): State<AppState>) -> impl IntoResponse {
    let graph = state.graph.read().await;
    (
        StatusCode::OK,
        Json(EdgesResponse {
            edges: graph.edges(),
        }),
    )
}

// =============================================================================
// CACHE HANDLERS
// =============================================================================

/// Store a value, classifying the tier from key depth unless overridden.
pub async fn cache_put_handler(
    State(state): State<AppState>,
    Json(request): Json<CachePutRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate_name(&request.key) {
        return (
            StatusCode::BAD_REQUEST,
            Json(CachePutResponse::error(e.to_string())),
        );
    }

    let mut cache = state.cache.write().await;
    let tier = match request.tier {
        Some(tier) => cache.put_in(&request.key, request.value, tier),
        None => cache.put(&request.key, request.value),
    };
    (StatusCode::OK, Json(CachePutResponse::success(tier)))
}

/// Look up a key, counting the access and evaluating promotion.
pub async fn cache_get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    if let Err(e) = validate_name(&key) {
        return (
            StatusCode::BAD_REQUEST,
            Json(CacheValueResponse::error(key, e.to_string())),
        );
    }

    let mut cache = state.cache.write().await;
    let value = cache.get(&key);
    // tier is read after the hit, so a promotion is already visible
    let tier = cache.tier_of(&key);
    match value {
        Some(value) => (
            StatusCode::OK,
            Json(CacheValueResponse::found(key, tier, value)),
        ),
        None => (
            StatusCode::OK,
            Json(CacheValueResponse::not_found(key, tier)),
        ),
    }
}

/// Delete a key: structural in Short/Medium, soft in Long.
pub async fn cache_delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    if let Err(e) = validate_name(&key) {
        return (
            StatusCode::BAD_REQUEST,
            Json(CacheDeleteResponse::error(e.to_string())),
        );
    }

    let mut cache = state.cache.write().await;
    match cache.delete(&key) {
        Ok(()) => (StatusCode::OK, Json(CacheDeleteResponse::success())),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(CacheDeleteResponse::error(e.to_string())),
        ),
    }
}

/// Pattern query across all tiers, without touching entries.
pub async fn cache_query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    if let Err(e) = validate_pattern(&request.pattern) {
        return (
            StatusCode::BAD_REQUEST,
            Json(QueryResponse::error(e.to_string())),
        );
    }

    let cache = state.cache.read().await;
    let results = cache.query_pattern(&request.pattern);
    (StatusCode::OK, Json(QueryResponse::success(results)))
}

/// Advance the maintenance clock one cycle and apply demotions.
pub async fn cache_tick_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut cache = state.cache.write().await;
    let demoted = cache.tick();
    (
        StatusCode::OK,
        Json(TickResponse {
            cycle: cache.cycle(),
            demoted,
        }),
    )
}

/// Occupancy snapshot: tier counts, Long key sample, hottest Medium entries.
pub async fn cache_stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.cache.read().await;
    (StatusCode::OK, Json(cache.stats()))
}

/// The most recently touched keys, oldest first.
pub async fn cache_history_handler(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let cache = state.cache.read().await;
    let keys = cache.recent_history(params.n.unwrap_or(usize::MAX));
    (
        StatusCode::OK,
        Json(HistoryResponse {
            count: keys.len(),
            keys,
        }),
    )
}
