//! Integration tests for the Weft HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
// Allow holding MutexGuard across await in auth tests - tests are serialized
// intentionally to avoid env var conflicts
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::HeaderValue;
use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::Mutex;
use weft::api::{
    AppState, CacheDeleteResponse, CachePutResponse, CacheValueResponse, EdgesResponse,
    FactResponse, HealthResponse, HistoryResponse, QueryResponse, SetFactRequest, SetFactResponse,
    StatusResponse, TickResponse, create_router,
};
use weft_core::{CacheConfig, CacheStats, Graph, NodeKind, Tier, TieredCache};

/// Mutex to serialize auth tests since they modify env vars.
static AUTH_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Guard wrapper that holds the mutex and ensures cleanup on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var("WEFT_API_KEY") };
    }
}

/// Create a test server with a fresh graph and cache.
/// Returns a guard that must be kept alive during the test.
fn create_test_server() -> (TestServer, TestGuard) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("WEFT_API_KEY") };
    let state = AppState::new(Graph::new(), TieredCache::new());
    let router = create_router(state);
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
    )
}

/// Create a test server with pre-populated facts and cache entries.
///
/// The graph holds two base facts and one derived fact (the bill recomputes
/// from the orders); the cache holds one Long and one Medium entry.
/// Returns a guard that must be kept alive during the test.
fn create_populated_test_server() -> (TestServer, TestGuard) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("WEFT_API_KEY") };

    let mut graph: Graph<Value> = Graph::new();
    graph.base("tavolo.4.coperti", || json!(4)).unwrap();
    graph
        .base("tavolo.4.ordini", || json!(["margherita"]))
        .unwrap();
    graph
        .derived("tavolo.4.conto", &["tavolo.4.ordini"], |g| {
            let ordini = g.read("tavolo.4.ordini").unwrap_or(Value::Null);
            let count = ordini.as_array().map_or(0, Vec::len);
            json!(count * 12)
        })
        .unwrap();

    let mut cache: TieredCache<Value> = TieredCache::new();
    cache.put("config", json!({"theme": "dark"}));
    cache.put("menu.pizza.margherita", json!({"price": 12}));

    let state = AppState::new(graph, cache);
    let router = create_router(state);
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
    )
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[tokio::test]
async fn test_health_returns_correct_version() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;
    let health: HealthResponse = response.json();

    // Version should match Cargo.toml
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// STATUS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_status_empty() {
    let (server, _guard) = create_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.fact_count, 0);
    assert_eq!(status.base_count, 0);
    assert_eq!(status.derived_count, 0);
    assert_eq!(status.dirty_count, 0);
    assert_eq!(status.long_count, 0);
    assert_eq!(status.medium_count, 0);
    assert_eq!(status.short_count, 0);
    assert_eq!(status.cycle, 0);
}

#[tokio::test]
async fn test_status_populated() {
    let (server, _guard) = create_populated_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.fact_count, 3);
    assert_eq!(status.base_count, 2);
    assert_eq!(status.derived_count, 1);
    // "config" has depth 0, "menu.pizza.margherita" has depth 2
    assert_eq!(status.long_count, 1);
    assert_eq!(status.medium_count, 1);
    assert_eq!(status.short_count, 0);
}

// =============================================================================
// FACT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_set_fact_creates_then_updates() {
    let (server, _guard) = create_test_server();

    let request = SetFactRequest {
        name: "tavolo.1.coperti".to_string(),
        value: json!(4),
    };
    let response = server.post("/fact").json(&request).await;

    response.assert_status_ok();
    let result: SetFactResponse = response.json();
    assert!(result.success);
    assert_eq!(result.created, Some(true));
    assert!(result.error.is_none());

    // Second write to the same name is an update
    let request = SetFactRequest {
        name: "tavolo.1.coperti".to_string(),
        value: json!(6),
    };
    let response = server.post("/fact").json(&request).await;

    response.assert_status_ok();
    let result: SetFactResponse = response.json();
    assert!(result.success);
    assert_eq!(result.created, Some(false));
}

#[tokio::test]
async fn test_set_fact_empty_name_rejected() {
    let (server, _guard) = create_test_server();

    let request = json!({ "name": "", "value": 1 });
    let response = server.post("/fact").json(&request).await;

    response.assert_status_bad_request();
    let result: SetFactResponse = response.json();
    assert!(!result.success);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_set_fact_wildcard_name_rejected() {
    let (server, _guard) = create_test_server();

    // Concrete names never contain wildcards
    let request = json!({ "name": "tavolo.*", "value": 1 });
    let response = server.post("/fact").json(&request).await;

    response.assert_status_bad_request();
    let result: SetFactResponse = response.json();
    assert!(!result.success);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_set_fact_on_derived_returns_conflict() {
    let (server, _guard) = create_populated_test_server();

    // "tavolo.4.conto" is derived; its value comes from compute only
    let request = json!({ "name": "tavolo.4.conto", "value": 999 });
    let response = server.post("/fact").json(&request).await;

    response.assert_status(axum::http::StatusCode::CONFLICT);
    let result: SetFactResponse = response.json();
    assert!(!result.success);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_read_fact_found() {
    let (server, _guard) = create_populated_test_server();

    let response = server.get("/fact/tavolo.4.coperti").await;

    response.assert_status_ok();
    let result: FactResponse = response.json();
    assert!(result.success);
    assert!(result.found);
    assert_eq!(result.name, "tavolo.4.coperti");
    assert_eq!(result.kind, Some(NodeKind::Base));
    assert_eq!(result.value, Some(json!(4)));
}

#[tokio::test]
async fn test_read_fact_missing_is_not_an_error() {
    let (server, _guard) = create_test_server();

    let response = server.get("/fact/tavolo.9.coperti").await;

    // Misses are results, not errors
    response.assert_status_ok();
    let result: FactResponse = response.json();
    assert!(result.success);
    assert!(!result.found);
    assert!(result.kind.is_none());
    assert!(result.value.is_none());
}

#[tokio::test]
async fn test_read_fact_wildcard_name_rejected() {
    let (server, _guard) = create_populated_test_server();

    let response = server.get("/fact/tavolo.*").await;

    response.assert_status_bad_request();
    let result: FactResponse = response.json();
    assert!(!result.success);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_derived_fact_recomputes_after_set() {
    let (server, _guard) = create_populated_test_server();

    // One order: bill is 12
    let response = server.get("/fact/tavolo.4.conto").await;
    response.assert_status_ok();
    let result: FactResponse = response.json();
    assert!(result.found);
    assert_eq!(result.kind, Some(NodeKind::Derived));
    assert_eq!(result.value, Some(json!(12)));

    // Add a second order through the API
    let request = json!({
        "name": "tavolo.4.ordini",
        "value": ["margherita", "diavola"]
    });
    let response = server.post("/fact").json(&request).await;
    response.assert_status_ok();

    // The bill recomputes on the next read
    let response = server.get("/fact/tavolo.4.conto").await;
    let result: FactResponse = response.json();
    assert_eq!(result.value, Some(json!(24)));
}

// =============================================================================
// FACT QUERY ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_query_facts_wildcard() {
    let (server, _guard) = create_populated_test_server();

    let request = json!({ "pattern": "tavolo.4.*" });
    let response = server.post("/facts/query").json(&request).await;

    response.assert_status_ok();
    let result: QueryResponse = response.json();
    assert!(result.success);
    assert_eq!(result.count, 3);
    // Derived values in query results are fresh
    assert_eq!(result.results.get("tavolo.4.conto"), Some(&json!(12)));
    assert_eq!(result.results.get("tavolo.4.coperti"), Some(&json!(4)));
}

#[tokio::test]
async fn test_query_facts_exact_name() {
    let (server, _guard) = create_populated_test_server();

    let request = json!({ "pattern": "tavolo.4.coperti" });
    let response = server.post("/facts/query").json(&request).await;

    response.assert_status_ok();
    let result: QueryResponse = response.json();
    assert_eq!(result.count, 1);
}

#[tokio::test]
async fn test_query_facts_no_match() {
    let (server, _guard) = create_populated_test_server();

    let request = json!({ "pattern": "cucina.*" });
    let response = server.post("/facts/query").json(&request).await;

    response.assert_status_ok();
    let result: QueryResponse = response.json();
    assert!(result.success);
    assert_eq!(result.count, 0);
    assert!(result.results.is_empty());
}

#[tokio::test]
async fn test_query_facts_empty_pattern_rejected() {
    let (server, _guard) = create_test_server();

    let request = json!({ "pattern": "" });
    let response = server.post("/facts/query").json(&request).await;

    response.assert_status_bad_request();
    let result: QueryResponse = response.json();
    assert!(!result.success);
    assert!(result.error.is_some());
}

// =============================================================================
// EDGES ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_graph_edges() {
    let (server, _guard) = create_populated_test_server();

    let response = server.get("/graph/edges").await;

    response.assert_status_ok();
    let result: EdgesResponse = response.json();
    assert_eq!(
        result.edges.get("tavolo.4.ordini"),
        Some(&vec!["tavolo.4.conto".to_string()]),
        "Orders should list the bill as dependent"
    );
    assert_eq!(result.edges.get("tavolo.4.coperti"), Some(&vec![]));
    assert_eq!(result.edges.get("tavolo.4.conto"), Some(&vec![]));
}

#[tokio::test]
async fn test_graph_edges_empty() {
    let (server, _guard) = create_test_server();

    let response = server.get("/graph/edges").await;

    response.assert_status_ok();
    let result: EdgesResponse = response.json();
    assert!(result.edges.is_empty());
}

// =============================================================================
// CACHE PUT TESTS
// =============================================================================

#[tokio::test]
async fn test_cache_put_classifies_by_depth() {
    let (server, _guard) = create_test_server();

    // Depth 0 lands in Long
    let request = json!({ "key": "config", "value": { "theme": "dark" } });
    let response = server.post("/cache").json(&request).await;
    response.assert_status_ok();
    let result: CachePutResponse = response.json();
    assert!(result.success);
    assert_eq!(result.tier, Some(Tier::Long));

    // Depth 2 lands in Medium
    let request = json!({ "key": "menu.pizza.margherita", "value": { "price": 12 } });
    let response = server.post("/cache").json(&request).await;
    let result: CachePutResponse = response.json();
    assert_eq!(result.tier, Some(Tier::Medium));

    // Depth 4 lands in Short
    let request = json!({ "key": "ordine.7.note.extra.0", "value": "senza cipolla" });
    let response = server.post("/cache").json(&request).await;
    let result: CachePutResponse = response.json();
    assert_eq!(result.tier, Some(Tier::Short));
}

#[tokio::test]
async fn test_cache_put_tier_override() {
    let (server, _guard) = create_test_server();

    // A deep key pinned to Long
    let request = json!({
        "key": "ordine.7.note.extra.0",
        "value": "senza cipolla",
        "tier": "long"
    });
    let response = server.post("/cache").json(&request).await;

    response.assert_status_ok();
    let result: CachePutResponse = response.json();
    assert!(result.success);
    assert_eq!(result.tier, Some(Tier::Long));
}

#[tokio::test]
async fn test_cache_put_wildcard_key_rejected() {
    let (server, _guard) = create_test_server();

    let request = json!({ "key": "menu.*", "value": 1 });
    let response = server.post("/cache").json(&request).await;

    response.assert_status_bad_request();
    let result: CachePutResponse = response.json();
    assert!(!result.success);
    assert!(result.error.is_some());
}

// =============================================================================
// CACHE GET TESTS
// =============================================================================

#[tokio::test]
async fn test_cache_get_found() {
    let (server, _guard) = create_populated_test_server();

    let response = server.get("/cache/config").await;

    response.assert_status_ok();
    let result: CacheValueResponse = response.json();
    assert!(result.success);
    assert!(result.found);
    assert_eq!(result.key, "config");
    assert_eq!(result.tier, Some(Tier::Long));
    assert_eq!(result.value, Some(json!({"theme": "dark"})));
}

#[tokio::test]
async fn test_cache_get_missing_is_not_an_error() {
    let (server, _guard) = create_test_server();

    let response = server.get("/cache/assente").await;

    response.assert_status_ok();
    let result: CacheValueResponse = response.json();
    assert!(result.success);
    assert!(!result.found);
    assert!(result.tier.is_none());
    assert!(result.value.is_none());
}

#[tokio::test]
async fn test_cache_get_promotes_hot_short_entry() {
    let (server, _guard) = create_test_server();

    let request = json!({ "key": "ordine.7.note.extra.0", "value": "fresco" });
    let response = server.post("/cache").json(&request).await;
    let put: CachePutResponse = response.json();
    assert_eq!(put.tier, Some(Tier::Short));

    // Nine reads stay below the promotion threshold of ten
    for i in 1..=9 {
        let response = server.get("/cache/ordine.7.note.extra.0").await;
        let result: CacheValueResponse = response.json();
        assert!(result.found);
        assert_eq!(result.tier, Some(Tier::Short), "read {} should stay Short", i);
    }

    // The tenth read crosses the threshold and the promotion is visible
    let response = server.get("/cache/ordine.7.note.extra.0").await;
    let result: CacheValueResponse = response.json();
    assert!(result.found);
    assert_eq!(result.tier, Some(Tier::Medium));
    assert_eq!(result.value, Some(json!("fresco")));
}

// =============================================================================
// CACHE DELETE TESTS
// =============================================================================

#[tokio::test]
async fn test_cache_delete_long_is_soft() {
    let (server, _guard) = create_populated_test_server();

    let response = server.delete("/cache/config").await;
    response.assert_status_ok();
    let result: CacheDeleteResponse = response.json();
    assert!(result.success);

    // The tombstone stays in Long: the miss still reports the tier
    let response = server.get("/cache/config").await;
    response.assert_status_ok();
    let result: CacheValueResponse = response.json();
    assert!(result.success);
    assert!(!result.found);
    assert_eq!(result.tier, Some(Tier::Long));
    assert!(result.value.is_none());

    // Occupancy still counts the tombstone
    let response = server.get("/cache/stats").await;
    let stats: CacheStats = response.json();
    assert_eq!(stats.long_count, 1);
}

#[tokio::test]
async fn test_cache_delete_medium_is_hard() {
    let (server, _guard) = create_populated_test_server();

    let response = server.delete("/cache/menu.pizza.margherita").await;
    response.assert_status_ok();

    // Gone without trace
    let response = server.get("/cache/menu.pizza.margherita").await;
    let result: CacheValueResponse = response.json();
    assert!(!result.found);
    assert!(result.tier.is_none());
}

#[tokio::test]
async fn test_cache_delete_unknown_key_returns_404() {
    let (server, _guard) = create_test_server();

    let response = server.delete("/cache/assente").await;

    response.assert_status_not_found();
    let result: CacheDeleteResponse = response.json();
    assert!(!result.success);
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_cache_delete_wildcard_key_rejected() {
    let (server, _guard) = create_test_server();

    let response = server.delete("/cache/menu.*").await;

    response.assert_status_bad_request();
    let result: CacheDeleteResponse = response.json();
    assert!(!result.success);
}

// =============================================================================
// CACHE QUERY TESTS
// =============================================================================

#[tokio::test]
async fn test_cache_query_wildcard() {
    let (server, _guard) = create_populated_test_server();

    let request = json!({ "pattern": "menu.pizza.*" });
    let response = server.post("/cache/query").json(&request).await;

    response.assert_status_ok();
    let result: QueryResponse = response.json();
    assert!(result.success);
    assert_eq!(result.count, 1);
    assert_eq!(
        result.results.get("menu.pizza.margherita"),
        Some(&json!({"price": 12}))
    );
}

#[tokio::test]
async fn test_cache_query_excludes_soft_deleted() {
    let (server, _guard) = create_populated_test_server();

    let response = server.delete("/cache/config").await;
    response.assert_status_ok();

    let request = json!({ "pattern": "config" });
    let response = server.post("/cache/query").json(&request).await;

    response.assert_status_ok();
    let result: QueryResponse = response.json();
    assert!(result.success);
    assert_eq!(result.count, 0);
}

// =============================================================================
// TICK AND DEMOTION TESTS
// =============================================================================

#[tokio::test]
async fn test_cache_tick_advances_cycle() {
    let (server, _guard) = create_test_server();

    let response = server.post("/cache/tick").await;
    response.assert_status_ok();
    let result: TickResponse = response.json();
    assert_eq!(result.cycle, 1);
    assert_eq!(result.demoted, 0);

    let response = server.post("/cache/tick").await;
    let result: TickResponse = response.json();
    assert_eq!(result.cycle, 2);
}

#[tokio::test]
async fn test_cache_tick_demotes_idle_medium_entry() {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("WEFT_API_KEY") };

    // Tight demotion window so the test needs only three ticks
    let config = CacheConfig {
        demotion_after_cycles: 2,
        ..CacheConfig::default()
    };
    let mut cache: TieredCache<Value> = TieredCache::with_config(config);
    cache.put("menu.pizza.margherita", json!({"price": 12}));

    let state = AppState::new(Graph::new(), cache);
    let router = create_router(state);
    let server = TestServer::new(router).unwrap();
    let _guard = TestGuard { _guard: guard };

    // Inactivity must strictly exceed the window
    for expected_cycle in 1..=2 {
        let response = server.post("/cache/tick").await;
        let result: TickResponse = response.json();
        assert_eq!(result.cycle, expected_cycle);
        assert_eq!(result.demoted, 0);
    }

    let response = server.post("/cache/tick").await;
    let result: TickResponse = response.json();
    assert_eq!(result.cycle, 3);
    assert_eq!(result.demoted, 1);

    // The entry survives in Short with its value intact
    let response = server.get("/cache/menu.pizza.margherita").await;
    let value: CacheValueResponse = response.json();
    assert!(value.found);
    assert_eq!(value.tier, Some(Tier::Short));
}

// =============================================================================
// STATS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_cache_stats() {
    let (server, _guard) = create_populated_test_server();

    let response = server.get("/cache/stats").await;

    response.assert_status_ok();
    let stats: CacheStats = response.json();
    assert_eq!(stats.long_count, 1);
    assert_eq!(stats.medium_count, 1);
    assert_eq!(stats.short_count, 0);
    assert_eq!(stats.cycle, 0);
    assert_eq!(stats.long_keys_sample, vec!["config"]);
    assert_eq!(stats.medium_hot.len(), 1);
    assert_eq!(stats.medium_hot[0].key, "menu.pizza.margherita");
}

// =============================================================================
// HISTORY ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_cache_history_records_puts_and_gets() {
    let (server, _guard) = create_test_server();

    let request = json!({ "key": "config", "value": 1 });
    server.post("/cache").json(&request).await;
    server.get("/cache/config").await;

    let response = server.get("/cache/history").await;

    response.assert_status_ok();
    let result: HistoryResponse = response.json();
    assert_eq!(result.count, 2);
    assert_eq!(result.keys, vec!["config", "config"]);
}

#[tokio::test]
async fn test_cache_history_limit_keeps_most_recent() {
    let (server, _guard) = create_test_server();

    server.post("/cache").json(&json!({ "key": "a", "value": 1 })).await;
    server.post("/cache").json(&json!({ "key": "b", "value": 2 })).await;
    server.post("/cache").json(&json!({ "key": "c", "value": 3 })).await;

    let response = server.get("/cache/history?n=2").await;

    response.assert_status_ok();
    let result: HistoryResponse = response.json();
    assert_eq!(result.count, 2);
    // Oldest first, truncated from the front
    assert_eq!(result.keys, vec!["b", "c"]);
}

// =============================================================================
// CORS TESTS
// =============================================================================

#[tokio::test]
async fn test_cors_headers_present() {
    let (server, _guard) = create_test_server();

    // Simple request to verify CORS layer doesn't block
    let response = server.get("/health").await;
    response.assert_status_ok();
}

// =============================================================================
// ERROR HANDLING TESTS
// =============================================================================

#[tokio::test]
async fn test_404_on_unknown_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/unknown").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_method_not_allowed() {
    let (server, _guard) = create_test_server();

    // /health is GET only
    let response = server.post("/health").await;
    // axum returns 405 Method Not Allowed
    assert_eq!(response.status_code().as_u16(), 405);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/fact")
        .bytes(bytes::Bytes::from("not valid json"))
        .content_type("application/json")
        .await;

    // Should return 4xx error for invalid JSON
    assert!(response.status_code().is_client_error());
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

/// Create a test server with authentication enabled.
/// Must be called while holding AUTH_TEST_MUTEX.
fn create_auth_test_server(api_key: &str) -> TestServer {
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("WEFT_API_KEY", api_key) };
    let state = AppState::new(Graph::new(), TieredCache::new());
    let router = create_router(state);
    TestServer::new(router).unwrap()
}

/// Clean up auth env var after test.
fn cleanup_auth_env() {
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("WEFT_API_KEY") };
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;

    cleanup_auth_env();

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.fact_count, 0);
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "test-raw-key-67890";
    let server = create_auth_test_server(api_key);

    // Test raw token format (without "Bearer " prefix)
    let response = server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            api_key.parse::<HeaderValue>().unwrap(),
        )
        .await;

    cleanup_auth_env();

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "correct-key";
    let server = create_auth_test_server(api_key);

    let response = server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;

    cleanup_auth_env();

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Invalid token should return 401 Unauthorized"
    );
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "required-key";
    let server = create_auth_test_server(api_key);

    // Request without Authorization header
    let response = server.get("/status").await;

    cleanup_auth_env();

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Missing Authorization header should return 401 Unauthorized"
    );
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "secret-key-for-bypass-test";
    let server = create_auth_test_server(api_key);

    // /health should be accessible without authentication
    let response = server.get("/health").await;

    cleanup_auth_env();

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn test_auth_empty_key_rejected() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "non-empty-key";
    let server = create_auth_test_server(api_key);

    // Empty authorization header should be rejected
    let response = server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "".parse::<HeaderValue>().unwrap(),
        )
        .await;

    cleanup_auth_env();

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Empty Authorization header should return 401 Unauthorized"
    );
}

#[tokio::test]
async fn test_auth_bearer_prefix_only_rejected() {
    let _guard = AUTH_TEST_MUTEX.lock().unwrap();
    let api_key = "actual-key";
    let server = create_auth_test_server(api_key);

    // "Bearer " with no key should be rejected
    let response = server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer ".parse::<HeaderValue>().unwrap(),
        )
        .await;

    cleanup_auth_env();

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Bearer prefix with no key should return 401 Unauthorized"
    );
}
