//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API, plus the
//! boundary validation for fact names and cache keys. The core accepts any
//! string; length and segment limits are enforced here.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use weft_core::{
    NodeKind, Tier, WeftError,
    path,
    primitives::{MAX_NAME_LENGTH, MAX_SEGMENTS},
};

// =============================================================================
// NAME VALIDATION
// =============================================================================

/// Validate a concrete fact name or cache key.
///
/// Rejects empty names, names longer than `MAX_NAME_LENGTH` bytes, names
/// with more than `MAX_SEGMENTS` segments, and names containing wildcards
/// (a concrete name never contains `*`). This runs at the API boundary,
/// before input reaches the core.
pub fn validate_name(name: &str) -> Result<(), WeftError> {
    validate_pattern(name)?;
    if path::is_pattern(name) {
        return Err(WeftError::InvalidName(format!(
            "wildcard in concrete name: {name}"
        )));
    }
    Ok(())
}

/// Validate a query pattern.
///
/// Same limits as `validate_name`, but wildcards are allowed.
pub fn validate_pattern(pattern: &str) -> Result<(), WeftError> {
    if pattern.is_empty() {
        return Err(WeftError::InvalidName("empty name".to_string()));
    }
    if pattern.len() > MAX_NAME_LENGTH {
        return Err(WeftError::InvalidName(format!(
            "length {} exceeds maximum {} bytes",
            pattern.len(),
            MAX_NAME_LENGTH
        )));
    }
    let segment_count = path::segment_count(pattern);
    if segment_count > MAX_SEGMENTS {
        return Err(WeftError::InvalidName(format!(
            "{} segments exceed maximum {}",
            segment_count, MAX_SEGMENTS
        )));
    }
    Ok(())
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Combined graph and cache occupancy response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub fact_count: usize,
    pub base_count: usize,
    pub derived_count: usize,
    pub dirty_count: usize,
    pub long_count: usize,
    pub medium_count: usize,
    pub short_count: usize,
    pub cycle: u64,
}

// =============================================================================
// FACT REQUEST/RESPONSE
// =============================================================================

/// Base fact write request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetFactRequest {
    pub name: String,
    pub value: Value,
}

/// Base fact write response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetFactResponse {
    pub success: bool,
    /// True when the write created the fact, false when it updated one.
    pub created: Option<bool>,
    pub error: Option<String>,
}

impl SetFactResponse {
    pub fn success(created: bool) -> Self {
        Self {
            success: true,
            created: Some(created),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            created: None,
            error: Some(msg.into()),
        }
    }
}

/// Fact read response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactResponse {
    pub success: bool,
    pub name: String,
    pub found: bool,
    pub kind: Option<NodeKind>,
    pub value: Option<Value>,
    pub error: Option<String>,
}

impl FactResponse {
    pub fn found(name: impl Into<String>, kind: NodeKind, value: Value) -> Self {
        Self {
            success: true,
            name: name.into(),
            found: true,
            kind: Some(kind),
            value: Some(value),
            error: None,
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self {
            success: true,
            name: name.into(),
            found: false,
            kind: None,
            value: None,
            error: None,
        }
    }

    pub fn error(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            success: false,
            name: name.into(),
            found: false,
            kind: None,
            value: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// QUERY REQUEST/RESPONSE
// =============================================================================

/// Pattern query request, shared by the fact and cache query endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub pattern: String,
}

/// Pattern query response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub count: usize,
    pub results: BTreeMap<String, Value>,
    pub error: Option<String>,
}

impl QueryResponse {
    pub fn success(results: BTreeMap<String, Value>) -> Self {
        Self {
            success: true,
            count: results.len(),
            results,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            results: BTreeMap::new(),
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// EDGES RESPONSE
// =============================================================================

/// Dependency introspection response: fact name -> exact dependents, sorted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgesResponse {
    pub edges: BTreeMap<String, Vec<String>>,
}

// =============================================================================
// CACHE REQUEST/RESPONSE
// =============================================================================

/// Cache write request. `tier` overrides the depth classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePutRequest {
    pub key: String,
    pub value: Value,
    pub tier: Option<Tier>,
}

/// Cache write response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePutResponse {
    pub success: bool,
    /// Tier the entry landed in.
    pub tier: Option<Tier>,
    pub error: Option<String>,
}

impl CachePutResponse {
    pub fn success(tier: Tier) -> Self {
        Self {
            success: true,
            tier: Some(tier),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            tier: None,
            error: Some(msg.into()),
        }
    }
}

/// Cache read response.
///
/// A soft-deleted Long entry reports `found: false` with its tier still
/// attached, distinguishing "seen then removed" from "never seen".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheValueResponse {
    pub success: bool,
    pub key: String,
    pub found: bool,
    pub tier: Option<Tier>,
    pub value: Option<Value>,
    pub error: Option<String>,
}

impl CacheValueResponse {
    pub fn found(key: impl Into<String>, tier: Option<Tier>, value: Value) -> Self {
        Self {
            success: true,
            key: key.into(),
            found: true,
            tier,
            value: Some(value),
            error: None,
        }
    }

    pub fn not_found(key: impl Into<String>, tier: Option<Tier>) -> Self {
        Self {
            success: true,
            key: key.into(),
            found: false,
            tier,
            value: None,
            error: None,
        }
    }

    pub fn error(key: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            success: false,
            key: key.into(),
            found: false,
            tier: None,
            value: None,
            error: Some(msg.into()),
        }
    }
}

/// Cache delete response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheDeleteResponse {
    pub success: bool,
    pub error: Option<String>,
}

impl CacheDeleteResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// MAINTENANCE RESPONSES
// =============================================================================

/// Maintenance tick response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickResponse {
    /// Cycle counter after the tick.
    pub cycle: u64,
    /// Number of Medium entries demoted to Short by this tick.
    pub demoted: usize,
}

/// Query parameters of the history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryParams {
    /// Number of most recent keys to return; defaults to the full buffer.
    pub n: Option<usize>,
}

/// Touch history response, oldest key first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub keys: Vec<String>,
}
