//! # Core Type Definitions
//!
//! This module contains the shared types for the Weft deterministic state
//! substrate:
//! - Node classification for the fact graph (`NodeKind`)
//! - Tier classification for the cache (`Tier`)
//! - Error types (`WeftError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Carry no interior mutability and no clocks

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::primitives::{LONG_MAX_DEPTH, MEDIUM_MAX_DEPTH};

// =============================================================================
// NODE KIND
// =============================================================================

/// Classification of a fact graph node.
///
/// A `Base` fact holds a caller-written value and is the only kind of node
/// that `set` may target. A `Derived` fact holds a memoized value produced
/// by its compute function and is recomputed lazily when read while dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Directly written fact.
    Base,
    /// Computed fact with declared dependencies.
    Derived,
}

impl NodeKind {
    /// Stable lowercase name, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Derived => "derived",
        }
    }
}

// =============================================================================
// CACHE TIER
// =============================================================================

/// Retention tier of a cache entry.
///
/// `Long` is unbounded and never evicts or demotes. `Medium` is bounded and
/// evicts by lowest access count. `Short` is bounded and evicts by insertion
/// order (FIFO).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Unbounded retention, soft deletes only.
    Long,
    /// Bounded, frequency-ranked retention.
    Medium,
    /// Bounded, insertion-ordered retention.
    Short,
}

impl Tier {
    /// Classify a key depth into its initial tier.
    ///
    /// Depth is the number of `.` separators in the key: shallow keys are
    /// structural/config-like and start in `Long`, mid-depth keys start in
    /// `Medium`, deep keys start in `Short`.
    #[must_use]
    pub const fn classify_depth(depth: usize) -> Self {
        if depth <= LONG_MAX_DEPTH {
            Self::Long
        } else if depth <= MEDIUM_MAX_DEPTH {
            Self::Medium
        } else {
            Self::Short
        }
    }

    /// Stable lowercase name, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Medium => "medium",
            Self::Short => "short",
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Weft system.
///
/// - No silent failures
/// - Use `Result<T, WeftError>` for fallible operations
/// - Lookup misses are `None` results, never errors
/// - Rejected mutations leave state untouched
#[derive(Debug, Error)]
pub enum WeftError {
    /// A node name is already registered with the other kind.
    #[error("Node already registered with a different kind: {0}")]
    DuplicateNode(String),

    /// `set` targeted a derived fact; derived values come from compute only.
    #[error("Cannot set derived fact: {0}")]
    CannotSetDerived(String),

    /// `set` was invoked from inside a compute function.
    #[error("Reentrant set from inside a compute function: {0}")]
    ReentrantSet(String),

    /// `delete` targeted a key not present in any tier.
    #[error("Cannot delete unknown key: {0}")]
    UnknownKeyOnDelete(String),

    /// A name or key was rejected at the application boundary.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// An I/O error occurred (application layer only; the core does no I/O).
    #[error("I/O error: {0}")]
    IoError(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// TESTS
// =============================================================================
