//! # Innate Primitives
//!
//! Hardcoded runtime constants for the Weft CORE.
//!
//! Weft starts with zero data but fixed tuning. These primitives are
//! compiled into the binary and are immutable at runtime; the cache accepts
//! per-instance overrides through `CacheConfig`, with these as defaults.
//!
//! ## Primitives
//!
//! 1. **Classification Primitive**: Maps key depth to an initial tier.
//! 2. **Retention Primitive**: Bounds each tier and the touch history.
//! 3. **Migration Primitive**: Thresholds for promotion and demotion.

/// Maximum key depth classified into the Long tier.
///
/// - Depth is the number of `.` separators in a key.
/// - `"config"` (depth 0) and `"user.name"` (depth 1) start in Long.
pub const LONG_MAX_DEPTH: usize = 1;

/// Maximum key depth classified into the Medium tier.
///
/// Keys deeper than this start in Short.
pub const MEDIUM_MAX_DEPTH: usize = 3;

/// Default capacity of the Short tier.
///
/// While above capacity, the oldest-inserted entry is evicted (FIFO).
pub const SHORT_CAPACITY: usize = 1000;

/// Default capacity of the Medium tier.
///
/// While above capacity, the entry with the lowest access count is evicted.
pub const MEDIUM_CAPACITY: usize = 500;

/// Default access count at which a Short entry is promoted to Medium.
///
/// Promotion is evaluated on hits and moves at most one tier per hit.
pub const PROMOTE_TO_MEDIUM_THRESHOLD: u64 = 10;

/// Default access count at which a Medium entry is promoted to Long.
pub const PROMOTE_TO_LONG_THRESHOLD: u64 = 100;

/// Default number of maintenance cycles a Medium entry may sit unaccessed
/// before a tick demotes it to Short.
///
/// Demotion resets the access count; the entry re-earns its tier.
pub const DEMOTION_AFTER_CYCLES: u64 = 50;

/// Default bound of the touch history buffer.
///
/// The history records written and read keys, oldest first; exceeding the
/// bound drops the oldest records.
pub const HISTORY_CAPACITY: usize = 100;

/// Scale of fixed-point context weights.
///
/// `context_weight_millionths` returns `WEIGHT_SCALE / (depth + 1)`, so a
/// root key weighs exactly `WEIGHT_SCALE` and deeper keys weigh less.
pub const WEIGHT_SCALE: u64 = 1_000_000;

/// Number of Long-tier keys sampled into `CacheStats`.
pub const STATS_LONG_KEY_SAMPLE: usize = 10;

/// Number of hottest Medium-tier entries sampled into `CacheStats`.
pub const STATS_HOT_SAMPLE: usize = 5;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for fact names and cache keys.
///
/// Names longer than this are rejected at the application boundary.
/// This prevents memory exhaustion from malicious or malformed input.
/// The core itself accepts any string.
pub const MAX_NAME_LENGTH: usize = 256;

/// Maximum number of segments in a fact name or cache key.
///
/// Names with more segments are rejected at the application boundary.
pub const MAX_SEGMENTS: usize = 32;

/// Maximum number of operations in a single script execution.
///
/// Scripts longer than this are rejected to prevent DoS.
pub const MAX_SCRIPT_OPS: usize = 10000;
