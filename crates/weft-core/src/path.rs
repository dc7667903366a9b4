//! # Path Primitives
//!
//! Structure rules for fact names and cache keys.
//!
//! Names are dot-separated paths (`"table.4.state"`). Both the graph and the
//! cache lean on the same three structural reads: segment decomposition,
//! depth, and wildcard matching. All of it is pure string work with no
//! allocation beyond the caller's inputs.
//!
//! ## Wildcard Rule
//!
//! A specifier is a pattern iff it contains `*`. A `*` segment matches
//! exactly one arbitrary non-empty segment and never spans a dot, so
//! `"table.*.state"` matches `"table.4.state"` but not `"table.state"` and
//! not `"table.4.north.state"`. Non-wildcard segments compare byte-for-byte.

use crate::primitives::WEIGHT_SCALE;

/// The wildcard segment.
pub const WILDCARD: &str = "*";

/// Iterate the dot-separated segments of a path.
///
/// An empty path yields one empty segment, mirroring `str::split`.
pub fn segments(path: &str) -> std::str::Split<'_, char> {
    path.split('.')
}

/// Number of segments in a path.
#[must_use]
pub fn segment_count(path: &str) -> usize {
    segments(path).count()
}

/// Depth of a path: the number of `.` separators.
///
/// `"config"` has depth 0, `"table.4.state"` has depth 2.
#[must_use]
pub fn depth(path: &str) -> usize {
    path.matches('.').count()
}

/// Whether a specifier is a wildcard pattern.
///
/// Exact names never contain `*`; any occurrence makes the specifier a
/// pattern (a `*` embedded inside a segment still only matches literally).
#[must_use]
pub fn is_pattern(specifier: &str) -> bool {
    specifier.contains('*')
}

/// Match a pattern against a concrete name.
///
/// The two match iff they have the same number of segments and every
/// non-wildcard pattern segment equals the corresponding name segment.
/// A `*` pattern segment accepts any single non-empty segment. An exact
/// name used as a pattern therefore matches only itself.
#[must_use]
pub fn matches(pattern: &str, name: &str) -> bool {
    if segment_count(pattern) != segment_count(name) {
        return false;
    }
    segments(pattern)
        .zip(segments(name))
        .all(|(p, s)| if p == WILDCARD { !s.is_empty() } else { p == s })
}

/// Fixed-point context weight of a key: `WEIGHT_SCALE / (depth + 1)`.
///
/// Shallow keys weigh more. The scale is millionths, so a root key weighs
/// 1,000,000 and each level of nesting divides the weight. Integer division
/// keeps the ranking deterministic.
#[must_use]
pub fn context_weight_millionths(key: &str) -> u64 {
    WEIGHT_SCALE / (depth(key) as u64 + 1)
}

// =============================================================================
// TESTS
// =============================================================================
