//! # weft-core
//!
//! The deterministic state engine for Weft - THE LOGIC.
//!
//! This crate implements the CORE substrate - an in-process,
//! dependency-aware state layer made of two structures:
//!
//! - a reactive **fact graph**: named facts, lazy derived values, one-hop
//!   dirty propagation, wildcard dependencies, batched writes, listeners
//! - a **tiered cache**: depth-classified entries migrating between Long,
//!   Medium and Short retention by access frequency and inactivity
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is the ONLY place where state lives (the app shell is stateless glue)
//! - Is single-threaded and synchronous; callers wrap it for sharing
//! - Does NO I/O and holds NO clocks; time is the caller's tick
//! - Uses `BTreeMap`/`BTreeSet` ordering everywhere: identical operation
//!   sequences produce identical states, byte for byte

// =============================================================================
// MODULES
// =============================================================================

pub mod cache;
pub mod graph;
pub mod path;
pub mod primitives;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{NodeKind, Tier, WeftError};

// =============================================================================
// RE-EXPORTS: Fact Graph
// =============================================================================

pub use graph::{BatchScope, Graph};

// =============================================================================
// RE-EXPORTS: Tiered Cache
// =============================================================================

pub use cache::{CacheConfig, CacheStats, HotEntry, TieredCache};
