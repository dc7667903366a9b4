//! # Tiered Cache
//!
//! The frequency-and-structure aware cache for Weft CORE.
//!
//! Entries live in exactly one of three tiers. A key's depth picks its
//! starting tier (shallow keys are assumed structural and start high);
//! access frequency promotes entries one tier per hit, and maintenance
//! ticks demote Medium entries that sat unaccessed for too long. Long is
//! unbounded and uses soft deletes so that "seen then removed" remains
//! distinguishable from "never seen".
//!
//! Time is logical: the only clock is the tick counter, so identical
//! operation sequences always produce identical states. All storage uses
//! `BTreeMap` plus explicit order queues; no hashing, no wall clocks.

use crate::path;
use crate::primitives::{
    DEMOTION_AFTER_CYCLES, HISTORY_CAPACITY, MEDIUM_CAPACITY, PROMOTE_TO_LONG_THRESHOLD,
    PROMOTE_TO_MEDIUM_THRESHOLD, SHORT_CAPACITY, STATS_HOT_SAMPLE, STATS_LONG_KEY_SAMPLE,
};
use crate::types::{Tier, WeftError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

// =============================================================================
// CONFIG
// =============================================================================

/// Tuning knobs of a cache instance.
///
/// Every field has a default from `primitives`, and the serde representation
/// fills missing fields with those defaults, so a TOML fragment may override
/// any subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Short tier bound; above it the oldest-inserted entry is evicted.
    pub short_capacity: usize,
    /// Medium tier bound; above it the least-accessed entry is evicted.
    pub medium_capacity: usize,
    /// Access count promoting Short entries to Medium.
    pub promote_to_medium_threshold: u64,
    /// Access count promoting Medium entries to Long.
    pub promote_to_long_threshold: u64,
    /// Cycles of inactivity after which a tick demotes a Medium entry.
    pub demotion_after_cycles: u64,
    /// Bound of the touch history buffer.
    pub history_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            short_capacity: SHORT_CAPACITY,
            medium_capacity: MEDIUM_CAPACITY,
            promote_to_medium_threshold: PROMOTE_TO_MEDIUM_THRESHOLD,
            promote_to_long_threshold: PROMOTE_TO_LONG_THRESHOLD,
            demotion_after_cycles: DEMOTION_AFTER_CYCLES,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

// =============================================================================
// ENTRY
// =============================================================================

/// A cached record. Not exposed: callers see values and `CacheStats`.
struct CacheEntry<V> {
    /// Immutable identity, equal to the entry's key in its tier map.
    key: String,
    /// `None` marks a soft-deleted Long entry; metadata stays.
    value: Option<V>,
    tier: Tier,
    /// Hits via `get`. Survives promotion, resets on demotion.
    access_count: u64,
    created_at_cycle: u64,
    last_accessed_cycle: u64,
}

// =============================================================================
// STATS
// =============================================================================

/// One row of the hottest-Medium sample in [`CacheStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotEntry {
    pub key: String,
    pub access_count: u64,
    /// Cycles since the entry was created.
    pub age_cycles: u64,
}

/// Snapshot of cache occupancy, taken without side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub long_count: usize,
    pub medium_count: usize,
    pub short_count: usize,
    /// Current maintenance cycle.
    pub cycle: u64,
    /// First `STATS_LONG_KEY_SAMPLE` Long keys, soft-deleted included.
    pub long_keys_sample: Vec<String>,
    /// Top `STATS_HOT_SAMPLE` Medium entries by access count, descending;
    /// ties break on ascending key.
    pub medium_hot: Vec<HotEntry>,
}

// =============================================================================
// TIERED CACHE
// =============================================================================

/// The tiered cache.
///
/// Single-threaded like the graph: mutation goes through `&mut self`.
/// Lookups are tried Long, then Medium, then Short.
pub struct TieredCache<V> {
    config: CacheConfig,
    long: BTreeMap<String, CacheEntry<V>>,
    medium: BTreeMap<String, CacheEntry<V>>,
    short: BTreeMap<String, CacheEntry<V>>,
    /// Short insertion order, front = oldest. Membership mirrors `short`.
    short_order: VecDeque<String>,
    /// Touched keys, oldest first, bounded by `config.history_capacity`.
    history: VecDeque<String>,
    /// Logical clock, advanced only by `tick`.
    cycle: u64,
}

impl<V: Clone> TieredCache<V> {
    /// Create a cache with default tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a cache with explicit tuning.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            long: BTreeMap::new(),
            medium: BTreeMap::new(),
            short: BTreeMap::new(),
            short_order: VecDeque::new(),
            history: VecDeque::new(),
            cycle: 0,
        }
    }

    /// The active tuning.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Current maintenance cycle.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Store a value, classifying the tier from the key's depth.
    ///
    /// Returns the tier the entry landed in.
    pub fn put(&mut self, key: &str, value: V) -> Tier {
        self.put_in(key, value, Tier::classify_depth(path::depth(key)))
    }

    /// Store a value in an explicit tier.
    ///
    /// Any previous entry for the key is removed from its tier first, so a
    /// key never lives in two tiers. The fresh entry starts with access
    /// count zero regardless of the old entry's history.
    pub fn put_in(&mut self, key: &str, value: V, tier: Tier) -> Tier {
        let _ = self.take_entry(key);
        let entry = CacheEntry {
            key: key.to_string(),
            value: Some(value),
            tier,
            access_count: 0,
            created_at_cycle: self.cycle,
            last_accessed_cycle: self.cycle,
        };
        match tier {
            Tier::Long => {
                self.long.insert(key.to_string(), entry);
            }
            Tier::Medium => {
                self.medium.insert(key.to_string(), entry);
                self.evict_medium();
            }
            Tier::Short => {
                self.short.insert(key.to_string(), entry);
                self.short_order.push_back(key.to_string());
                self.evict_short();
            }
        }
        self.record_history(key);
        tier
    }

    /// Delete a key.
    ///
    /// Short and Medium entries are removed structurally. Long entries are
    /// soft-deleted: the value goes away but the record stays, so the key
    /// still appears in stats and `exists` reports false rather than
    /// unknown. Unknown keys are an error.
    pub fn delete(&mut self, key: &str) -> Result<(), WeftError> {
        if let Some(entry) = self.long.get_mut(key) {
            entry.value = None;
            return Ok(());
        }
        if self.medium.remove(key).is_some() {
            return Ok(());
        }
        if self.short.remove(key).is_some() {
            self.short_order.retain(|k| k != key);
            return Ok(());
        }
        Err(WeftError::UnknownKeyOnDelete(key.to_string()))
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Look up a key, counting the access.
    ///
    /// A hit bumps the access count, refreshes the last-access stamp, moves
    /// Short hits to the newest end of the insertion order, then evaluates
    /// promotion: at most one tier per hit, with the access count carried
    /// along. Soft-deleted Long entries hit (the record is touched) but
    /// yield `None`. A miss has no side effects.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let tier = self.tier_of(key)?;
        if tier == Tier::Short {
            self.touch_short(key);
        }
        let cycle = self.cycle;
        let (count, value) = {
            let entry = self.entry_mut(tier, key)?;
            entry.access_count = entry.access_count.saturating_add(1);
            entry.last_accessed_cycle = cycle;
            (entry.access_count, entry.value.clone())
        };
        match tier {
            Tier::Short if count >= self.config.promote_to_medium_threshold => {
                self.migrate(key, Tier::Medium);
            }
            Tier::Medium if count >= self.config.promote_to_long_threshold => {
                self.migrate(key, Tier::Long);
            }
            _ => {}
        }
        self.record_history(key);
        value
    }

    /// Whether a key currently resolves to a live value.
    ///
    /// Shares the lookup path with `get` (a Short hit refreshes recency)
    /// but does not count as an access and leaves no history.
    /// Soft-deleted Long entries report false.
    pub fn exists(&mut self, key: &str) -> bool {
        let Some(tier) = self.tier_of(key) else {
            return false;
        };
        if tier == Tier::Short {
            self.touch_short(key);
        }
        self.entry(tier, key).is_some_and(|entry| entry.value.is_some())
    }

    /// Tier currently holding the key. Pure lookup, no side effects.
    #[must_use]
    pub fn tier_of(&self, key: &str) -> Option<Tier> {
        if self.long.contains_key(key) {
            Some(Tier::Long)
        } else if self.medium.contains_key(key) {
            Some(Tier::Medium)
        } else if self.short.contains_key(key) {
            Some(Tier::Short)
        } else {
            None
        }
    }

    /// Access count of the key's entry, if present. No side effects.
    #[must_use]
    pub fn access_count(&self, key: &str) -> Option<u64> {
        let tier = self.tier_of(key)?;
        self.entry(tier, key).map(|entry| entry.access_count)
    }

    /// Live values of every key matching the pattern, across all tiers.
    ///
    /// Same wildcard rule as the fact graph. Unlike `get`, this has no side
    /// effects: no counting, no recency, no promotion, no history.
    /// Soft-deleted entries are excluded.
    #[must_use]
    pub fn query_pattern(&self, pattern: &str) -> BTreeMap<String, V> {
        let mut out = BTreeMap::new();
        for entry in self
            .long
            .values()
            .chain(self.medium.values())
            .chain(self.short.values())
        {
            if path::matches(pattern, &entry.key) {
                if let Some(value) = &entry.value {
                    out.insert(entry.key.clone(), value.clone());
                }
            }
        }
        out
    }

    /// Ranking weight of a key by structure alone; no storage effect.
    #[must_use]
    pub fn context_weight_millionths(&self, key: &str) -> u64 {
        path::context_weight_millionths(key)
    }

    /// Occupancy snapshot. No side effects.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let long_keys_sample: Vec<String> = self
            .long
            .keys()
            .take(STATS_LONG_KEY_SAMPLE)
            .cloned()
            .collect();
        let mut medium_hot: Vec<HotEntry> = self
            .medium
            .values()
            .map(|entry| HotEntry {
                key: entry.key.clone(),
                access_count: entry.access_count,
                age_cycles: self.cycle.saturating_sub(entry.created_at_cycle),
            })
            .collect();
        medium_hot.sort_by(|a, b| {
            b.access_count
                .cmp(&a.access_count)
                .then_with(|| a.key.cmp(&b.key))
        });
        medium_hot.truncate(STATS_HOT_SAMPLE);
        CacheStats {
            long_count: self.long.len(),
            medium_count: self.medium.len(),
            short_count: self.short.len(),
            cycle: self.cycle,
            long_keys_sample,
            medium_hot,
        }
    }

    /// The last `n` touched keys, oldest first.
    #[must_use]
    pub fn recent_history(&self, n: usize) -> Vec<String> {
        let start = self.history.len().saturating_sub(n);
        self.history.iter().skip(start).cloned().collect()
    }

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------

    /// Advance the logical clock one cycle and apply demotions.
    ///
    /// Every Medium entry whose inactivity strictly exceeds
    /// `demotion_after_cycles` drops to Short with its access count reset
    /// to zero and fresh insertion-order priority (then subject to Short
    /// eviction). Long never demotes. Returns the number of demoted
    /// entries.
    pub fn tick(&mut self) -> usize {
        self.cycle = self.cycle.saturating_add(1);
        let stale: Vec<String> = self
            .medium
            .values()
            .filter(|entry| {
                self.cycle.saturating_sub(entry.last_accessed_cycle)
                    > self.config.demotion_after_cycles
            })
            .map(|entry| entry.key.clone())
            .collect();
        let demoted = stale.len();
        for key in stale {
            if let Some(mut entry) = self.medium.remove(&key) {
                entry.tier = Tier::Short;
                entry.access_count = 0;
                self.short.insert(key.clone(), entry);
                self.short_order.push_back(key);
                self.evict_short();
            }
        }
        demoted
    }

    // -------------------------------------------------------------------------
    // Internal tier plumbing
    // -------------------------------------------------------------------------

    fn entry(&self, tier: Tier, key: &str) -> Option<&CacheEntry<V>> {
        match tier {
            Tier::Long => self.long.get(key),
            Tier::Medium => self.medium.get(key),
            Tier::Short => self.short.get(key),
        }
    }

    fn entry_mut(&mut self, tier: Tier, key: &str) -> Option<&mut CacheEntry<V>> {
        match tier {
            Tier::Long => self.long.get_mut(key),
            Tier::Medium => self.medium.get_mut(key),
            Tier::Short => self.short.get_mut(key),
        }
    }

    /// Remove the key's entry from whichever tier holds it.
    fn take_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        if let Some(entry) = self.long.remove(key) {
            return Some(entry);
        }
        if let Some(entry) = self.medium.remove(key) {
            return Some(entry);
        }
        if let Some(entry) = self.short.remove(key) {
            self.short_order.retain(|k| k != key);
            return Some(entry);
        }
        None
    }

    /// Move an entry to another tier, keeping its counters.
    fn migrate(&mut self, key: &str, to: Tier) {
        let Some(mut entry) = self.take_entry(key) else {
            return;
        };
        entry.tier = to;
        match to {
            Tier::Long => {
                self.long.insert(key.to_string(), entry);
            }
            Tier::Medium => {
                self.medium.insert(key.to_string(), entry);
                self.evict_medium();
            }
            Tier::Short => {
                self.short.insert(key.to_string(), entry);
                self.short_order.push_back(key.to_string());
                self.evict_short();
            }
        }
    }

    /// Move a Short key to the newest end of the insertion order.
    fn touch_short(&mut self, key: &str) {
        if let Some(pos) = self.short_order.iter().position(|k| k == key) {
            if let Some(touched) = self.short_order.remove(pos) {
                self.short_order.push_back(touched);
            }
        }
    }

    fn evict_short(&mut self) {
        while self.short.len() > self.config.short_capacity {
            let Some(oldest) = self.short_order.pop_front() else {
                break;
            };
            self.short.remove(&oldest);
        }
    }

    fn evict_medium(&mut self) {
        while self.medium.len() > self.config.medium_capacity {
            // BTreeMap iterates keys ascending and min_by_key keeps the
            // first minimum, so ties evict the lexicographically smallest
            let victim = self
                .medium
                .values()
                .min_by_key(|entry| entry.access_count)
                .map(|entry| entry.key.clone());
            let Some(victim) = victim else {
                break;
            };
            self.medium.remove(&victim);
        }
    }

    fn record_history(&mut self, key: &str) {
        self.history.push_back(key.to_string());
        while self.history.len() > self.config.history_capacity {
            self.history.pop_front();
        }
    }
}

impl<V: Clone> Default for TieredCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for TieredCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredCache")
            .field("long", &self.long.len())
            .field("medium", &self.medium.len())
            .field("short", &self.short.len())
            .field("cycle", &self.cycle)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
