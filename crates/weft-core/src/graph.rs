//! # Fact Graph
//!
//! The reactive dependency graph for Weft CORE.
//!
//! Facts are named nodes holding opaque caller values. `Base` facts are
//! written with `set`; `Derived` facts declare dependencies and a compute
//! function, and recompute lazily: a write marks dependents dirty (one hop,
//! never transitive) and the next `read` of a dirty node recomputes and
//! memoizes it. Dependencies may be exact names or wildcard patterns that
//! also cover nodes created later.
//!
//! All storage uses `BTreeMap`/`BTreeSet` for deterministic ordering, and
//! every effect (marking, listeners, jumps) runs in deterministic order.
//!
//! The graph is single-threaded by construction: every mutating operation
//! takes `&mut self`, and compute functions receive the graph again, so they
//! may read and query reentrantly but a reentrant `set` is rejected.

use crate::path;
use crate::types::{NodeKind, WeftError};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// CALLBACK TYPES
// =============================================================================

/// Compute function of a derived fact.
///
/// Receives the graph so it can reentrantly `read` and `query` its inputs.
/// Shared via `Arc` so recomputation can run while the node table is
/// mutated; `Send + Sync` so a graph can live behind a server's lock.
type ComputeFn<V> = Arc<dyn Fn(&mut Graph<V>) -> V + Send + Sync>;

/// Exact-name change listener: `(old, new)`. Old is `None` on first write.
type ChangeListener<V> = Box<dyn FnMut(Option<&V>, &V) + Send + Sync>;

/// Jump listener: receives the name of the node that changed.
type JumpListener = Box<dyn FnMut(&str) + Send + Sync>;

// =============================================================================
// NODE
// =============================================================================

/// A single fact. Not exposed: callers interact through names and values.
struct Node<V> {
    /// Immutable identity, equal to the node's key in the table.
    name: String,
    /// `None` only between registration and first compute.
    value: Option<V>,
    kind: NodeKind,
    /// Present iff `kind` is `Derived`.
    compute: Option<ComputeFn<V>>,
    /// Declared dependency specifiers, in declaration order.
    dependencies: Vec<String>,
    /// Reverse edges: derived facts that declared an exact dependency on us.
    dependents: BTreeSet<String>,
    /// Derived only. Initially true: derived facts start unevaluated.
    dirty: bool,
    /// Opaque targets notified (with our name) whenever this node changes.
    jump_targets: Vec<String>,
}

impl<V> Node<V> {
    fn base(name: &str, value: Option<V>, jump_targets: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            value,
            kind: NodeKind::Base,
            compute: None,
            dependencies: Vec::new(),
            dependents: BTreeSet::new(),
            dirty: false,
            jump_targets,
        }
    }

    fn derived(
        name: &str,
        compute: ComputeFn<V>,
        dependencies: Vec<String>,
        jump_targets: Vec<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            kind: NodeKind::Derived,
            compute: Some(compute),
            dependencies,
            dependents: BTreeSet::new(),
            dirty: true,
            jump_targets,
        }
    }
}

// =============================================================================
// GRAPH
// =============================================================================

/// The reactive fact graph.
///
/// Generic over the caller's value type; the graph never inspects values
/// beyond `PartialEq` (equal writes are suppressed) and `Clone` (reads
/// return owned values).
pub struct Graph<V> {
    /// Fact storage: name -> node.
    nodes: BTreeMap<String, Node<V>>,

    /// Pattern dependency table: pattern -> derived facts subscribed to it.
    /// Matched dynamically against the written name on every propagation.
    pattern_deps: BTreeMap<String, BTreeSet<String>>,

    /// Exact-name change listeners, in registration order per name.
    listeners: BTreeMap<String, Vec<ChangeListener<V>>>,

    /// Jump listeners keyed by opaque target id.
    jump_listeners: BTreeMap<String, Vec<JumpListener>>,

    /// True while a `BatchScope` is alive; propagation is deferred.
    batching: bool,

    /// Names written during the current batch. A set: N writes to one name
    /// propagate once.
    pending: BTreeSet<String>,

    /// Recursion depth of active compute functions; nonzero rejects `set`.
    compute_depth: u32,
}

impl<V: Clone + PartialEq> Graph<V> {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            pattern_deps: BTreeMap::new(),
            listeners: BTreeMap::new(),
            jump_listeners: BTreeMap::new(),
            batching: false,
            pending: BTreeSet::new(),
            compute_depth: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Register a Base fact, invoking `init` once immediately to seed it.
    ///
    /// Declaration seeds silently: no propagation, no listeners. Re-declaring
    /// an existing Base re-seeds it in place, keeping its reverse edges.
    /// Registering over a Derived fact is a `DuplicateNode` error.
    pub fn base<F>(&mut self, name: &str, init: F) -> Result<(), WeftError>
    where
        F: FnOnce() -> V,
    {
        self.base_with_jumps(name, init, &[])
    }

    /// Register a Base fact that notifies jump targets whenever it changes.
    pub fn base_with_jumps<F>(
        &mut self,
        name: &str,
        init: F,
        jump_targets: &[&str],
    ) -> Result<(), WeftError>
    where
        F: FnOnce() -> V,
    {
        let jumps: Vec<String> = jump_targets.iter().map(|t| (*t).to_string()).collect();
        match self.nodes.entry(name.to_string()) {
            Entry::Occupied(mut occupied) => {
                let node = occupied.get_mut();
                if node.kind == NodeKind::Derived {
                    return Err(WeftError::DuplicateNode(name.to_string()));
                }
                node.value = Some(init());
                node.jump_targets = jumps;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Node::base(name, Some(init()), jumps));
            }
        }
        Ok(())
    }

    /// Register a Derived fact with its dependency specifiers.
    ///
    /// The fact starts dirty and is computed on first read. Exact
    /// dependencies bind only if the dependency already exists at
    /// declaration time; pattern dependencies are matched dynamically
    /// against every future write, including facts created later.
    /// Registering over a Base fact is a `DuplicateNode` error;
    /// re-declaring a Derived fact replaces its compute and dependencies.
    pub fn derived<F>(&mut self, name: &str, deps: &[&str], compute: F) -> Result<(), WeftError>
    where
        F: Fn(&mut Graph<V>) -> V + Send + Sync + 'static,
    {
        self.derived_with_jumps(name, deps, &[], compute)
    }

    /// Register a Derived fact that also notifies jump targets on change.
    pub fn derived_with_jumps<F>(
        &mut self,
        name: &str,
        deps: &[&str],
        jump_targets: &[&str],
        compute: F,
    ) -> Result<(), WeftError>
    where
        F: Fn(&mut Graph<V>) -> V + Send + Sync + 'static,
    {
        let preserved_dependents = match self.nodes.get(name) {
            Some(node) if node.kind == NodeKind::Base => {
                return Err(WeftError::DuplicateNode(name.to_string()));
            }
            Some(node) => {
                let dependents = node.dependents.clone();
                // stale registrations from the previous declaration
                self.unregister_dependencies(name);
                dependents
            }
            None => BTreeSet::new(),
        };

        let dependencies: Vec<String> = deps.iter().map(|d| (*d).to_string()).collect();
        for dep in &dependencies {
            if path::is_pattern(dep) {
                self.pattern_deps
                    .entry(dep.clone())
                    .or_default()
                    .insert(name.to_string());
            } else if let Some(dep_node) = self.nodes.get_mut(dep) {
                dep_node.dependents.insert(name.to_string());
            }
            // exact dependencies on facts that do not exist yet are dropped;
            // use a pattern to bind future facts
        }

        let jumps: Vec<String> = jump_targets.iter().map(|t| (*t).to_string()).collect();
        let mut node = Node::derived(name, Arc::new(compute), dependencies, jumps);
        node.dependents = preserved_dependents;
        self.nodes.insert(name.to_string(), node);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Write a Base fact, creating it implicitly if unknown.
    ///
    /// Writing a value equal to the current one is a complete no-op: no
    /// dirty marking, no jumps, no listeners. Otherwise the write stores the
    /// value, marks direct and pattern dependents dirty (one hop), fires the
    /// node's jump targets, then fires exact-name listeners in registration
    /// order with `(old, new)`.
    ///
    /// Errors: `CannotSetDerived` for derived targets, `ReentrantSet` when
    /// called from inside a compute function.
    pub fn set(&mut self, name: &str, value: V) -> Result<(), WeftError> {
        if self.compute_depth > 0 {
            return Err(WeftError::ReentrantSet(name.to_string()));
        }
        let old = match self.nodes.entry(name.to_string()) {
            Entry::Occupied(mut occupied) => {
                let node = occupied.get_mut();
                if node.kind == NodeKind::Derived {
                    return Err(WeftError::CannotSetDerived(name.to_string()));
                }
                if node.value.as_ref() == Some(&value) {
                    return Ok(());
                }
                node.value.replace(value.clone())
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Node::base(name, Some(value.clone()), Vec::new()));
                None
            }
        };

        if self.batching {
            self.pending.insert(name.to_string());
        } else {
            self.mark_dependents(name);
            self.fire_jumps(name);
        }
        self.notify_listeners(name, old.as_ref(), &value);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Read a fact's current value. `None` for unknown names.
    ///
    /// A dirty Derived fact recomputes here: its compute function runs with
    /// access to the graph, the result is memoized, and the fact's own
    /// dependents are marked dirty in turn (the one-hop rule heals multi-hop
    /// chains read by read). Jumps and listeners do not fire on recompute;
    /// they are write-time effects.
    #[must_use]
    pub fn read(&mut self, name: &str) -> Option<V> {
        let needs_compute = match self.nodes.get(name) {
            Some(node) => node.kind == NodeKind::Derived && node.dirty,
            None => return None,
        };
        if needs_compute {
            let compute = self.nodes.get(name).and_then(|node| node.compute.clone())?;
            self.compute_depth = self.compute_depth.saturating_add(1);
            let value = (*compute)(self);
            self.compute_depth = self.compute_depth.saturating_sub(1);
            if let Some(node) = self.nodes.get_mut(name) {
                node.value = Some(value);
                node.dirty = false;
            }
            self.mark_dependents(name);
        }
        self.nodes.get(name).and_then(|node| node.value.clone())
    }

    /// Current values of every fact matching the pattern.
    ///
    /// Obtained through `read`, so dirty matches recompute. An exact name
    /// used as the pattern matches at most itself.
    #[must_use]
    pub fn query(&mut self, pattern: &str) -> BTreeMap<String, V> {
        let names: Vec<String> = self
            .nodes
            .keys()
            .filter(|name| path::matches(pattern, name))
            .cloned()
            .collect();
        let mut out = BTreeMap::new();
        for name in names {
            if let Some(value) = self.read(&name) {
                out.insert(name, value);
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Listeners and jumps
    // -------------------------------------------------------------------------

    /// Register an exact-name change listener.
    ///
    /// Listeners fire synchronously inside `set`, in registration order,
    /// with `(old, new)`; `old` is `None` when the write created the fact.
    /// Listener panics propagate to the `set` caller.
    pub fn listen<F>(&mut self, name: &str, callback: F)
    where
        F: FnMut(Option<&V>, &V) + Send + Sync + 'static,
    {
        self.listeners
            .entry(name.to_string())
            .or_default()
            .push(Box::new(callback));
    }

    /// Register a jump listener on an opaque target id.
    ///
    /// Fired with the source fact's name whenever a fact carrying this
    /// target among its jump targets changes, or on explicit `notify_jump`.
    pub fn listen_jump<F>(&mut self, target: &str, callback: F)
    where
        F: FnMut(&str) + Send + Sync + 'static,
    {
        self.jump_listeners
            .entry(target.to_string())
            .or_default()
            .push(Box::new(callback));
    }

    /// Fire the jump listeners of `target` with an explicit source name.
    pub fn notify_jump(&mut self, target: &str, source: &str) {
        if let Some(callbacks) = self.jump_listeners.get_mut(target) {
            for callback in callbacks.iter_mut() {
                callback(source);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Batching
    // -------------------------------------------------------------------------

    /// Open a batch scope: writes apply immediately but propagation and
    /// jumps are deferred until the scope drops, then run exactly once per
    /// distinct written name. Listeners still fire per write.
    ///
    /// The scope exclusively borrows the graph, so batches cannot nest and
    /// the deferred propagation cannot be skipped by early returns.
    pub fn batch(&mut self) -> BatchScope<'_, V> {
        self.batching = true;
        BatchScope { graph: self }
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    /// Dependency introspection: every fact name mapped to the facts that
    /// declared an exact dependency on it, sorted.
    #[must_use]
    pub fn edges(&self) -> BTreeMap<String, Vec<String>> {
        self.nodes
            .values()
            .map(|node| {
                (
                    node.name.clone(),
                    node.dependents.iter().cloned().collect(),
                )
            })
            .collect()
    }

    /// Declared dependency specifiers of a fact, in declaration order.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> Option<&[String]> {
        self.nodes.get(name).map(|node| node.dependencies.as_slice())
    }

    /// Whether a fact is registered under this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Kind of the named fact, if registered.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<NodeKind> {
        self.nodes.get(name).map(|node| node.kind)
    }

    /// Dirty flag of the named fact, if registered. Base facts are never
    /// dirty. Does not trigger recomputation.
    #[must_use]
    pub fn is_dirty(&self, name: &str) -> Option<bool> {
        self.nodes.get(name).map(|node| node.dirty)
    }

    /// Total number of registered facts.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of Base facts.
    #[must_use]
    pub fn base_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| node.kind == NodeKind::Base)
            .count()
    }

    /// Number of Derived facts.
    #[must_use]
    pub fn derived_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| node.kind == NodeKind::Derived)
            .count()
    }

    /// Number of facts currently marked dirty.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.nodes.values().filter(|node| node.dirty).count()
    }

    // -------------------------------------------------------------------------
    // Internal propagation
    // -------------------------------------------------------------------------

    /// Mark the direct and pattern dependents of `name` dirty. One hop:
    /// marked facts do not propagate further until they recompute.
    fn mark_dependents(&mut self, name: &str) {
        let mut targets: Vec<String> = self
            .nodes
            .get(name)
            .map(|node| node.dependents.iter().cloned().collect())
            .unwrap_or_default();
        for (pattern, subscribers) in &self.pattern_deps {
            if path::matches(pattern, name) {
                targets.extend(subscribers.iter().cloned());
            }
        }
        for target in targets {
            self.mark_dirty(&target);
        }
    }

    fn mark_dirty(&mut self, name: &str) {
        if let Some(node) = self.nodes.get_mut(name) {
            if node.kind == NodeKind::Derived {
                node.dirty = true;
            }
        }
    }

    fn fire_jumps(&mut self, name: &str) {
        let targets = self
            .nodes
            .get(name)
            .map(|node| node.jump_targets.clone())
            .unwrap_or_default();
        for target in targets {
            self.notify_jump(&target, name);
        }
    }

    fn notify_listeners(&mut self, name: &str, old: Option<&V>, new: &V) {
        if let Some(callbacks) = self.listeners.get_mut(name) {
            for callback in callbacks.iter_mut() {
                callback(old, new);
            }
        }
    }

    /// Remove every dependency registration made by a previous declaration
    /// of `name`, both exact reverse edges and pattern subscriptions.
    fn unregister_dependencies(&mut self, name: &str) {
        for node in self.nodes.values_mut() {
            node.dependents.remove(name);
        }
        self.pattern_deps.retain(|_, subscribers| {
            subscribers.remove(name);
            !subscribers.is_empty()
        });
    }
}

impl<V: Clone + PartialEq> Default for Graph<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Graph<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("patterns", &self.pattern_deps.len())
            .field("batching", &self.batching)
            .finish()
    }
}

// =============================================================================
// BATCH SCOPE
// =============================================================================

/// RAII batch over a graph: see [`Graph::batch`].
///
/// Dropping the scope releases the batch: pending names propagate (dirty
/// marking plus jumps) exactly once each, in name order. Drop runs on every
/// exit path, so early returns cannot leave propagation suspended.
pub struct BatchScope<'g, V: Clone + PartialEq> {
    graph: &'g mut Graph<V>,
}

impl<V: Clone + PartialEq> BatchScope<'_, V> {
    /// Write a Base fact inside the batch. Identical to [`Graph::set`]
    /// except that propagation and jumps are deferred to scope drop.
    pub fn set(&mut self, name: &str, value: V) -> Result<(), WeftError> {
        self.graph.set(name, value)
    }
}

impl<V: Clone + PartialEq> Drop for BatchScope<'_, V> {
    fn drop(&mut self) {
        self.graph.batching = false;
        let pending = std::mem::take(&mut self.graph.pending);
        for name in &pending {
            self.graph.mark_dependents(name);
            self.graph.fire_jumps(name);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
