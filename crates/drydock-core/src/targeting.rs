//! Targeting relationship tables.
//!
//! Targeting is a directed relation: "location L of context A projects onto
//! context B". Each side of the relation is tracked without ownership:
//!
//! - [`TargetTable`] holds a context's outgoing edges, at most one per
//!   [`Location`], each carrying the target's identity and a weak handle to
//!   its state.
//! - [`TargeterTable`] holds the set of contexts currently targeting a
//!   context, keyed by [`ContextId`].
//!
//! Weak handles mean destruction of either side never requires the other to
//! be reachable: a dead entry fails to upgrade and is skipped wherever the
//! tables are observed. Live entries referencing a context that is being
//! dropped are pruned eagerly by the drop itself, so no caller ever sees a
//! half-removed edge.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tenet::{EngineHandle, Location};

use crate::context::{ContextId, ContextState};

/// Shared handle to a context's state.
pub(crate) type SharedContext = Rc<RefCell<ContextState>>;

/// Non-owning handle to a context's state.
pub(crate) type WeakContext = Weak<RefCell<ContextState>>;

/// One outgoing targeting edge.
#[derive(Debug, Clone)]
pub(crate) struct TargetEdge {
    /// Core identity of the target context.
    pub id: ContextId,
    /// Engine identity of the target context.
    pub handle: EngineHandle,
    /// Weak handle to the target's state.
    pub state: WeakContext,
}

impl TargetEdge {
    /// Upgrades to the target's state, if it is still alive.
    pub fn upgrade(&self) -> Option<SharedContext> {
        self.state.upgrade()
    }
}

/// Outgoing targeting edges of one context, at most one per location.
#[derive(Debug, Default)]
pub(crate) struct TargetTable {
    edges: BTreeMap<Location, TargetEdge>,
}

impl TargetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an edge, returning the edge it replaced at that location.
    pub fn insert(&mut self, location: Location, edge: TargetEdge) -> Option<TargetEdge> {
        self.edges.insert(location, edge)
    }

    /// Withdraws the edge at a location.
    pub fn remove(&mut self, location: Location) -> Option<TargetEdge> {
        self.edges.remove(&location)
    }

    /// The edge leaving from a location, if any.
    pub fn get(&self, location: Location) -> Option<&TargetEdge> {
        self.edges.get(&location)
    }

    /// Whether any edge leaves from this location.
    pub fn contains(&self, location: Location) -> bool {
        self.edges.contains_key(&location)
    }

    /// Whether any edge points at the given context.
    pub fn has_edge_to(&self, id: ContextId) -> bool {
        self.edges.values().any(|edge| edge.id == id)
    }

    /// Drops every edge pointing at the given context.
    pub fn remove_edges_to(&mut self, id: ContextId) {
        self.edges.retain(|_, edge| edge.id != id);
    }

    /// Iterates edges in location order.
    pub fn edges(&self) -> impl Iterator<Item = &TargetEdge> + '_ {
        self.edges.values()
    }

    /// Number of outgoing edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }
}

/// The contexts currently targeting one context.
///
/// Entries are keyed by the targeter's identity; the weak handle is the only
/// reference held, so a dead targeter is unobservable rather than dangling.
#[derive(Debug, Default)]
pub(crate) struct TargeterTable {
    inbound: BTreeMap<ContextId, WeakContext>,
}

impl TargeterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a targeter. Re-recording an existing targeter is a no-op
    /// refresh, never a duplicate.
    pub fn insert(&mut self, id: ContextId, state: WeakContext) {
        self.inbound.insert(id, state);
    }

    /// Forgets a targeter. Returns whether it was present.
    pub fn remove(&mut self, id: ContextId) -> bool {
        self.inbound.remove(&id).is_some()
    }

    /// Whether the given context is recorded and still alive.
    pub fn contains_live(&self, id: ContextId) -> bool {
        self.inbound.get(&id).is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Iterates raw entries, dead ones included. Used by context teardown,
    /// which must reach every targeter that might still observe it.
    pub fn entries(&self) -> impl Iterator<Item = &WeakContext> + '_ {
        self.inbound.values()
    }

    /// Identity and engine handle of every live targeter, in id order.
    pub fn live(&self) -> Vec<(ContextId, EngineHandle)> {
        self.inbound
            .iter()
            .filter_map(|(id, weak)| {
                weak.upgrade().map(|state| (*id, state.borrow().handle))
            })
            .collect()
    }

    /// Number of live targeters.
    pub fn live_count(&self) -> usize {
        self.inbound.values().filter(|weak| weak.strong_count() > 0).count()
    }
}
