// src/dag/registry.rs

//! Per-run registry of reached nodes, keyed by id.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::dag::graph::Graph;
use crate::dag::node::{Node, NodeIndex, ResultSlot};
use crate::dag::result::{NodeResult, Outcome};
use crate::dag::state::NodeState;

/// Shared `id -> node` map populated as the run reaches nodes.
///
/// The only write is idempotent keyed insertion, so the concurrent map needs
/// no extra locking. Work units receive a clone to read peers' results.
#[derive(Clone)]
pub struct Registry {
    graph: Arc<Graph>,
    seen: Arc<DashMap<String, NodeIndex>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("registered", &self.seen.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    pub fn new(graph: Arc<Graph>) -> Self {
        Self {
            graph,
            seen: Arc::new(DashMap::new()),
        }
    }

    pub(crate) fn register(&self, node: &Node) {
        if !self.seen.contains_key(node.id()) {
            self.seen.insert(node.id().to_string(), node.index());
            trace!(node = %node.id(), "registered node for this run");
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Ids of every node reached so far, in no particular order.
    pub fn ids(&self) -> Vec<String> {
        self.seen.iter().map(|entry| entry.key().clone()).collect()
    }

    fn node(&self, id: &str) -> Option<&Node> {
        let index = *self.seen.get(id)?;
        self.graph.node(index)
    }

    pub fn state(&self, id: &str) -> Option<NodeState> {
        self.node(id).map(Node::state)
    }

    pub fn outcome(&self, id: &str) -> Option<Outcome> {
        self.node(id).map(Node::outcome)
    }

    /// Typed snapshot of a reached node's result.
    ///
    /// Returns `None` if the node was not reached in this run, or if its
    /// value type is not `V`.
    pub fn result<V: Clone + Send + Sync + 'static>(&self, id: &str) -> Option<NodeResult<V>> {
        let node = self.node(id)?;
        let slot = node.unit().result_any().downcast_ref::<ResultSlot<V>>();
        if slot.is_none() {
            trace!(node = %id, "registry lookup with mismatched value type");
        }
        slot.map(ResultSlot::snapshot)
    }
}
