// src/dag/graph.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::node::{DependencyEdge, Node, NodeIndex, TypedUnit, Unit};
use crate::dag::result::NodeResult;
use crate::dag::state::NodeState;
use crate::dag::work::{Callback, NoopCallback, Work};
use crate::errors::{DagfireError, Result};

/// Everything needed to add one node to a [`GraphBuilder`].
pub struct NodeSpec<P, V> {
    id: String,
    param: P,
    work: Arc<dyn Work<P, V>>,
    callback: Arc<dyn Callback<P, V>>,
    check_downstream: bool,
}

impl<P, V> NodeSpec<P, V>
where
    P: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(id: impl Into<String>, param: P, work: impl Work<P, V> + 'static) -> Self {
        Self::from_shared(id, param, Arc::new(work))
    }

    pub fn from_shared(id: impl Into<String>, param: P, work: Arc<dyn Work<P, V>>) -> Self {
        Self {
            id: id.into(),
            param,
            work,
            callback: Arc::new(NoopCallback),
            check_downstream: true,
        }
    }

    pub fn with_callback(mut self, callback: impl Callback<P, V> + 'static) -> Self {
        self.callback = Arc::new(callback);
        self
    }

    pub fn with_shared_callback(mut self, callback: Arc<dyn Callback<P, V>>) -> Self {
        self.callback = callback;
        self
    }

    /// Enable or disable the single-successor chain check (enabled by
    /// default).
    pub fn check_downstream(mut self, enabled: bool) -> Self {
        self.check_downstream = enabled;
        self
    }
}

/// Typed reference to a node, returned by [`GraphBuilder::add_node`].
pub struct NodeHandle<P, V> {
    index: NodeIndex,
    id: String,
    _types: PhantomData<fn() -> (P, V)>,
}

impl<P, V> NodeHandle<P, V> {
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<P, V> Clone for NodeHandle<P, V> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            id: self.id.clone(),
            _types: PhantomData,
        }
    }
}

impl<P, V> fmt::Debug for NodeHandle<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("index", &self.index)
            .field("id", &self.id)
            .finish()
    }
}

impl<P, V> From<&NodeHandle<P, V>> for NodeIndex {
    fn from(handle: &NodeHandle<P, V>) -> Self {
        handle.index
    }
}

struct PendingNode {
    id: String,
    check_downstream: bool,
    dependencies: Vec<DependencyEdge>,
    downstream: Vec<NodeIndex>,
    unit: Box<dyn Unit>,
}

/// Mutable graph under construction.
///
/// Dependency edges and downstream edges are wired independently by
/// [`add_dependency`](Self::add_dependency) and
/// [`add_downstream`](Self::add_downstream); [`depend_on`](Self::depend_on)
/// wires both sides at once and is what most callers want.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<PendingNode>,
    ids: HashMap<String, NodeIndex>,
}

impl fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node<P, V>(&mut self, spec: NodeSpec<P, V>) -> Result<NodeHandle<P, V>>
    where
        P: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        if self.ids.contains_key(&spec.id) {
            return Err(DagfireError::DuplicateNode(spec.id));
        }

        let index = NodeIndex::new(self.nodes.len());
        let unit = TypedUnit::new(spec.param, spec.work, spec.callback);
        self.ids.insert(spec.id.clone(), index);
        self.nodes.push(PendingNode {
            id: spec.id.clone(),
            check_downstream: spec.check_downstream,
            dependencies: Vec::new(),
            downstream: Vec::new(),
            unit: Box::new(unit),
        });

        Ok(NodeHandle {
            index,
            id: spec.id,
            _types: PhantomData,
        })
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.ids.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn pending(&self, index: NodeIndex) -> Result<&PendingNode> {
        self.nodes
            .get(index.index())
            .ok_or_else(|| DagfireError::NodeNotFound(format!("#{}", index.index())))
    }

    /// Add a dependency edge `node -> upstream`. An edge with the same
    /// upstream and `must` flag may only be added once.
    pub fn add_dependency(
        &mut self,
        node: impl Into<NodeIndex>,
        upstream: impl Into<NodeIndex>,
        must: bool,
    ) -> Result<()> {
        let (node, upstream) = (node.into(), upstream.into());
        let upstream_id = self.pending(upstream)?.id.clone();
        let edge = DependencyEdge { upstream, must };

        let pending = self.pending(node)?;
        if pending.dependencies.contains(&edge) {
            return Err(DagfireError::DuplicateEdge(format!(
                "'{}' already depends on '{}' (must = {})",
                pending.id, upstream_id, must
            )));
        }

        self.nodes[node.index()].dependencies.push(edge);
        Ok(())
    }

    /// Add `next` to the downstream list of `node`. Adding the same
    /// successor twice is a no-op.
    pub fn add_downstream(
        &mut self,
        node: impl Into<NodeIndex>,
        next: impl Into<NodeIndex>,
    ) -> Result<()> {
        let (node, next) = (node.into(), next.into());
        self.pending(next)?;
        let pending = self.pending(node)?;
        if !pending.downstream.contains(&next) {
            self.nodes[node.index()].downstream.push(next);
        }
        Ok(())
    }

    /// Make `node` depend on `upstream` and register `node` as a downstream
    /// successor of `upstream`.
    pub fn depend_on(
        &mut self,
        node: impl Into<NodeIndex>,
        upstream: impl Into<NodeIndex>,
        must: bool,
    ) -> Result<()> {
        let (node, upstream) = (node.into(), upstream.into());
        self.add_dependency(node, upstream, must)?;
        self.add_downstream(upstream, node)
    }

    /// Freeze the graph. Fails if the edges form a cycle.
    pub fn build(self) -> Result<Arc<Graph>> {
        // Edge direction follows execution: upstream -> node, node -> next.
        let mut flow: DiGraphMap<usize, ()> = DiGraphMap::new();
        for (i, pending) in self.nodes.iter().enumerate() {
            flow.add_node(i);
            for dep in &pending.dependencies {
                flow.add_edge(dep.upstream.index(), i, ());
            }
            for next in &pending.downstream {
                flow.add_edge(i, next.index(), ());
            }
        }

        if let Err(cycle) = toposort(&flow, None) {
            let id = &self.nodes[cycle.node_id()].id;
            return Err(DagfireError::DagCycle(format!(
                "cycle detected in graph involving node '{}'",
                id
            )));
        }

        let nodes: Vec<Node> = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                Node::new(
                    p.id,
                    NodeIndex::new(i),
                    p.dependencies,
                    p.downstream,
                    p.check_downstream,
                    p.unit,
                )
            })
            .collect();

        debug!(nodes = nodes.len(), "graph built");

        Ok(Arc::new(Graph {
            nodes,
            ids: self.ids,
        }))
    }
}

/// Immutable graph of nodes for one run.
pub struct Graph {
    nodes: Vec<Node>,
    ids: HashMap<String, NodeIndex>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph").field("nodes", &self.nodes).finish()
    }
}

impl Graph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.index())
    }

    /// Indexing for indices handed out by this graph's builder.
    pub(crate) fn node_at(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.index_of(id).and_then(|i| self.node(i))
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.ids.get(id).copied()
    }

    pub fn state_of(&self, id: &str) -> Option<NodeState> {
        self.node_by_id(id).map(Node::state)
    }

    fn typed<P, V>(&self, handle: &NodeHandle<P, V>) -> Option<&TypedUnit<P, V>>
    where
        P: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.node(handle.index)?
            .unit()
            .as_any()
            .downcast_ref::<TypedUnit<P, V>>()
    }

    /// Snapshot of the node's published result. `None` if the handle does
    /// not belong to this graph.
    pub fn result<P, V>(&self, handle: &NodeHandle<P, V>) -> Option<NodeResult<V>>
    where
        P: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.typed(handle).map(TypedUnit::result)
    }

    pub fn param<P, V>(&self, handle: &NodeHandle<P, V>) -> Option<P>
    where
        P: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.typed(handle).map(TypedUnit::param)
    }

    /// Replace the node's input before a run. Returns `false` if the handle
    /// does not belong to this graph.
    pub fn set_param<P, V>(&self, handle: &NodeHandle<P, V>, param: P) -> bool
    where
        P: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        match self.typed(handle) {
            Some(unit) => {
                unit.set_param(param);
                true
            }
            None => false,
        }
    }

    /// Roots plus their transitive downstream closure, each listed once.
    pub fn reachable_from(&self, roots: &[NodeIndex]) -> Vec<NodeIndex> {
        let mut stack: Vec<NodeIndex> = roots.to_vec();
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut order = Vec::new();

        while let Some(index) = stack.pop() {
            if !visited.insert(index) {
                continue;
            }
            if let Some(node) = self.node(index) {
                order.push(index);
                stack.extend(node.downstream().iter().copied());
            }
        }

        order
    }
}
