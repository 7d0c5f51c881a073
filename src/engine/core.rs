// src/engine/core.rs

//! Node entry point of the engine.
//!
//! [`GraphEngine::run`] is evaluated every time the driver (for roots) or an
//! upstream completion reaches a node. It registers the node, short-circuits
//! on exhausted budget, duplicate entry or a busy downstream chain, then
//! evaluates the node's dependencies and hands off to downstream propagation.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::clock::ClockSource;
use crate::dag::{Fault, Graph, Node, NodeIndex, NodeState, Registry};

struct EngineShared {
    graph: Arc<Graph>,
    registry: Registry,
    clock: Arc<dyn ClockSource>,
    handle: Handle,
}

/// Per-run engine: the graph, the run's registry, the clock used for budget
/// accounting and the runtime that multi-successor branches are spawned on.
///
/// Cheap to clone; every clone shares the same run.
#[derive(Clone)]
pub struct GraphEngine {
    shared: Arc<EngineShared>,
}

impl fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphEngine")
            .field("nodes", &self.shared.graph.len())
            .field("registry", &self.shared.registry)
            .field("clock", &self.shared.clock)
            .finish_non_exhaustive()
    }
}

impl GraphEngine {
    pub fn new(
        graph: Arc<Graph>,
        registry: Registry,
        clock: Arc<dyn ClockSource>,
        handle: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                graph,
                registry,
                clock,
                handle,
            }),
        }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.shared.graph
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    pub(super) fn handle(&self) -> &Handle {
        &self.shared.handle
    }

    pub(super) fn now(&self) -> u64 {
        self.shared.clock.now_millis()
    }

    pub(super) fn node(&self, index: NodeIndex) -> &Node {
        self.shared.graph.node_at(index)
    }

    /// Evaluate `node` with `budget_ms` milliseconds left for the call chain
    /// from here on. `from` is the upstream whose completion led here (`None`
    /// for roots). An index that does not belong to this graph is a no-op.
    ///
    /// The returned future is `'static` so it can be awaited in place (the
    /// single-successor continuation) or spawned (fan-out and roots).
    pub fn run(
        &self,
        node: NodeIndex,
        budget_ms: i64,
        from: Option<NodeIndex>,
    ) -> BoxFuture<'static, ()> {
        let engine = self.clone();
        Box::pin(async move { engine.run_node(node, budget_ms, from).await })
    }

    async fn run_node(&self, index: NodeIndex, budget_ms: i64, from: Option<NodeIndex>) {
        let Some(node) = self.shared.graph.node(index) else {
            warn!(?index, nodes = self.shared.graph.len(), "index is not part of this graph; ignoring");
            return;
        };
        self.registry().register(node);
        let started = self.now();

        if budget_ms <= 0 {
            debug!(node = %node.id(), budget_ms, "budget exhausted on entry; failing fast");
            node.fail_fast(NodeState::Init, Fault::Timeout);
            return self.begin_next(node, started, budget_ms).await;
        }

        if node.state().is_terminal() {
            trace!(node = %node.id(), state = %node.state(), "already resolved; propagating only");
            return self.begin_next(node, started, budget_ms).await;
        }

        if node.checks_downstream() && !self.downstream_chain_idle(node) {
            debug!(node = %node.id(), "downstream chain already started; skipping");
            node.fail_fast(NodeState::Init, Fault::Skip);
            return self.begin_next(node, started, budget_ms).await;
        }

        match node.dependencies() {
            [] => node.fire(self.registry().clone()).await,
            [only] => self.resolve_single(node, only).await,
            _ => {
                if !self.arbitrate(node, from).await {
                    return;
                }
            }
        }

        self.begin_next(node, started, budget_ms).await;
    }

    /// Walk the single-successor chain below `node`. Returns `false` if any
    /// node on it has left `Init`. Nodes with zero or several successors
    /// have nothing to check.
    fn downstream_chain_idle(&self, node: &Node) -> bool {
        let mut current = node;
        while let [next] = current.downstream() {
            let next = self.node(*next);
            if next.state() != NodeState::Init {
                return false;
            }
            current = next;
        }
        true
    }
}
