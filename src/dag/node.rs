// src/dag/node.rs

//! Graph nodes: identity, edges, lifecycle state and the typed unit that
//! owns the param, work, callback and published result.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, trace};

use crate::dag::registry::Registry;
use crate::dag::result::{Fault, NodeResult, Outcome};
use crate::dag::state::{NodeState, StateCell};
use crate::dag::work::{Callback, Work};

/// Position of a node inside its [`Graph`](crate::dag::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Edge from a node to one of its upstream dependencies.
///
/// A `must` dependency that fails or times out forces the node to fail
/// fast; an optional one can trigger firing but never blocks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub upstream: NodeIndex,
    pub must: bool,
}

/// Type-erased half of a node that knows `P` and `V`.
pub(crate) trait Unit: Send + Sync {
    /// Run the work unit. The caller must already have moved the node from
    /// `Init` to `Working`.
    fn execute<'a>(&'a self, state: &'a StateCell, registry: Registry) -> BoxFuture<'a, ()>;

    /// CAS `expected -> Error` and publish the failure under the result
    /// lock. Returns `true` if this call settled the node.
    fn settle_failure(&self, state: &StateCell, expected: NodeState, cause: Fault) -> bool;

    /// Deliver the failure callback. Only the winner of `settle_failure`
    /// calls this.
    fn notify_failure(&self);

    fn outcome(&self) -> Outcome;

    fn fault(&self) -> Option<Fault>;

    /// The whole `TypedUnit<P, V>`.
    fn as_any(&self) -> &dyn Any;

    /// The `ResultSlot<V>`, for lookups that only know `V`.
    fn result_any(&self) -> &dyn Any;
}

/// Published result of a node, guarded so that the state CAS and the result
/// write become visible together.
pub(crate) struct ResultSlot<V>(RwLock<NodeResult<V>>);

impl<V: Clone> ResultSlot<V> {
    fn new() -> Self {
        Self(RwLock::new(NodeResult::pending()))
    }

    pub(crate) fn snapshot(&self) -> NodeResult<V> {
        self.0.read().clone()
    }
}

pub(crate) struct TypedUnit<P, V> {
    param: RwLock<P>,
    work: Arc<dyn Work<P, V>>,
    callback: Arc<dyn Callback<P, V>>,
    slot: ResultSlot<V>,
}

impl<P, V> TypedUnit<P, V>
where
    P: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        param: P,
        work: Arc<dyn Work<P, V>>,
        callback: Arc<dyn Callback<P, V>>,
    ) -> Self {
        Self {
            param: RwLock::new(param),
            work,
            callback,
            slot: ResultSlot::new(),
        }
    }

    pub(crate) fn set_param(&self, param: P) {
        *self.param.write() = param;
    }

    pub(crate) fn param(&self) -> P {
        self.param.read().clone()
    }

    pub(crate) fn result(&self) -> NodeResult<V> {
        self.slot.snapshot()
    }
}

impl<P, V> Unit for TypedUnit<P, V>
where
    P: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn execute<'a>(&'a self, state: &'a StateCell, registry: Registry) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let param = self.param();
            self.callback.begin();

            let produced = AssertUnwindSafe(async {
                self.work.action(param.clone(), registry).await
            })
            .catch_unwind()
            .await;

            let produced = match produced {
                Ok(res) => res.map_err(Fault::work),
                Err(payload) => Err(Fault::work(anyhow::anyhow!(
                    "work panicked: {}",
                    panic_message(payload.as_ref())
                ))),
            };

            match produced {
                Ok(value) => {
                    let published = {
                        let mut slot = self.slot.0.write();
                        if state.transition(NodeState::Working, NodeState::Finished) {
                            *slot = NodeResult::success(value);
                            Some(slot.clone())
                        } else {
                            None
                        }
                    };

                    match published {
                        Some(result) => self.callback.result(true, &param, &result),
                        None => debug!("work returned after the node was stopped; value discarded"),
                    }
                }
                Err(fault) => {
                    if self.settle_failure(state, NodeState::Working, fault) {
                        self.notify_failure();
                    }
                }
            }
        })
    }

    fn settle_failure(&self, state: &StateCell, expected: NodeState, cause: Fault) -> bool {
        let default_value = self.work.default_value();
        let mut slot = self.slot.0.write();
        if !state.transition(expected, NodeState::Error) {
            return false;
        }
        if slot.is_default() {
            *slot = NodeResult::failure(default_value, cause);
        }
        true
    }

    fn notify_failure(&self) {
        let param = self.param();
        let result = self.slot.snapshot();
        self.callback.result(false, &param, &result);
    }

    fn outcome(&self) -> Outcome {
        self.slot.0.read().outcome()
    }

    fn fault(&self) -> Option<Fault> {
        self.slot.0.read().fault().cloned()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn result_any(&self) -> &dyn Any {
        &self.slot
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// One execution unit plus its dependency and downstream edges.
///
/// Edges are fixed once the graph is built; only `state` and the published
/// result change during a run.
pub struct Node {
    id: String,
    index: NodeIndex,
    state: StateCell,
    dependencies: Vec<DependencyEdge>,
    downstream: Vec<NodeIndex>,
    check_downstream: bool,
    arbitration: Mutex<()>,
    unit: Box<dyn Unit>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("state", &self.state.load())
            .field("dependencies", &self.dependencies)
            .field("downstream", &self.downstream)
            .field("check_downstream", &self.check_downstream)
            .finish_non_exhaustive()
    }
}

impl Node {
    pub(crate) fn new(
        id: String,
        index: NodeIndex,
        dependencies: Vec<DependencyEdge>,
        downstream: Vec<NodeIndex>,
        check_downstream: bool,
        unit: Box<dyn Unit>,
    ) -> Self {
        Self {
            id,
            index,
            state: StateCell::new(),
            dependencies,
            downstream,
            check_downstream,
            arbitration: Mutex::new(()),
            unit,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn state(&self) -> NodeState {
        self.state.load()
    }

    pub fn dependencies(&self) -> &[DependencyEdge] {
        &self.dependencies
    }

    pub fn downstream(&self) -> &[NodeIndex] {
        &self.downstream
    }

    /// Whether this node inspects its single-successor chain before running.
    /// Only meaningful when the node has exactly one downstream successor.
    pub fn checks_downstream(&self) -> bool {
        self.check_downstream
    }

    pub fn outcome(&self) -> Outcome {
        self.unit.outcome()
    }

    pub fn fault(&self) -> Option<Fault> {
        self.unit.fault()
    }

    pub(crate) fn unit(&self) -> &dyn Unit {
        self.unit.as_ref()
    }

    /// Serializes multi-dependency arbitration for this node.
    pub(crate) fn arbitration_lock(&self) -> MutexGuard<'_, ()> {
        self.arbitration.lock()
    }

    /// `Init -> Working`. Returns `true` if this caller owns the execution.
    pub(crate) fn claim(&self) -> bool {
        self.state.transition(NodeState::Init, NodeState::Working)
    }

    /// Run the work unit of a node this caller has claimed.
    pub(crate) async fn execute(&self, registry: Registry) {
        trace!(node = %self.id, "invoking work unit");
        self.unit.execute(&self.state, registry).await;
        debug!(node = %self.id, state = %self.state(), outcome = %self.outcome(), "node resolved");
    }

    /// Claim the node and run its work unit. Losing the claim is a no-op.
    pub(crate) async fn fire(&self, registry: Registry) {
        if self.claim() {
            self.execute(registry).await;
        } else {
            trace!(node = %self.id, state = %self.state(), "fire lost the claim; already resolved elsewhere");
        }
    }

    /// Publish the failure if `expected -> Error` wins, without notifying.
    pub(crate) fn settle_failure(&self, expected: NodeState, cause: Fault) -> bool {
        self.unit.settle_failure(&self.state, expected, cause)
    }

    pub(crate) fn notify_failure(&self) {
        self.unit.notify_failure();
    }

    /// Fail the node from `expected` with `cause`, firing the callback once.
    pub(crate) fn fail_fast(&self, expected: NodeState, cause: Fault) -> bool {
        if !self.settle_failure(expected, cause) {
            return false;
        }
        debug!(node = %self.id, outcome = %self.outcome(), fault = ?self.fault(), "node failed fast");
        self.notify_failure();
        true
    }

    /// Cooperatively stop a node that has not settled yet, marking it as
    /// `Timeout`. A running work unit is not interrupted; its late result is
    /// discarded. Returns `true` if this call settled the node.
    pub fn stop_now(&self) -> bool {
        loop {
            let current = self.state();
            if current.is_terminal() {
                return false;
            }
            if self.fail_fast(current, Fault::Timeout) {
                return true;
            }
        }
    }
}
