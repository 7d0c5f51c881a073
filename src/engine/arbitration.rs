// src/engine/arbitration.rs

//! Dependency evaluation: deciding whether a reached node fires, fails fast
//! or keeps waiting.

use tracing::{debug, trace};

use crate::dag::{DependencyEdge, Fault, Node, NodeIndex, NodeState, Outcome};

use super::core::GraphEngine;

/// What a multi-dependency node should do on this entry.
#[derive(Debug)]
enum Verdict {
    /// A mandatory dependency is still unresolved, or the trigger cannot
    /// advance the node. A later completion re-enters arbitration.
    Wait,
    Fire,
    Fail(Fault),
}

/// Arbitration winner's next step, carried out after the lock is released.
enum Claimed {
    Execute,
    Notify,
}

/// Failure a dependent inherits from `upstream`, if it resolved as
/// `Timeout` or `Exception`.
fn inherited_failure(upstream: &Node) -> Option<Fault> {
    let outcome = upstream.outcome();
    outcome
        .is_failure()
        .then(|| Fault::upstream(upstream.id(), outcome, upstream.fault()))
}

impl GraphEngine {
    /// Exactly one dependency: inherit its failure or fire. The `must` flag
    /// plays no role here.
    pub(super) async fn resolve_single(&self, node: &Node, edge: &DependencyEdge) {
        let upstream = self.node(edge.upstream);
        match inherited_failure(upstream) {
            Some(fault) => {
                node.fail_fast(NodeState::Init, fault);
            }
            None => node.fire(self.registry().clone()).await,
        }
    }

    /// Several dependencies: decide under the node's arbitration lock and
    /// claim the node there, then execute or notify outside of it.
    ///
    /// Returns `true` if this call resolved the node, in which case the
    /// caller continues with downstream propagation.
    pub(super) async fn arbitrate(&self, node: &Node, from: Option<NodeIndex>) -> bool {
        let claimed = {
            let _guard = node.arbitration_lock();

            if node.state() != NodeState::Init {
                trace!(node = %node.id(), state = %node.state(), "resolved by a racing arbiter");
                return false;
            }

            match self.verdict(node, from) {
                Verdict::Wait => {
                    trace!(node = %node.id(), "waiting on mandatory dependencies");
                    return false;
                }
                Verdict::Fire => {
                    if !node.claim() {
                        return false;
                    }
                    Claimed::Execute
                }
                Verdict::Fail(fault) => {
                    debug!(node = %node.id(), %fault, "dependency failure inherited");
                    if !node.settle_failure(NodeState::Init, fault) {
                        return false;
                    }
                    Claimed::Notify
                }
            }
        };

        match claimed {
            Claimed::Execute => node.execute(self.registry().clone()).await,
            Claimed::Notify => node.notify_failure(),
        }
        true
    }

    fn verdict(&self, node: &Node, from: Option<NodeIndex>) -> Verdict {
        let must: Vec<&DependencyEdge> = node.dependencies().iter().filter(|e| e.must).collect();

        // Only optional dependencies: whichever completes first decides.
        if must.is_empty() {
            return match from.map(|index| self.node(index)) {
                Some(trigger) if trigger.outcome() == Outcome::Timeout => Verdict::Fail(
                    Fault::upstream(trigger.id(), Outcome::Timeout, trigger.fault()),
                ),
                _ => Verdict::Fire,
            };
        }

        let trigger_is_must = from.is_some_and(|index| must.iter().any(|e| e.upstream == index));
        if !trigger_is_must {
            return Verdict::Wait;
        }

        let upstreams: Vec<&Node> = must.iter().map(|e| self.node(e.upstream)).collect();

        if upstreams.iter().any(|up| !up.state().is_terminal()) {
            return Verdict::Wait;
        }

        match upstreams.iter().find_map(|up| inherited_failure(up)) {
            Some(fault) => Verdict::Fail(fault),
            None => Verdict::Fire,
        }
    }
}
