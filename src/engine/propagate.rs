// src/engine/propagate.rs

//! Downstream propagation with budget accounting.

use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{trace, warn};

use crate::dag::{Node, NodeIndex};

use super::core::GraphEngine;

impl GraphEngine {
    /// Continue into `node`'s successors with the budget reduced by the time
    /// spent since `started`.
    ///
    /// A single successor is awaited in place, in the same task, so ordering
    /// and budget accounting follow the call chain. Several successors are
    /// spawned on the runtime and awaited together for at most the remaining
    /// budget.
    pub(super) async fn begin_next(&self, node: &Node, started: u64, budget_ms: i64) {
        let elapsed = i64::try_from(self.now().saturating_sub(started)).unwrap_or(i64::MAX);
        let remaining = budget_ms.saturating_sub(elapsed);

        match node.downstream() {
            [] => {}
            [next] => {
                trace!(node = %node.id(), next = %self.node(*next).id(), remaining_ms = remaining, "continuing chain");
                self.run(*next, remaining, Some(node.index())).await;
            }
            successors => self.fan_out(node, successors, remaining).await,
        }
    }

    async fn fan_out(&self, node: &Node, successors: &[NodeIndex], remaining: i64) {
        trace!(
            node = %node.id(),
            branches = successors.len(),
            remaining_ms = remaining,
            "fanning out to downstream branches"
        );

        let from = Some(node.index());
        let branches: Vec<JoinHandle<()>> = successors
            .iter()
            .map(|&next| self.handle().spawn(self.run(next, remaining, from)))
            .collect();

        let wait = Duration::from_millis(u64::try_from(remaining).unwrap_or(0));

        // Each branch records its own outcome in its nodes' results, so a
        // failed wait is only logged.
        match timeout(wait, join_all(branches)).await {
            Ok(joined) => {
                for (next, joined) in successors.iter().zip(joined) {
                    if let Err(e) = joined {
                        warn!(
                            node = %node.id(),
                            next = %self.node(*next).id(),
                            error = %e,
                            "downstream branch did not complete"
                        );
                    }
                }
            }
            Err(_) => {
                warn!(
                    node = %node.id(),
                    branches = successors.len(),
                    remaining_ms = remaining,
                    "downstream branches did not settle within the remaining budget"
                );
            }
        }
    }
}
