// src/engine/driver.rs

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::clock::{ClockSource, TickingClock};
use crate::dag::{Graph, NodeIndex, Registry};
use crate::errors::{DagfireError, Result};

use super::core::GraphEngine;

/// Entry point for running a graph under a global deadline.
///
/// The runtime behind `handle` is the execution context: roots and
/// fan-out branches are spawned on it.
#[derive(Debug, Clone)]
pub struct GraphDriver {
    handle: Handle,
    clock: Arc<dyn ClockSource>,
}

impl GraphDriver {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            clock: TickingClock::global(),
        }
    }

    /// Driver on the runtime the caller is running in.
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Replace the clock used for budget accounting.
    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Run `roots` (and everything they transitively trigger) with
    /// `deadline` as the initial budget.
    ///
    /// Returns `Ok(true)` if every root call chain settled in time. On
    /// expiry, every reachable node that has not settled yet is stopped as
    /// `Timeout` and `Ok(false)` is returned. Errors are reserved for invalid
    /// input and failures of the runtime itself.
    pub async fn begin_work(
        &self,
        deadline: Duration,
        graph: &Arc<Graph>,
        roots: &[NodeIndex],
    ) -> Result<bool> {
        if roots.is_empty() {
            return Err(DagfireError::EmptyRoots);
        }
        if let Some(missing) = roots.iter().find(|r| graph.node(**r).is_none()) {
            return Err(DagfireError::NodeNotFound(format!("#{}", missing.index())));
        }

        let engine = GraphEngine::new(
            graph.clone(),
            Registry::new(graph.clone()),
            self.clock.clone(),
            self.handle.clone(),
        );
        let budget_ms = i64::try_from(deadline.as_millis()).unwrap_or(i64::MAX);

        info!(roots = roots.len(), deadline_ms = budget_ms, "beginning graph run");

        let launched: Vec<JoinHandle<()>> = roots
            .iter()
            .map(|&root| self.handle.spawn(engine.run(root, budget_ms, None)))
            .collect();

        match timeout(deadline, join_all(launched)).await {
            Ok(joined) => {
                for res in joined {
                    res.map_err(|e| {
                        DagfireError::Scheduling(format!("root call chain did not complete: {e}"))
                    })?;
                }
                info!(
                    reached = engine.registry().len(),
                    "graph settled within the deadline"
                );
                Ok(true)
            }
            Err(_) => {
                let stopped = stop_unsettled(graph, roots);
                warn!(
                    deadline_ms = budget_ms,
                    stopped,
                    "graph did not settle before the deadline; unresolved nodes stopped"
                );
                Ok(false)
            }
        }
    }
}

/// Stop every node reachable from `roots` that is still `Init` or
/// `Working`. Returns how many nodes this call settled.
fn stop_unsettled(graph: &Graph, roots: &[NodeIndex]) -> usize {
    graph
        .reachable_from(roots)
        .into_iter()
        .filter_map(|index| graph.node(index))
        .filter(|node| {
            let stopped = node.stop_now();
            if stopped {
                debug!(node = %node.id(), "stopped by deadline sweep");
            }
            stopped
        })
        .count()
}

/// Run `roots` of `graph` on the runtime behind `context` with `deadline`
/// as the global budget. See [`GraphDriver::begin_work`].
pub async fn begin_work(
    deadline: Duration,
    context: &Handle,
    graph: &Arc<Graph>,
    roots: &[NodeIndex],
) -> Result<bool> {
    GraphDriver::new(context.clone())
        .begin_work(deadline, graph, roots)
        .await
}
