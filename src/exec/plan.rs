// src/exec/plan.rs

//! Turning a validated config into a runnable graph.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::ConfigFile;
use crate::dag::{Graph, GraphBuilder, NodeHandle, NodeIndex, NodeResult, NodeSpec};
use crate::errors::{DagfireError, Result};
use crate::exec::command::CommandWork;
use crate::exec::report::LogReporter;

/// A graph of command nodes together with typed handles for reading results.
#[derive(Debug)]
pub struct Plan {
    pub graph: Arc<Graph>,
    handles: BTreeMap<String, NodeHandle<String, String>>,
}

impl Plan {
    /// Nodes without any dependency.
    pub fn default_roots(&self) -> Vec<NodeIndex> {
        self.graph
            .nodes()
            .filter(|n| n.dependencies().is_empty())
            .map(|n| n.index())
            .collect()
    }

    /// Resolve explicitly named roots, falling back to
    /// [`default_roots`](Self::default_roots) when `names` is empty.
    pub fn roots(&self, names: &[String]) -> Result<Vec<NodeIndex>> {
        if names.is_empty() {
            return Ok(self.default_roots());
        }
        names
            .iter()
            .map(|name| {
                self.graph
                    .index_of(name)
                    .ok_or_else(|| DagfireError::NodeNotFound(name.clone()))
            })
            .collect()
    }

    pub fn result(&self, id: &str) -> Option<NodeResult<String>> {
        self.handles.get(id).and_then(|h| self.graph.result(h))
    }

    /// Node ids in config order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }
}

/// Build a [`Plan`] where every `[node.<id>]` becomes a [`CommandWork`]
/// node reporting through [`LogReporter`]. `after` entries become mandatory
/// dependencies, `after_any` entries optional ones; downstream edges are
/// derived from both.
pub fn plan_from_config(cfg: &ConfigFile) -> Result<Plan> {
    let mut builder = GraphBuilder::new();
    let mut handles = BTreeMap::new();

    for (id, node) in cfg.node.iter() {
        let work = CommandWork::new(id, &node.cmd)
            .with_default(&node.default)
            .with_dependencies(node.after.iter().chain(node.after_any.iter()).cloned());
        let spec = NodeSpec::new(id, node.param.clone(), work)
            .with_callback(LogReporter::new(id))
            .check_downstream(node.effective_check_downstream(cfg.config.check_downstream));
        handles.insert(id.clone(), builder.add_node(spec)?);
    }

    for (id, node) in cfg.node.iter() {
        let edges = node
            .after
            .iter()
            .map(|dep| (dep, true))
            .chain(node.after_any.iter().map(|dep| (dep, false)));
        for (dep, must) in edges {
            let (node_ix, dep_ix) = match (builder.index_of(id), builder.index_of(dep)) {
                (Some(n), Some(d)) => (n, d),
                _ => return Err(DagfireError::NodeNotFound(dep.clone())),
            };
            builder.depend_on(node_ix, dep_ix, must)?;
        }
    }

    let graph = builder.build()?;
    debug!(nodes = graph.len(), "plan built from config");

    Ok(Plan { graph, handles })
}
