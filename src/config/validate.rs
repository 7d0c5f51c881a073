// src/config/validate.rs

use once_cell::sync::Lazy;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DagfireError, Result};

static NODE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("node id pattern is valid")
});

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DagfireError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.node))
    }
}

/// Run every semantic check on a freshly deserialized config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_nodes(cfg)?;
    validate_global_config(cfg)?;
    validate_node_ids(cfg)?;
    validate_node_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_nodes(cfg: &RawConfigFile) -> Result<()> {
    if cfg.node.is_empty() {
        return Err(DagfireError::ConfigError(
            "config must contain at least one [node.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.deadline_ms == 0 {
        return Err(DagfireError::ConfigError(
            "[config].deadline_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.config.clock_tick_ms == 0 {
        return Err(DagfireError::ConfigError(
            "[config].clock_tick_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_node_ids(cfg: &RawConfigFile) -> Result<()> {
    for id in cfg.node.keys() {
        if !NODE_ID.is_match(id) {
            return Err(DagfireError::ConfigError(format!(
                "node id '{}' must start with a letter or '_' and contain only letters, digits, '_' or '-'",
                id
            )));
        }
    }
    Ok(())
}

fn validate_node_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (id, node) in cfg.node.iter() {
        for (field, deps) in [("after", &node.after), ("after_any", &node.after_any)] {
            for (i, dep) in deps.iter().enumerate() {
                if !cfg.node.contains_key(dep) {
                    return Err(DagfireError::ConfigError(format!(
                        "node '{}' has unknown dependency '{}' in `{}`",
                        id, dep, field
                    )));
                }
                if dep == id {
                    return Err(DagfireError::ConfigError(format!(
                        "node '{}' cannot depend on itself in `{}`",
                        id, field
                    )));
                }
                if deps[..i].contains(dep) {
                    return Err(DagfireError::DuplicateEdge(format!(
                        "node '{}' lists '{}' twice in `{}`",
                        id, dep, field
                    )));
                }
            }
        }

        if let Some(dep) = node.after.iter().find(|d| node.after_any.contains(*d)) {
            return Err(DagfireError::ConfigError(format!(
                "node '{}' lists '{}' in both `after` and `after_any`",
                id, dep
            )));
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dependency -> node.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in cfg.node.keys() {
        graph.add_node(id.as_str());
    }

    for (id, node) in cfg.node.iter() {
        for dep in node.after.iter().chain(node.after_any.iter()) {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(DagfireError::DagCycle(format!(
            "cycle detected in node graph involving node '{}'",
            cycle.node_id()
        ))),
    }
}
