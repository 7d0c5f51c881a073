// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Configuration exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [config]
/// deadline_ms = 500
///
/// [node.fetch]
/// cmd = "curl -s https://example.com/health"
///
/// [node.report]
/// cmd = "echo \"$DAGFIRE_DEP_FETCH\""
/// after = ["fetch"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All nodes from `[node.<id>]`, keyed by id.
    #[serde(default)]
    pub node: BTreeMap<String, NodeConfig>,
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(raw)` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub node: BTreeMap<String, NodeConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, node: BTreeMap<String, NodeConfig>) -> Self {
        Self { config, node }
    }

    /// Ids of nodes without any `after` / `after_any` entry.
    pub fn roots(&self) -> Vec<String> {
        self.node
            .iter()
            .filter(|(_, n)| n.after.is_empty() && n.after_any.is_empty())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Global budget for one run, in milliseconds.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Period of the clock used for budget accounting.
    #[serde(default = "default_clock_tick_ms")]
    pub clock_tick_ms: u64,

    /// Default for each node's `check_downstream`.
    #[serde(default = "default_check_downstream")]
    pub check_downstream: bool,
}

fn default_deadline_ms() -> u64 {
    1000
}

fn default_clock_tick_ms() -> u64 {
    1
}

fn default_check_downstream() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            clock_tick_ms: default_clock_tick_ms(),
            check_downstream: default_check_downstream(),
        }
    }
}

/// `[node.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Shell command producing the node's value on stdout.
    pub cmd: String,

    /// Input exposed to the command as `DAGFIRE_PARAM`.
    #[serde(default)]
    pub param: String,

    /// Value published when the node times out or fails.
    #[serde(default)]
    pub default: String,

    /// Mandatory dependencies.
    #[serde(default)]
    pub after: Vec<String>,

    /// Optional dependencies: the first to complete may fire the node.
    #[serde(default)]
    pub after_any: Vec<String>,

    /// Overrides `[config].check_downstream` for this node.
    #[serde(default)]
    pub check_downstream: Option<bool>,
}

impl NodeConfig {
    pub fn effective_check_downstream(&self, global: bool) -> bool {
        self.check_downstream.unwrap_or(global)
    }
}
