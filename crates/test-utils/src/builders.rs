#![allow(dead_code)]

use std::collections::BTreeMap;

use dagfire::config::{ConfigFile, ConfigSection, NodeConfig, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                node: BTreeMap::new(),
            },
        }
    }

    pub fn with_node(mut self, id: &str, node: NodeConfig) -> Self {
        self.config.node.insert(id.to_string(), node);
        self
    }

    pub fn with_deadline_ms(mut self, ms: u64) -> Self {
        self.config.config.deadline_ms = ms;
        self
    }

    pub fn with_check_downstream(mut self, enabled: bool) -> Self {
        self.config.config.check_downstream = enabled;
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `NodeConfig`.
pub struct NodeConfigBuilder {
    node: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            node: NodeConfig {
                cmd: cmd.to_string(),
                param: String::new(),
                default: String::new(),
                after: Vec::new(),
                after_any: Vec::new(),
                check_downstream: None,
            },
        }
    }

    pub fn param(mut self, param: &str) -> Self {
        self.node.param = param.to_string();
        self
    }

    pub fn default_value(mut self, default: &str) -> Self {
        self.node.default = default.to_string();
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.node.after.push(dep.to_string());
        self
    }

    pub fn after_any(mut self, dep: &str) -> Self {
        self.node.after_any.push(dep.to_string());
        self
    }

    pub fn check_downstream(mut self, enabled: bool) -> Self {
        self.node.check_downstream = Some(enabled);
        self
    }

    pub fn build(self) -> NodeConfig {
        self.node
    }
}
