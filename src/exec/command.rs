// src/exec/command.rs

//! Shell command work units.

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use futures::future::BoxFuture;
use tokio::process::Command;
use tracing::{debug, info};

use crate::dag::{Registry, Work};

/// Runs a shell command as a node's work.
///
/// The node's param is exposed as `DAGFIRE_PARAM`, and every dependency that
/// has published a value as `DAGFIRE_DEP_<ID>` (id upper-cased, `-` replaced
/// by `_`). Trimmed stdout becomes the node's value.
#[derive(Debug, Clone)]
pub struct CommandWork {
    id: String,
    cmd: String,
    default: String,
    dependencies: Vec<String>,
}

impl CommandWork {
    pub fn new(id: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cmd: cmd.into(),
            default: String::new(),
            dependencies: Vec::new(),
        }
    }

    /// Value published when the command fails or the node times out.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    /// Dependency ids whose values are passed to the command.
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = String>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }

    async fn run(&self, param: String, registry: Registry) -> Result<String> {
        let mut cmd = self.shell();
        cmd.env("DAGFIRE_PARAM", &param)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for dep in &self.dependencies {
            if let Some(value) = registry.result::<String>(dep).and_then(|r| r.into_value()) {
                cmd.env(dependency_var(dep), value);
            }
        }

        info!(node = %self.id, cmd = %self.cmd, "starting node command");

        let output = cmd
            .output()
            .await
            .with_context(|| format!("running command for node '{}'", self.id))?;

        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!(node = %self.id, "stderr: {}", line);
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            bail!("command for node '{}' exited with code {}", self.id, code);
        }

        let stdout = String::from_utf8(output.stdout)
            .with_context(|| format!("stdout of node '{}' is not valid UTF-8", self.id))?;

        Ok(stdout.trim().to_string())
    }
}

impl Work<String, String> for CommandWork {
    fn action(&self, param: String, registry: Registry) -> BoxFuture<'_, Result<String>> {
        Box::pin(self.run(param, registry))
    }

    fn default_value(&self) -> String {
        self.default.clone()
    }
}

/// Environment variable carrying the value of dependency `id`.
pub fn dependency_var(id: &str) -> String {
    format!("DAGFIRE_DEP_{}", id.to_uppercase().replace('-', "_"))
}
