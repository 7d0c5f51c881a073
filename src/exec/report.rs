// src/exec/report.rs

use tracing::{info, warn};

use crate::dag::{Callback, NodeResult};

/// Callback that logs each node's start and terminal result.
#[derive(Debug, Clone)]
pub struct LogReporter {
    id: String,
}

impl LogReporter {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Callback<String, String> for LogReporter {
    fn begin(&self) {
        info!(node = %self.id, "node started");
    }

    fn result(&self, success: bool, param: &String, result: &NodeResult<String>) {
        let value = result.value().map(String::as_str).unwrap_or_default();
        if success {
            info!(node = %self.id, %param, outcome = %result.outcome(), %value, "node finished");
        } else {
            match result.fault() {
                Some(fault) if fault.is_skip() => {
                    info!(node = %self.id, outcome = %result.outcome(), "node skipped")
                }
                Some(fault) => {
                    warn!(node = %self.id, outcome = %result.outcome(), %fault, "node failed")
                }
                None => warn!(node = %self.id, outcome = %result.outcome(), "node failed"),
            }
        }
    }
}
