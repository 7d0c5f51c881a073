// src/dag/result.rs

//! Node results and the fault taxonomy.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Terminal outcome of a node. `Default` is the only value seen before the
/// node resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Default,
    Success,
    Timeout,
    Exception,
}

impl Outcome {
    /// `Timeout` or `Exception`.
    pub fn is_failure(self) -> bool {
        matches!(self, Outcome::Timeout | Outcome::Exception)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Default => "default",
            Outcome::Success => "success",
            Outcome::Timeout => "timeout",
            Outcome::Exception => "exception",
        };
        f.write_str(s)
    }
}

/// Why a node did not resolve successfully.
///
/// Faults are synthesized or captured at the node boundary and stored in the
/// node's [`NodeResult`]; none of them is ever raised across threads.
#[derive(Debug, Clone, Error)]
pub enum Fault {
    /// A node further down a single-successor chain had already left `Init`,
    /// so this node was short-circuited.
    #[error("skipped: a downstream node was already resolved by another path")]
    Skip,

    /// The remaining budget was exhausted before the node could run, or the
    /// driver's deadline sweep stopped it.
    #[error("timed out")]
    Timeout,

    /// The work unit returned an error or panicked.
    #[error("work failed: {0:#}")]
    Work(Arc<anyhow::Error>),

    /// A dependency resolved as `Timeout` or `Exception`.
    #[error("upstream node `{upstream}` resolved as {outcome}")]
    Upstream {
        upstream: String,
        outcome: Outcome,
        cause: Option<Arc<Fault>>,
    },
}

impl Fault {
    pub fn work(err: anyhow::Error) -> Self {
        Fault::Work(Arc::new(err))
    }

    pub fn upstream(upstream: impl Into<String>, outcome: Outcome, cause: Option<Fault>) -> Self {
        Fault::Upstream {
            upstream: upstream.into(),
            outcome,
            cause: cause.map(Arc::new),
        }
    }

    /// The outcome a node settles with when it fails with this fault.
    pub fn outcome(&self) -> Outcome {
        match self {
            Fault::Timeout => Outcome::Timeout,
            Fault::Upstream {
                outcome: Outcome::Timeout,
                ..
            } => Outcome::Timeout,
            _ => Outcome::Exception,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Fault::Skip)
    }
}

/// Published result of a node.
///
/// On failure paths `value` holds the work unit's declared default, so
/// downstream consumers always get a typed value.
#[derive(Debug, Clone)]
pub struct NodeResult<V> {
    outcome: Outcome,
    value: Option<V>,
    fault: Option<Fault>,
}

impl<V> NodeResult<V> {
    pub fn pending() -> Self {
        Self {
            outcome: Outcome::Default,
            value: None,
            fault: None,
        }
    }

    pub fn success(value: V) -> Self {
        Self {
            outcome: Outcome::Success,
            value: Some(value),
            fault: None,
        }
    }

    pub fn failure(default_value: V, fault: Fault) -> Self {
        Self {
            outcome: fault.outcome(),
            value: Some(default_value),
            fault: Some(fault),
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<V> {
        self.value
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn is_default(&self) -> bool {
        self.outcome == Outcome::Default
    }
}

impl<V> Default for NodeResult<V> {
    fn default() -> Self {
        Self::pending()
    }
}
