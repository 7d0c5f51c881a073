// src/dag/state.rs

//! Per-node lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a node within one run.
///
/// Legal transitions are `Init -> Working -> {Finished, Error}` and
/// `Init -> Error`. A state never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeState {
    Init = 0,
    Finished = 1,
    Error = 2,
    Working = 3,
}

impl NodeState {
    /// `Finished` or `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeState::Finished | NodeState::Error)
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => NodeState::Init,
            1 => NodeState::Finished,
            2 => NodeState::Error,
            _ => NodeState::Working,
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Init => "init",
            NodeState::Finished => "finished",
            NodeState::Error => "error",
            NodeState::Working => "working",
        };
        f.write_str(s)
    }
}

/// Atomic holder for a [`NodeState`].
///
/// Every mutation goes through [`StateCell::transition`], so exactly one
/// caller wins each transition no matter how many threads race for it.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(NodeState::Init as u8))
    }

    pub fn load(&self) -> NodeState {
        NodeState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Compare-and-set from `from` to `to`. Returns `true` if this call won.
    pub fn transition(&self, from: NodeState, to: NodeState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
