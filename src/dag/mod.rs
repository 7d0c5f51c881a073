// src/dag/mod.rs

//! Graph data model.
//!
//! - [`graph`] holds the builder and the frozen [`Graph`] of nodes.
//! - [`node`] contains the node itself: edges, atomic state and the typed
//!   unit owning param, work, callback and result.
//! - [`state`] defines the per-node lifecycle state machine.
//! - [`result`] defines published results and the fault taxonomy.
//! - [`work`] defines the work/callback capabilities supplied by callers.
//! - [`registry`] is the per-run `id -> node` map work units read from.

pub mod graph;
pub mod node;
pub mod registry;
pub mod result;
pub mod state;
pub mod work;

pub use graph::{Graph, GraphBuilder, NodeHandle, NodeSpec};
pub use node::{DependencyEdge, Node, NodeIndex};
pub use registry::Registry;
pub use result::{Fault, NodeResult, Outcome};
pub use state::{NodeState, StateCell};
pub use work::{Callback, FnWork, NoopCallback, Work};
