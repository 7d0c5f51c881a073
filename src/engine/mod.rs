// src/engine/mod.rs

//! Dependency-driven execution engine.
//!
//! - `core` holds [`GraphEngine`] and the per-node entry contract.
//! - `arbitration` decides when a node with dependencies fires, fails fast
//!   or keeps waiting.
//! - `propagate` continues into downstream successors with the budget
//!   reduced by elapsed time.
//! - [`driver`] launches roots under a global deadline and sweeps the graph
//!   when it expires.
//!
//! There is no scheduler thread: whichever task resolves a dependency
//! evaluates the dependent and, if it fires, carries on into its successors.

mod arbitration;
mod core;
pub mod driver;
mod propagate;

pub use self::core::GraphEngine;
pub use self::driver::{GraphDriver, begin_work};
