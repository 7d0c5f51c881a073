// src/exec/mod.rs

//! Command-backed nodes for the CLI.
//!
//! - [`command`]: [`CommandWork`], a work unit running a shell command.
//! - [`report`]: [`LogReporter`], a callback that logs node results.
//! - [`plan`]: building a runnable graph from a validated config.

pub mod command;
pub mod plan;
pub mod report;

pub use command::CommandWork;
pub use plan::{Plan, plan_from_config};
pub use report::LogReporter;
