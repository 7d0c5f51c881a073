// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DagfireError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Cycle detected in graph: {0}")]
    DagCycle(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Duplicate dependency edge: {0}")]
    DuplicateEdge(String),

    #[error("at least one root node is required to begin work")]
    EmptyRoots,

    /// The tokio runtime failed to drive a root call chain (panic or
    /// runtime shutdown).
    #[error("Scheduling error: {0}")]
    Scheduling(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DagfireError>;
