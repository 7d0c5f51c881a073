// src/config/mod.rs

//! Configuration loading and validation for dagfire.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file from disk.
//! - `validate.rs`: node ids, dependency references, acyclicity.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, NodeConfig, RawConfigFile};
pub use validate::validate_config;
