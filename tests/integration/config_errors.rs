// tests/integration/config_errors.rs

use std::io::Write;

use tempfile::NamedTempFile;

use dagfire::config::{load_and_validate, load_from_path};
use dagfire::errors::DagfireError;
use dagfire_test_utils::builders::{ConfigFileBuilder, NodeConfigBuilder};

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_cycle_returns_structured_error() {
    let file = config_file(
        r#"
[node.A]
cmd = "echo A"
after = ["B"]

[node.B]
cmd = "echo B"
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagfireError::DagCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('A') || msg.contains('B'));
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_dependency_returns_config_error() {
    let file = config_file(
        r#"
[node.A]
cmd = "echo A"
after = ["NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagfireError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_invalid_toml_returns_toml_error() {
    let file = config_file("[node.A\ncmd = ");
    assert!(matches!(
        load_from_path(file.path()),
        Err(DagfireError::TomlError(_))
    ));
}

#[test]
fn test_missing_file_returns_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Dagfire.toml");
    assert!(matches!(
        load_and_validate(&missing),
        Err(DagfireError::IoError(_))
    ));
}

#[test]
fn test_config_section_is_read() {
    let file = config_file(
        r#"
[config]
deadline_ms = 250
clock_tick_ms = 5
check_downstream = false

[node.fetch]
cmd = "echo 1"
param = "x"
default = "0"

[node.report]
cmd = "echo 2"
after_any = ["fetch"]
check_downstream = true
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.config.deadline_ms, 250);
    assert_eq!(cfg.config.clock_tick_ms, 5);
    assert!(!cfg.config.check_downstream);
    assert_eq!(cfg.node["fetch"].param, "x");
    assert_eq!(cfg.node["fetch"].default, "0");
    assert!(cfg.node["report"].effective_check_downstream(false));
    assert_eq!(cfg.roots(), vec!["fetch".to_string()]);
}

#[test]
fn test_builder_produces_valid_config() {
    let cfg = ConfigFileBuilder::new()
        .with_deadline_ms(50)
        .with_node("a", NodeConfigBuilder::new("echo a").build())
        .with_node("b", NodeConfigBuilder::new("echo b").after("a").build())
        .build();

    assert_eq!(cfg.config.deadline_ms, 50);
    assert_eq!(cfg.node["b"].after, vec!["a".to_string()]);
}

#[test]
fn test_builder_config_with_both_dependency_kinds_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_node("a", NodeConfigBuilder::new("echo a").build())
        .with_node(
            "b",
            NodeConfigBuilder::new("echo b").after("a").after_any("a").build(),
        )
        .build_raw();

    assert!(matches!(
        dagfire::config::ConfigFile::try_from(raw),
        Err(DagfireError::ConfigError(msg)) if msg.contains("both")
    ));
}
