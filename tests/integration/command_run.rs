// tests/integration/command_run.rs
//
// Runs real shell commands, so these are unix-only.

#![cfg(unix)]

use std::io::Write;
use std::time::Duration;

use clap::Parser;
use tempfile::NamedTempFile;

use dagfire::cli::CliArgs;
use dagfire::dag::{NodeState, Outcome};
use dagfire::engine::GraphDriver;
use dagfire::exec::plan_from_config;
use dagfire_test_utils::builders::{ConfigFileBuilder, NodeConfigBuilder};
use dagfire_test_utils::{init_tracing, with_timeout};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commands_see_param_and_dependency_values() {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_node("greet", NodeConfigBuilder::new("echo hello").build())
        .with_node(
            "shout",
            NodeConfigBuilder::new("printf '%s-%s' \"$DAGFIRE_DEP_GREET\" \"$DAGFIRE_PARAM\"")
                .param("world")
                .after("greet")
                .build(),
        )
        .build();

    let plan = plan_from_config(&cfg).unwrap();
    let roots = plan.roots(&[]).unwrap();

    let settled = with_timeout(GraphDriver::current().begin_work(
        Duration::from_secs(4),
        &plan.graph,
        &roots,
    ))
    .await
    .unwrap();

    assert!(settled);
    assert_eq!(plan.result("greet").unwrap().value().map(String::as_str), Some("hello"));
    assert_eq!(
        plan.result("shout").unwrap().value().map(String::as_str),
        Some("hello-world")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_command_publishes_default_and_fails_dependents() {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_node(
            "broken",
            NodeConfigBuilder::new("echo oops >&2; exit 3")
                .default_value("fallback")
                .build(),
        )
        .with_node("after_broken", NodeConfigBuilder::new("echo never").after("broken").build())
        .build();

    let plan = plan_from_config(&cfg).unwrap();
    let roots = plan.roots(&[]).unwrap();

    let settled = with_timeout(GraphDriver::current().begin_work(
        Duration::from_secs(4),
        &plan.graph,
        &roots,
    ))
    .await
    .unwrap();
    assert!(settled);

    let broken = plan.result("broken").unwrap();
    assert_eq!(broken.outcome(), Outcome::Exception);
    assert_eq!(broken.value().map(String::as_str), Some("fallback"));
    assert!(broken.fault().unwrap().to_string().contains("exited with code 3"));

    assert_eq!(plan.graph.state_of("after_broken"), Some(NodeState::Error));
    assert_eq!(plan.result("after_broken").unwrap().outcome(), Outcome::Exception);
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_reports_success_and_failure() {
    init_tracing();
    let ok = write_config(
        r#"
[node.a]
cmd = "echo a"

[node.b]
cmd = "echo b"
after = ["a"]
"#,
    );
    let path = ok.path().to_string_lossy().to_string();
    let args = CliArgs::parse_from(["dagfire", "--config", path.as_str()]);
    assert!(dagfire::run(args).await.unwrap());

    let failing = write_config(
        r#"
[node.a]
cmd = "exit 1"
"#,
    );
    let path = failing.path().to_string_lossy().to_string();
    let args = CliArgs::parse_from(["dagfire", "--config", path.as_str()]);
    assert!(!dagfire::run(args).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_only_reports_nodes_reached_from_the_chosen_roots() {
    init_tracing();
    let file = write_config(
        r#"
[node.a]
cmd = "echo a"

[node.b]
cmd = "echo b"
after = ["a"]

[node.unrelated]
cmd = "exit 1"
"#,
    );
    let path = file.path().to_string_lossy().to_string();

    let args = CliArgs::parse_from(["dagfire", "--config", path.as_str(), "--root", "a"]);
    assert!(with_timeout(dagfire::run(args)).await.unwrap());

    let args = CliArgs::parse_from(["dagfire", "--config", path.as_str()]);
    assert!(!with_timeout(dagfire::run(args)).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_times_out_under_a_short_deadline() {
    init_tracing();
    let slow = write_config(
        r#"
[node.sleepy]
cmd = "sleep 2"
"#,
    );
    let path = slow.path().to_string_lossy().to_string();
    let args = CliArgs::parse_from([
        "dagfire",
        "--config",
        path.as_str(),
        "--deadline-ms",
        "50",
    ]);
    assert!(!with_timeout(dagfire::run(args)).await.unwrap());
}

#[tokio::test]
async fn dry_run_and_unknown_root() {
    let file = write_config(
        r#"
[node.a]
cmd = "echo a"
"#,
    );
    let path = file.path().to_string_lossy().to_string();

    let args = CliArgs::parse_from(["dagfire", "--config", path.as_str(), "--dry-run"]);
    assert!(dagfire::run(args).await.unwrap());

    let args = CliArgs::parse_from(["dagfire", "--config", path.as_str(), "--root", "ghost"]);
    let err = dagfire::run(args).await.unwrap_err();
    assert!(err.to_string().contains("ghost"));
}
