// src/lib.rs

pub mod cli;
pub mod clock;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::clock::{DEFAULT_TICK, TickingClock};
use crate::config::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{NodeIndex, Outcome};
use crate::engine::GraphDriver;
use crate::exec::{Plan, plan_from_config};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, builds the command graph and runs it
/// under the configured deadline on the current tokio runtime.
///
/// Returns `Ok(true)` when every reached node finished successfully before
/// the deadline.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;
    if let Some(deadline_ms) = args.deadline_ms {
        cfg.config.deadline_ms = deadline_ms;
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(true);
    }

    let plan = plan_from_config(&cfg)?;
    let roots = plan.roots(&args.roots)?;
    info!(roots = ?root_ids(&plan, &roots), "initial graph roots");

    let tick = Duration::from_millis(cfg.config.clock_tick_ms);
    let clock = if tick == DEFAULT_TICK {
        TickingClock::global()
    } else {
        Arc::new(TickingClock::start(tick))
    };

    let settled = GraphDriver::current()
        .with_clock(clock)
        .begin_work(Duration::from_millis(cfg.config.deadline_ms), &plan.graph, &roots)
        .await?;

    let all_succeeded = print_summary(&plan, &roots);
    Ok(settled && all_succeeded)
}

fn root_ids<'a>(plan: &'a Plan, roots: &[NodeIndex]) -> Vec<&'a str> {
    roots
        .iter()
        .filter_map(|r| plan.graph.node(*r))
        .map(|n| n.id())
        .collect()
}

/// Print one line per reached node. Returns `true` if all of them succeeded.
fn print_summary(plan: &Plan, roots: &[NodeIndex]) -> bool {
    let reachable: HashSet<NodeIndex> = plan.graph.reachable_from(roots).into_iter().collect();
    let mut all_succeeded = true;

    for id in plan.ids() {
        let reached = plan
            .graph
            .index_of(id)
            .is_some_and(|ix| reachable.contains(&ix));
        if !reached {
            continue;
        }
        let Some(result) = plan.result(id) else {
            continue;
        };
        if result.outcome() != Outcome::Success {
            all_succeeded = false;
        }
        match result.fault() {
            Some(fault) => println!("{id}\t{}\t{fault}", result.outcome()),
            None => println!(
                "{id}\t{}\t{}",
                result.outcome(),
                result.value().map(String::as_str).unwrap_or_default()
            ),
        }
    }

    all_succeeded
}

/// Print nodes, dependencies and commands without running anything.
fn print_dry_run(cfg: &ConfigFile) {
    println!("dagfire dry-run");
    println!("  config.deadline_ms = {}", cfg.config.deadline_ms);
    println!("  config.clock_tick_ms = {}", cfg.config.clock_tick_ms);
    println!("  config.check_downstream = {}", cfg.config.check_downstream);
    println!();

    println!("nodes ({}):", cfg.node.len());
    for (id, node) in cfg.node.iter() {
        println!("  - {id}");
        println!("      cmd: {}", node.cmd);
        if !node.param.is_empty() {
            println!("      param: {}", node.param);
        }
        if !node.default.is_empty() {
            println!("      default: {}", node.default);
        }
        if !node.after.is_empty() {
            println!("      after: {:?}", node.after);
        }
        if !node.after_any.is_empty() {
            println!("      after_any: {:?}", node.after_any);
        }
        if let Some(check) = node.check_downstream {
            println!("      check_downstream: {check}");
        }
    }
    println!();
    println!("roots: {:?}", cfg.roots());

    debug!("dry-run complete (no execution)");
}
