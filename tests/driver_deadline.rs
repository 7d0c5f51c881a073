// tests/driver_deadline.rs

mod common;

use std::time::Duration;

use tokio::runtime::Handle;

use dagfire::dag::{Fault, GraphBuilder, NodeSpec, NodeState, Outcome};
use dagfire::engine::{GraphDriver, begin_work};
use dagfire::errors::DagfireError;
use dagfire_test_utils::{ScriptedWork, Tally, with_timeout};

use common::init_tracing;

#[tokio::test]
async fn slow_root_times_out_and_driver_reports_false() {
    init_tracing();
    let root_tally = Tally::new();
    let next_tally = Tally::new();

    let mut b = GraphBuilder::new();
    let root = b
        .add_node(
            NodeSpec::new(
                "root",
                (),
                ScriptedWork::returning(1u32, 99, &root_tally).with_delay(Duration::from_millis(1000)),
            )
            .with_callback(root_tally.callback()),
        )
        .unwrap();
    let next = b
        .add_node(
            NodeSpec::new("next", (), ScriptedWork::returning(2u32, 0, &next_tally))
                .with_callback(next_tally.callback()),
        )
        .unwrap();
    b.depend_on(&next, &root, true).unwrap();
    let graph = b.build().unwrap();

    let settled = with_timeout(GraphDriver::current().begin_work(
        Duration::from_millis(100),
        &graph,
        &[root.index()],
    ))
    .await
    .unwrap();

    assert!(!settled);

    let root_result = graph.result(&root).unwrap();
    assert_eq!(root_result.outcome(), Outcome::Timeout);
    assert_eq!(root_result.value(), Some(&99));
    assert!(matches!(root_result.fault(), Some(Fault::Timeout)));
    assert_eq!(root_tally.begins(), 1);
    assert_eq!(root_tally.results(), vec![(false, Outcome::Timeout)]);

    // The sweep also settles nodes the run never reached.
    assert_eq!(graph.state_of("next"), Some(NodeState::Error));
    assert_eq!(graph.result(&next).unwrap().outcome(), Outcome::Timeout);
    assert_eq!(next_tally.actions(), 0);
    assert_eq!(next_tally.results(), vec![(false, Outcome::Timeout)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn late_work_result_is_discarded_after_the_sweep() {
    init_tracing();
    let tally = Tally::new();

    let mut b = GraphBuilder::new();
    let root = b
        .add_node(
            NodeSpec::new(
                "root",
                (),
                ScriptedWork::returning(1u32, 0, &tally).with_delay(Duration::from_millis(150)),
            )
            .with_callback(tally.callback()),
        )
        .unwrap();
    let graph = b.build().unwrap();

    let settled = GraphDriver::current()
        .begin_work(Duration::from_millis(30), &graph, &[root.index()])
        .await
        .unwrap();
    assert!(!settled);

    // The root task keeps running after the driver returns; let it finish.
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(tally.actions(), 1);
    assert_eq!(tally.results(), vec![(false, Outcome::Timeout)]);
    assert_eq!(graph.result(&root).unwrap().outcome(), Outcome::Timeout);
}

#[tokio::test]
async fn settled_graph_reports_true() {
    init_tracing();
    let mut b = GraphBuilder::new();
    let root = b
        .add_node(NodeSpec::new("root", (), ScriptedWork::returning(1u32, 0, &Tally::new())))
        .unwrap();
    let graph = b.build().unwrap();

    let settled = begin_work(Duration::from_secs(1), &Handle::current(), &graph, &[root.index()])
        .await
        .unwrap();
    assert!(settled);
    assert_eq!(graph.state_of("root"), Some(NodeState::Finished));
}

#[tokio::test]
async fn empty_roots_are_rejected() {
    let mut b = GraphBuilder::new();
    b.add_node(NodeSpec::new("root", (), ScriptedWork::returning(1u32, 0, &Tally::new())))
        .unwrap();
    let graph = b.build().unwrap();

    let err = GraphDriver::current()
        .begin_work(Duration::from_secs(1), &graph, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DagfireError::EmptyRoots));
    assert_eq!(graph.state_of("root"), Some(NodeState::Init));
}

#[tokio::test]
async fn roots_from_another_graph_are_rejected() {
    let mut big = GraphBuilder::new();
    big.add_node(NodeSpec::new("a", (), ScriptedWork::returning(1u32, 0, &Tally::new())))
        .unwrap();
    let foreign = big
        .add_node(NodeSpec::new("b", (), ScriptedWork::returning(1u32, 0, &Tally::new())))
        .unwrap();

    let mut small = GraphBuilder::new();
    small
        .add_node(NodeSpec::new("only", (), ScriptedWork::returning(1u32, 0, &Tally::new())))
        .unwrap();
    let graph = small.build().unwrap();

    let err = GraphDriver::current()
        .begin_work(Duration::from_secs(1), &graph, &[foreign.index()])
        .await
        .unwrap_err();
    assert!(matches!(err, DagfireError::NodeNotFound(_)));
}
