use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use dagfire::dag::{Graph, GraphBuilder, NodeHandle, NodeIndex, NodeSpec, NodeState, Outcome};
use dagfire::engine::GraphDriver;
use dagfire_test_utils::{ScriptedWork, Tally};

/// Edges only point from a lower to a higher index, so every generated
/// graph is acyclic.
#[derive(Debug, Clone)]
struct DagShape {
    nodes: usize,
    edges: Vec<(usize, usize, bool)>,
    failing: Vec<bool>,
}

fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = DagShape> {
    (2..=max_nodes).prop_flat_map(|nodes| {
        (
            proptest::collection::vec((0..nodes, 0..nodes, any::<bool>()), 0..nodes * 2),
            proptest::collection::vec(prop::bool::weighted(0.2), nodes),
        )
            .prop_map(move |(raw, failing)| {
                let mut seen = BTreeSet::new();
                let edges = raw
                    .into_iter()
                    .filter_map(|(a, b, must)| {
                        let (up, down) = (a.min(b), a.max(b));
                        (up != down && seen.insert((up, down))).then_some((up, down, must))
                    })
                    .collect();
                DagShape {
                    nodes,
                    edges,
                    failing,
                }
            })
    })
}

struct Built {
    graph: Arc<Graph>,
    handles: Vec<NodeHandle<(), u32>>,
    tallies: Vec<Arc<Tally>>,
}

fn build(shape: &DagShape) -> Built {
    let mut b = GraphBuilder::new();
    let mut handles = Vec::new();
    let mut tallies = Vec::new();

    for i in 0..shape.nodes {
        let tally = Tally::new();
        let work = if shape.failing[i] {
            ScriptedWork::failing("scripted failure", 0u32, &tally)
        } else {
            ScriptedWork::returning(i as u32, 0, &tally)
        };
        let handle = b
            .add_node(NodeSpec::new(format!("n{i}"), (), work).with_callback(tally.callback()))
            .unwrap();
        handles.push(handle);
        tallies.push(tally);
    }
    for &(up, down, must) in &shape.edges {
        b.depend_on(&handles[down], &handles[up], must).unwrap();
    }

    Built {
        graph: b.build().unwrap(),
        handles,
        tallies,
    }
}

fn roots(graph: &Graph) -> Vec<NodeIndex> {
    graph
        .nodes()
        .filter(|n| n.dependencies().is_empty())
        .map(|n| n.index())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_node_settles_once(shape in dag_strategy(10)) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        let built = build(&shape);
        let roots = roots(&built.graph);

        let settled = runtime
            .block_on(GraphDriver::new(runtime.handle().clone()).begin_work(
                Duration::from_secs(5),
                &built.graph,
                &roots,
            ))
            .unwrap();
        prop_assert!(settled);

        for (handle, tally) in built.handles.iter().zip(&built.tallies) {
            let node = built.graph.node(handle.index()).unwrap();
            prop_assert!(node.state().is_terminal(), "{} is {}", node.id(), node.state());
            prop_assert_eq!(tally.result_count(), 1, "{}", node.id());
            prop_assert!(tally.actions() <= 1);
            prop_assert_eq!(tally.actions(), tally.begins());

            let result = built.graph.result(handle).unwrap();
            prop_assert_ne!(result.outcome(), Outcome::Default);
            prop_assert_eq!(result.outcome() == Outcome::Success, node.state() == NodeState::Finished);
        }
    }

    #[test]
    fn executed_nodes_saw_their_must_dependencies_succeed(shape in dag_strategy(10)) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        let built = build(&shape);
        let roots = roots(&built.graph);

        runtime
            .block_on(GraphDriver::new(runtime.handle().clone()).begin_work(
                Duration::from_secs(5),
                &built.graph,
                &roots,
            ))
            .unwrap();

        for (handle, tally) in built.handles.iter().zip(&built.tallies) {
            if tally.actions() == 0 {
                continue;
            }
            let node = built.graph.node(handle.index()).unwrap();
            let deps = node.dependencies();
            let gating: Vec<_> = if deps.len() == 1 {
                deps.to_vec()
            } else {
                deps.iter().filter(|e| e.must).copied().collect()
            };
            for edge in gating {
                let upstream = built.graph.node(edge.upstream).unwrap();
                prop_assert_eq!(
                    upstream.outcome(),
                    Outcome::Success,
                    "{} ran although {} did not succeed",
                    node.id(),
                    upstream.id()
                );
            }
        }
    }
}
