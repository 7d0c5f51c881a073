#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use dagfire::clock::ClockSource;
use dagfire::dag::{FnWork, Graph, Registry, Work};
use dagfire::engine::GraphEngine;

pub use dagfire_test_utils::init_tracing;

/// Engine over `graph` on the current runtime, with a fresh registry.
pub fn engine(graph: &Arc<Graph>, clock: Arc<dyn ClockSource>) -> GraphEngine {
    GraphEngine::new(
        graph.clone(),
        Registry::new(graph.clone()),
        clock,
        Handle::current(),
    )
}

/// Work that appends `id` to `order` and returns it.
pub fn recording(id: &str, order: &Arc<Mutex<Vec<String>>>) -> impl Work<(), String> + 'static {
    let id = id.to_string();
    let order = order.clone();
    FnWork::new(
        move |_: (), _: Registry| {
            let id = id.clone();
            let order = order.clone();
            async move {
                order.lock().push(id.clone());
                Ok::<_, anyhow::Error>(id)
            }
        },
        String::new(),
    )
}
