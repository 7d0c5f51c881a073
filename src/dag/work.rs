// src/dag/work.rs

//! Work and callback capabilities supplied per node by calling code.

use std::future::Future;
use std::marker::PhantomData;

use futures::future::BoxFuture;

use crate::dag::registry::Registry;
use crate::dag::result::NodeResult;

/// A unit of work attached to a node.
///
/// `action` is invoked at most once per run. Returning an error (or
/// panicking) settles the node as `Exception` with [`Work::default_value`].
pub trait Work<P, V>: Send + Sync {
    /// Produce the node's value. `registry` gives read-only access to the
    /// results already published by peers in this run.
    fn action(&self, param: P, registry: Registry) -> BoxFuture<'_, anyhow::Result<V>>;

    /// Value published whenever the node resolves to `Timeout` or
    /// `Exception`.
    fn default_value(&self) -> V;
}

/// Observer notified around a node's execution.
pub trait Callback<P, V>: Send + Sync {
    /// Called right before the work unit runs. Not called for nodes that fail
    /// fast.
    fn begin(&self) {}

    /// Called exactly once with the node's terminal result.
    fn result(&self, success: bool, param: &P, result: &NodeResult<V>) {
        let _ = (success, param, result);
    }
}

/// Callback that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallback;

impl<P, V> Callback<P, V> for NoopCallback {}

/// [`Work`] built from an async closure and a fallback value.
///
/// ```ignore
/// let work = FnWork::new(|n: u32, _registry| async move { Ok(n * 2) }, 0);
/// ```
pub struct FnWork<F, V, P = ()> {
    f: F,
    default: V,
    _param: PhantomData<fn(P)>,
}

impl<F, V, P> FnWork<F, V, P> {
    pub fn new<Fut>(f: F, default: V) -> Self
    where
        F: Fn(P, Registry) -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        Self {
            f,
            default,
            _param: PhantomData,
        }
    }
}

impl<F, Fut, P, V> Work<P, V> for FnWork<F, V, P>
where
    F: Fn(P, Registry) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    V: Clone + Send + Sync,
{
    fn action(&self, param: P, registry: Registry) -> BoxFuture<'_, anyhow::Result<V>> {
        Box::pin((self.f)(param, registry))
    }

    fn default_value(&self) -> V {
        self.default.clone()
    }
}
