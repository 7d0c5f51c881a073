//! Work units, callbacks and clocks that record what the engine did to them.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use dagfire::clock::ClockSource;
use dagfire::dag::{Callback, NodeResult, Outcome, Registry, Work};

/// Counters shared between a [`ScriptedWork`], the tally callback and the test.
#[derive(Debug, Default)]
pub struct Tally {
    actions: AtomicUsize,
    begins: AtomicUsize,
    results: Mutex<Vec<(bool, Outcome)>>,
}

impl Tally {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// How often the work unit's `action` was invoked.
    pub fn actions(&self) -> usize {
        self.actions.load(Ordering::SeqCst)
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    /// Every `(success, outcome)` pair delivered to the callback.
    pub fn results(&self) -> Vec<(bool, Outcome)> {
        self.results.lock().clone()
    }

    pub fn result_count(&self) -> usize {
        self.results.lock().len()
    }

    /// Callback feeding this tally.
    pub fn callback(self: &Arc<Self>) -> TallyCallback {
        TallyCallback(self.clone())
    }
}

/// Callback that records into a [`Tally`].
#[derive(Debug, Clone)]
pub struct TallyCallback(Arc<Tally>);

impl<P, V> Callback<P, V> for TallyCallback {
    fn begin(&self) {
        self.0.begins.fetch_add(1, Ordering::SeqCst);
    }

    fn result(&self, success: bool, _param: &P, result: &NodeResult<V>) {
        self.0.results.lock().push((success, result.outcome()));
    }
}

#[derive(Debug, Clone)]
enum Behaviour<V> {
    Return(V),
    Fail(String),
    Panic(String),
}

/// Scripted work unit: sleeps for an optional delay, then returns a value,
/// fails or panics.
pub struct ScriptedWork<V> {
    behaviour: Behaviour<V>,
    default: V,
    delay: Duration,
    tally: Arc<Tally>,
}

impl<V: fmt::Debug> fmt::Debug for ScriptedWork<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedWork")
            .field("behaviour", &self.behaviour)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl<V> ScriptedWork<V> {
    fn with(behaviour: Behaviour<V>, default: V, tally: &Arc<Tally>) -> Self {
        Self {
            behaviour,
            default,
            delay: Duration::ZERO,
            tally: tally.clone(),
        }
    }

    pub fn returning(value: V, default: V, tally: &Arc<Tally>) -> Self {
        Self::with(Behaviour::Return(value), default, tally)
    }

    pub fn failing(message: &str, default: V, tally: &Arc<Tally>) -> Self {
        Self::with(Behaviour::Fail(message.to_string()), default, tally)
    }

    pub fn panicking(message: &str, default: V, tally: &Arc<Tally>) -> Self {
        Self::with(Behaviour::Panic(message.to_string()), default, tally)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl<P, V> Work<P, V> for ScriptedWork<V>
where
    P: Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn action(&self, _param: P, _registry: Registry) -> BoxFuture<'_, anyhow::Result<V>> {
        self.tally.actions.fetch_add(1, Ordering::SeqCst);
        let behaviour = self.behaviour.clone();
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match behaviour {
                Behaviour::Return(value) => Ok(value),
                Behaviour::Fail(message) => Err(anyhow::anyhow!(message)),
                Behaviour::Panic(message) => panic!("{message}"),
            }
        })
    }

    fn default_value(&self) -> V {
        self.default.clone()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
