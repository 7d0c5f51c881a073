// src/clock.rs

//! Cheap millisecond clock used for budget accounting.
//!
//! The engine reads the time on every node entry and exit. Instead of
//! sampling the OS clock each time, [`TickingClock`] keeps an atomic that a
//! background thread refreshes on a short fixed period, so staleness is
//! bounded by that period.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use tracing::{debug, warn};

/// Source of a monotonically non-decreasing millisecond timestamp.
pub trait ClockSource: Send + Sync + Debug {
    fn now_millis(&self) -> u64;
}

/// Default refresh period of the ticker thread.
pub const DEFAULT_TICK: Duration = Duration::from_millis(1);

static GLOBAL: Lazy<Arc<TickingClock>> = Lazy::new(|| Arc::new(TickingClock::start(DEFAULT_TICK)));

#[derive(Debug)]
struct Shared {
    origin: Instant,
    now: AtomicU64,
}

impl Shared {
    fn refresh(&self) {
        let elapsed = self.origin.elapsed().as_millis() as u64;
        self.now.fetch_max(elapsed, Ordering::Release);
    }
}

/// Clock refreshed by a background ticker thread.
///
/// Timestamps count milliseconds since the clock was started. The ticker
/// exits on its own once the clock is dropped.
#[derive(Debug)]
pub struct TickingClock {
    shared: Arc<Shared>,
    period: Duration,
    ticking: bool,
}

impl TickingClock {
    pub fn start(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let shared = Arc::new(Shared {
            origin: Instant::now(),
            now: AtomicU64::new(0),
        });

        let weak: Weak<Shared> = Arc::downgrade(&shared);
        let spawned = thread::Builder::new()
            .name("dagfire-clock".to_string())
            .spawn(move || {
                while let Some(shared) = weak.upgrade() {
                    shared.refresh();
                    drop(shared);
                    thread::sleep(period);
                }
                debug!("clock ticker stopped");
            });

        let ticking = match spawned {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "failed to spawn clock ticker; timestamps will refresh on read");
                false
            }
        };

        Self {
            shared,
            period,
            ticking,
        }
    }

    /// Process-wide clock with the default 1 ms period.
    pub fn global() -> Arc<TickingClock> {
        GLOBAL.clone()
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl ClockSource for TickingClock {
    fn now_millis(&self) -> u64 {
        if !self.ticking {
            self.shared.refresh();
        }
        self.shared.now.load(Ordering::Acquire)
    }
}
