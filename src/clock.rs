//! Monotonic clock abstraction.
//!
//! The core never reads the wall clock directly — every timer in C1/C5
//! (glitch coalescing, end-of-frame gaps, dedup windows, verification
//! windows) is expressed in milliseconds or microseconds since some
//! arbitrary epoch. This keeps the pipeline deterministic and testable:
//! tests drive a `FakeClock` instead of waiting on real time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A source of monotonically non-decreasing milliseconds.
///
/// Clock moving backward is undefined behaviour for the pipeline and is not
/// guarded against, matching the design note that this is out of scope.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;

    fn now_us(&self) -> u64 {
        self.now_ms() * 1000
    }
}

/// Real monotonic clock, backed by `std::time::Instant`.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

/// A manually advanced clock for deterministic tests. Cloning shares the
/// same underlying counter, so a test can hand one handle to a `Decoder`
/// and keep another to advance time between frames.
pub struct FakeClock {
    ms: std::sync::Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            ms: std::sync::Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn set_ms(&self, ms: u64) {
        self.ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta: u64) {
        self.ms.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for FakeClock {
    fn clone(&self) -> Self {
        Self {
            ms: std::sync::Arc::clone(&self.ms),
        }
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }
}
