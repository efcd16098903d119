//! Time sources for packet timestamps.

use crate::Seconds;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current instant, in seconds since an arbitrary epoch
pub trait Clock: Send + Sync {
    fn now(&self) -> Seconds;
}

/// Wall-clock time since the Unix epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Seconds {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Simulated time that only moves when told to.
///
/// Stored as `f64` bits so the clock can be shared across trial threads.
#[derive(Debug, Default)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Seconds) -> Self {
        Self { bits: AtomicU64::new(start.to_bits()) }
    }

    pub fn set(&self, now: Seconds) {
        self.bits.store(now.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, delta: Seconds) {
        let _ = self.bits.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
            Some((f64::from_bits(bits) + delta).to_bits())
        });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Seconds {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
