// Time sources for the sequencer and orchestrator.
// Both components only read the clock; the host decides when to call tick().

use std::cell::Cell;
use std::rc::Rc;

use crate::types::Timestamp;

/// Monotonic time source.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Clock driven by the host. Clones share the same reading, so a test (or the
/// WASM bridge) can keep a handle and move time forward.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ts: Timestamp) -> Self {
        let clock = Self::new();
        clock.set(ts);
        clock
    }

    pub fn set(&self, ts: Timestamp) {
        self.now.set(ts.as_micros());
    }

    /// Sets the reading from a host value such as `performance.now()`.
    pub fn set_millis(&self, ms: f64) {
        self.set(Timestamp::from_millis(ms));
    }

    pub fn advance_micros(&self, us: u64) {
        self.now.set(self.now.get().saturating_add(us));
    }

    pub fn advance_millis(&self, ms: f64) {
        self.advance_micros(crate::types::millis_to_micros(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.now.get())
    }
}

/// Wall-clock source for native hosts, measured from construction.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.origin.elapsed().as_micros() as u64)
    }
}
