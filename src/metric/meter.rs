use std::fmt;
use super::lock;
use std::sync::{Arc, Mutex};
use time::{Clock, MonotonicClock};

const TICK_INTERVAL_NS: u64 = 5 * 1_000_000_000;
const TICK_INTERVAL_SECS: f64 = 5.0;

/// Exponentially weighted moving average of an event rate, ticked every five
/// seconds.
#[derive(Debug, Clone)]
struct Ewma {
    alpha: f64,
    rate: f64,
    uncounted: u64,
    initialized: bool,
}

impl Ewma {
    fn new(minutes: f64) -> Ewma {
        Ewma {
            alpha: 1.0 - (-TICK_INTERVAL_SECS / 60.0 / minutes).exp(),
            rate: 0.0,
            uncounted: 0,
            initialized: false,
        }
    }

    fn update(&mut self, n: u64) {
        self.uncounted = self.uncounted.saturating_add(n);
    }

    fn tick(&mut self) {
        let instant_rate = self.uncounted as f64 / TICK_INTERVAL_SECS;
        self.uncounted = 0;
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }
}

#[derive(Debug)]
struct State {
    count: u64,
    last_tick: u64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl State {
    fn tick_if_necessary(&mut self, now: u64) {
        let age = now.saturating_sub(self.last_tick);
        if age > TICK_INTERVAL_NS {
            self.last_tick = now - age % TICK_INTERVAL_NS;
            for _ in 0..(age / TICK_INTERVAL_NS) {
                self.m1.tick();
                self.m5.tick();
                self.m15.tick();
            }
        }
    }
}

/// Measures the rate at which events occur.
///
/// All rates are in events per second. Reporters convert them into the
/// configured rate unit on extraction.
pub struct Meter {
    clock: Arc<dyn Clock>,
    start: u64,
    state: Mutex<State>,
}

impl Default for Meter {
    fn default() -> Meter {
        Meter::with_clock(Arc::new(MonotonicClock::default()))
    }
}

impl Meter {
    /// Create a new `Meter` on the system monotonic clock.
    pub fn new() -> Meter {
        Meter::default()
    }

    /// Create a new `Meter` reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Meter {
        let start = clock.tick();
        Meter {
            clock: clock,
            start: start,
            state: Mutex::new(State {
                count: 0,
                last_tick: start,
                m1: Ewma::new(1.0),
                m5: Ewma::new(5.0),
                m15: Ewma::new(15.0),
            }),
        }
    }

    /// Record a single event.
    pub fn mark(&self) {
        self.mark_n(1)
    }

    /// Record `n` events.
    pub fn mark_n(&self, n: u64) {
        let now = self.clock.tick();
        let mut state = lock(&self.state);
        state.tick_if_necessary(now);
        state.count = state.count.saturating_add(n);
        state.m1.update(n);
        state.m5.update(n);
        state.m15.update(n);
    }

    /// Total events recorded.
    pub fn count(&self) -> u64 {
        lock(&self.state).count
    }

    /// Events per second since this meter was created.
    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let elapsed = self.clock.tick().saturating_sub(self.start);
        if elapsed == 0 {
            return 0.0;
        }
        count as f64 / elapsed as f64 * 1_000_000_000.0
    }

    /// One-minute moving average rate, events per second.
    pub fn one_minute_rate(&self) -> f64 {
        self.rate(|s| &s.m1)
    }

    /// Five-minute moving average rate, events per second.
    pub fn five_minute_rate(&self) -> f64 {
        self.rate(|s| &s.m5)
    }

    /// Fifteen-minute moving average rate, events per second.
    pub fn fifteen_minute_rate(&self) -> f64 {
        self.rate(|s| &s.m15)
    }

    fn rate<F>(&self, which: F) -> f64
    where
        F: Fn(&State) -> &Ewma,
    {
        let now = self.clock.tick();
        let mut state = lock(&self.state);
        state.tick_if_necessary(now);
        which(&*state).rate
    }
}

impl fmt::Debug for Meter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Meter {{ count: {} }}", self.count())
    }
}
