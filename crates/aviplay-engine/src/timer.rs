//! Periodic frame timer.
//!
//! The timer thread only posts [`Event::TimerTick`]; all work happens on the
//! control thread.

use crate::event::{Event, EventPoster};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct TimerState {
    period: Option<Duration>,
    /// Bumped on every arm/disarm so the thread drops a stale schedule.
    generation: u64,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct TimerShared {
    state: Mutex<TimerState>,
    changed: Condvar,
}

/// A disarmed-by-default periodic timer backed by one thread.
#[derive(Debug)]
pub(crate) struct PeriodicTimer {
    shared: Arc<TimerShared>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTimer {
    pub(crate) fn spawn(poster: EventPoster) -> std::io::Result<Self> {
        let shared = Arc::new(TimerShared::default());
        let handle = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("avi-timer".to_string())
                .spawn(move || run(&shared, &poster))?
        };
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Start ticking every `period`, replacing any running schedule.
    pub(crate) fn arm(&self, period: Duration) {
        let mut state = self.shared.state.lock();
        state.period = Some(period.max(Duration::from_micros(1)));
        state.generation += 1;
        drop(state);
        self.shared.changed.notify_all();
    }

    pub(crate) fn disarm(&self) {
        let mut state = self.shared.state.lock();
        state.period = None;
        state.generation += 1;
        drop(state);
        self.shared.changed.notify_all();
    }

    #[cfg(test)]
    fn is_armed(&self) -> bool {
        self.shared.state.lock().period.is_some()
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.changed.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(shared: &TimerShared, poster: &EventPoster) {
    let mut state = shared.state.lock();
    while !state.shutdown {
        let Some(period) = state.period else {
            shared.changed.wait(&mut state);
            continue;
        };

        let generation = state.generation;
        let mut next = Instant::now() + period;
        while !state.shutdown && state.generation == generation {
            shared.changed.wait_until(&mut state, next);
            if state.shutdown || state.generation != generation {
                break;
            }
            let now = Instant::now();
            if now < next {
                continue;
            }
            if !poster.post(Event::TimerTick) {
                return;
            }
            next += period;
            // Missed ticks collapse into one; resync to the clock.
            if next <= now {
                next = now + period;
            }
        }
    }
}
