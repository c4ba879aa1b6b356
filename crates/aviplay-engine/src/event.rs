//! Control events and their delivery to the control thread.
//!
//! Events are edge-triggered: any number of posts of the same event before the
//! control thread wakes collapse into one. The control thread drains
//! everything pending on each wake and handles the set in priority order.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A signal for the control thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    /// A source is pending; begin a session.
    Start,
    /// End the active session.
    Stop,
    /// End the active session and exit the control thread.
    Deinit,
    /// The frame interval elapsed.
    TimerTick,
}

// ---------------------------------------------------------------------------
// Wake
// ---------------------------------------------------------------------------

/// The set of events collected in one wake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Wake {
    pub start: bool,
    pub stop: bool,
    pub deinit: bool,
    pub tick: bool,
}

impl Wake {
    fn insert(&mut self, event: Event) {
        match event {
            Event::Start => self.start = true,
            Event::Stop => self.stop = true,
            Event::Deinit => self.deinit = true,
            Event::TimerTick => self.tick = true,
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Create a connected poster/queue pair.
pub(crate) fn channel() -> (EventPoster, EventQueue) {
    let (tx, rx) = mpsc::channel();
    (EventPoster(tx), EventQueue(rx))
}

/// Sending half, shared by the API, the timer and the control thread itself.
#[derive(Debug, Clone)]
pub(crate) struct EventPoster(Sender<Event>);

impl EventPoster {
    /// Post an event. Returns false once the control thread is gone.
    pub(crate) fn post(&self, event: Event) -> bool {
        self.0.send(event).is_ok()
    }
}

/// Receiving half, owned by the control thread.
#[derive(Debug)]
pub(crate) struct EventQueue(Receiver<Event>);

impl EventQueue {
    /// Block for at least one event, then take everything already queued.
    ///
    /// Returns `None` when every poster has been dropped.
    pub(crate) fn wait(&self) -> Option<Wake> {
        let mut wake = Wake::default();
        wake.insert(self.0.recv().ok()?);
        loop {
            match self.0.try_recv() {
                Ok(event) => wake.insert(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        Some(wake)
    }
}
