//! Quiet-interval debouncing of metadata events.
//!
//! A single commit touches a dozen files under `.git` (index, lockfiles, refs,
//! reflogs). The debouncer collapses such a burst into one settle signal fired once
//! nothing has happened for the quiet interval:
//!
//! ```text
//! Idle --event--> Pending(deadline = now + quiet) --deadline--> Fired --> Idle
//!                   ^                |
//!                   +----event-------+   (deadline moves, nothing fires)
//! ```
//!
//! The settle signal carries no payload; consumers re-query repository state.

use crate::events::RawEvent;
use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace};

/// Current state of the debounce timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    /// No pending activity.
    Idle,
    /// Activity seen; fires at `deadline` unless another event arrives first.
    Pending {
        /// When the settle signal fires.
        deadline: Instant,
    },
}

/// Coalesces raw events into settle signals.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    state: DebounceState,
    fired: u64,
}

impl Debouncer {
    /// Create an idle debouncer with the given quiet interval.
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            state: DebounceState::Idle,
            fired: 0,
        }
    }

    /// Configured quiet interval.
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Current timer state.
    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Number of settle signals fired so far.
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Register activity at `now`: (re)arm the timer.
    pub fn record_event(&mut self, now: Instant) {
        self.state = DebounceState::Pending {
            deadline: now + self.quiet,
        };
    }

    /// Transition `Pending -> Fired -> Idle` if the deadline has passed.
    ///
    /// Returns `true` exactly once per settled burst.
    pub fn poll_expired(&mut self, now: Instant) -> bool {
        match self.state {
            DebounceState::Pending { deadline } if now >= deadline => {
                self.state = DebounceState::Idle;
                self.fired += 1;
                true
            }
            _ => false,
        }
    }

    /// Drive the state machine from `events`, calling `on_settle` on every fire.
    ///
    /// Returns when the event stream ends. A pending timer at that point is
    /// discarded without firing. `on_settle` runs on the loop task, so it should
    /// hand long work off (spawn) rather than block.
    pub async fn run<S, F>(mut self, mut events: S, mut on_settle: F)
    where
        S: Stream<Item = RawEvent> + Unpin,
        F: FnMut(),
    {
        debug!("Debouncer started with quiet interval {:?}", self.quiet);

        loop {
            let deadline = match self.state {
                DebounceState::Pending { deadline } => Some(deadline),
                DebounceState::Idle => None,
            };
            let timer = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now));

            tokio::select! {
                biased;

                next = events.next() => match next {
                    Some(event) => {
                        trace!("Debounce reset by {} {}", event.kind.as_str(), event.path.display());
                        self.record_event(Instant::now());
                    }
                    None => {
                        debug!("Event stream closed; debouncer stopping");
                        break;
                    }
                },

                _ = timer, if deadline.is_some() => {
                    if self.poll_expired(Instant::now()) {
                        info!("Repository activity settled, checking for new commit");
                        on_settle();
                    }
                }
            }
        }
    }
}
