//! Event coalescer.
//!
//! A single serial agent drains an unbounded channel of cluster events and
//! decides when to trigger a DAG rebuild. Bursts of events (a deploy
//! touching a Service, its Endpoints and three Ingresses in the same
//! second) collapse into one rebuild: each event resets a holdoff timer,
//! bounded by a max delay so a constant trickle of churn can't starve
//! rebuilds forever.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tracing::debug;

use crate::domain::ClusterEvent;

/// Monotonic counter identifying a rebuild. Consumers use this to detect
/// whether the DAG they're holding is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Sequence(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentState {
    Idle,
    Buffering,
    Rebuilding,
}

/// Handle used by the source cache to publish events into the coalescer.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ClusterEvent>,
}

impl EventSender {
    pub fn send(&self, event: ClusterEvent) {
        // The receiver only drops when the agent task has stopped; a send
        // error there just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

/// Callback invoked once per coalesced rebuild.
pub trait RebuildTrigger: Send + Sync + 'static {
    fn rebuild(&self, sequence: Sequence);
}

impl<F> RebuildTrigger for F
where
    F: Fn(Sequence) + Send + Sync + 'static,
{
    fn rebuild(&self, sequence: Sequence) {
        self(sequence)
    }
}

pub struct Coalescer {
    holdoff: Duration,
    max_delay: Duration,
}

impl Coalescer {
    pub fn new(holdoff: Duration, max_delay: Duration) -> Self {
        Self { holdoff, max_delay }
    }

    /// Spawn the agent task. Returns a sender for publishing events and a
    /// `Notify` that fires (shutdown signal) to stop the agent.
    pub fn spawn(self, trigger: Arc<dyn RebuildTrigger>) -> (EventSender, Arc<Notify>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ClusterEvent>();
        let stop = Arc::new(Notify::new());
        let stop_signal = stop.clone();
        let sequence = Arc::new(AtomicU64::new(0));

        tokio::spawn(async move {
            let mut state = AgentState::Idle;
            let mut first_event_at = Instant::now();

            loop {
                tokio::select! {
                    _ = stop_signal.notified() => {
                        debug!("event coalescer stopping");
                        return;
                    }
                    maybe_event = rx.recv() => {
                        let Some(event) = maybe_event else { return };
                        debug!(key = %event.key(), "coalescing cluster event");
                        if state == AgentState::Idle {
                            first_event_at = Instant::now();
                        }
                        state = AgentState::Buffering;

                        let deadline = first_event_at + self.max_delay;
                        let holdoff_deadline = Instant::now() + self.holdoff;
                        let wait_until = holdoff_deadline.min(deadline);

                        loop {
                            tokio::select! {
                                _ = stop_signal.notified() => return,
                                _ = tokio::time::sleep_until(wait_until) => break,
                                more = rx.recv() => {
                                    match more {
                                        Some(event) => {
                                            debug!(key = %event.key(), "coalescing cluster event");
                                            let holdoff_deadline = Instant::now() + self.holdoff;
                                            if holdoff_deadline >= deadline {
                                                break;
                                            }
                                            // Reset the holdoff window but never past the max-delay deadline.
                                            continue;
                                        }
                                        None => return,
                                    }
                                }
                            }
                        }

                        state = AgentState::Rebuilding;
                        let seq = Sequence(sequence.fetch_add(1, Ordering::SeqCst) + 1);
                        trigger.rebuild(seq);
                        state = AgentState::Idle;
                    }
                }
            }
        });

        (EventSender { tx }, stop)
    }
}
