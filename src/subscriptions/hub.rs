//! Subscription controller: demand counting, the shared live view and
//! ordered fan-out.

use crate::error::{Result, SourceError};
use crate::types::{Collection, Phase, SubscriberId};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::types::{Receiver, Subscription};

/// Hooks run on demand transitions.
///
/// `online` runs before the first receiver is registered and must populate
/// the live view (derived sources subscribe upstream here). `offline` runs
/// after the last receiver is gone and tears the view down.
pub(crate) trait Activation: Send + Sync {
    fn online(self: Arc<Self>);
    fn offline(self: Arc<Self>);
}

/// Activation for sources whose content outlives demand.
pub(crate) struct Persistent;

impl Activation for Persistent {
    fn online(self: Arc<Self>) {}
    fn offline(self: Arc<Self>) {}
}

/// Internal registration state.
struct Registration<C: Collection> {
    id: SubscriberId,
    /// Last event sequence published before this receiver attached.
    since: u64,
    receiver: Arc<dyn Receiver<C>>,
    active: Arc<AtomicBool>,
}

impl<C: Collection> Clone for Registration<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            since: self.since,
            receiver: Arc::clone(&self.receiver),
            active: Arc::clone(&self.active),
        }
    }
}

struct HubState<C: Collection> {
    phase: Phase,
    items: C,
    ended: bool,
    receivers: Vec<Registration<C>>,
    next_id: u64,
    published: u64,
    delivering: bool,
    queue: VecDeque<(u64, C::Event)>,
}

/// Per-source subscription controller.
///
/// Owns the live view and the ordered receiver list. Events published
/// while a fan-out is in progress are queued and delivered by the outer
/// fan-out, so every receiver sees events in commit order. A receiver only
/// gets events published after it attached.
pub(crate) struct Hub<C: Collection> {
    label: String,
    state: Mutex<HubState<C>>,
}

impl<C: Collection> Hub<C> {
    pub(crate) fn new(label: impl Into<String>, items: C) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(HubState {
                phase: Phase::Cold,
                items,
                ended: false,
                receivers: Vec::new(),
                next_id: 1,
                published: 0,
                delivering: false,
                queue: VecDeque::new(),
            }),
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.state.lock().receivers.len()
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.state.lock().items)
    }

    /// Replace the live view wholesale (mirror population and teardown).
    pub(crate) fn replace(&self, items: C) {
        self.state.lock().items = items;
    }

    /// Mutate the live view without emitting anything.
    pub(crate) fn modify<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.state.lock().items)
    }

    /// Attach a receiver, taking the source hot first if needed.
    pub(crate) fn attach(
        self: &Arc<Self>,
        activation: Arc<dyn Activation>,
        receiver: Arc<dyn Receiver<C>>,
    ) -> Subscription<C> {
        let activate = {
            let mut state = self.state.lock();
            if state.phase == Phase::Cold {
                state.phase = Phase::Warming;
                true
            } else {
                false
            }
        };
        if activate {
            debug!(source = %self.label, "source going hot");
            Arc::clone(&activation).online();
        }

        let (id, view, ended) = {
            let mut state = self.state.lock();
            state.phase = Phase::Hot;
            let id = SubscriberId(state.next_id);
            state.next_id += 1;
            let since = state.published;
            state.receivers.push(Registration {
                id,
                since,
                receiver: Arc::clone(&receiver),
                active: Arc::new(AtomicBool::new(true)),
            });
            (id, state.items.clone(), state.ended)
        };

        receiver.init(&view);
        if ended {
            receiver.end();
        }
        Subscription::new(id, Arc::clone(self), activation)
    }

    /// Deregister a receiver. Returns it, plus whether the source went cold.
    pub(crate) fn detach(&self, id: SubscriberId) -> (Option<Arc<dyn Receiver<C>>>, bool) {
        let mut state = self.state.lock();
        let Some(at) = state.receivers.iter().position(|r| r.id == id) else {
            return (None, false);
        };
        let registration = state.receivers.remove(at);
        registration.active.store(false, Ordering::Release);

        let went_cold = state.receivers.is_empty() && state.phase == Phase::Hot;
        if went_cold {
            state.phase = Phase::Cold;
            debug!(source = %self.label, "source going cold");
        }
        (Some(registration.receiver), went_cold)
    }

    /// Apply an event to the live view, then deliver it.
    pub(crate) fn publish(&self, event: C::Event) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.items.apply(&event)?;
            if !self.enqueue(&mut state, event) {
                return Ok(());
            }
        }
        self.drain()
    }

    /// Deliver an event already reflected in the live view.
    pub(crate) fn emit(&self, event: C::Event) -> Result<()> {
        {
            let mut state = self.state.lock();
            if !self.enqueue(&mut state, event) {
                return Ok(());
            }
        }
        self.drain()
    }

    /// Apply an event to the live view without delivering it.
    pub(crate) fn apply(&self, event: &C::Event) -> Result<()> {
        self.state.lock().items.apply(event)
    }

    /// Mark the source ended and tell every receiver.
    pub(crate) fn end(&self) {
        let targets: Vec<_> = {
            let mut state = self.state.lock();
            if state.ended {
                return;
            }
            state.ended = true;
            state.receivers.clone()
        };
        debug!(source = %self.label, "source ended");
        for registration in targets {
            if registration.active.load(Ordering::Acquire) {
                registration.receiver.end();
            }
        }
    }

    /// Clear the ended flag (derived sources restart from upstream).
    pub(crate) fn reopen(&self) {
        self.state.lock().ended = false;
    }

    pub(crate) fn is_ended(&self) -> bool {
        self.state.lock().ended
    }

    /// Queue an event for delivery. Returns true when the caller must drain.
    fn enqueue(&self, state: &mut HubState<C>, event: C::Event) -> bool {
        if state.receivers.is_empty() && !state.delivering {
            return false;
        }
        state.published += 1;
        let seq = state.published;
        state.queue.push_back((seq, event));
        if state.delivering {
            trace!(source = %self.label, seq, "event queued behind delivery in progress");
            return false;
        }
        state.delivering = true;
        true
    }

    fn drain(&self) -> Result<()> {
        let mut first_error: Option<SourceError> = None;
        loop {
            let (seq, event, targets) = {
                let mut state = self.state.lock();
                match state.queue.pop_front() {
                    Some((seq, event)) => {
                        let targets: Vec<_> = state
                            .receivers
                            .iter()
                            .filter(|r| r.since < seq)
                            .cloned()
                            .collect();
                        (seq, event, targets)
                    }
                    None => {
                        state.delivering = false;
                        break;
                    }
                }
            };

            trace!(source = %self.label, seq, ?event, receivers = targets.len(), "delivering event");
            for registration in targets {
                if !registration.active.load(Ordering::Acquire) {
                    continue;
                }
                if let Err(e) = registration.receiver.event(&event) {
                    warn!(
                        source = %self.label,
                        subscriber = %registration.id,
                        error = %e,
                        "receiver failed to handle event"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
