//! Batching core shared by every root source.

use crate::error::{Result, SourceError};
use crate::subscriptions::hub::{Hub, Persistent};
use crate::subscriptions::{Receiver, Subscription};
use crate::types::{Coalesce, Collection, Phase};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{trace, warn};

struct BatchState<C: Collection> {
    /// Open hold scopes.
    depth: usize,
    /// Events recorded while held, seeded when the outermost scope opened.
    pending: Option<C::Draft>,
    ended: bool,
}

/// Owned content plus the hold/batch machinery.
///
/// Mutations always land in the content immediately. Outside a hold they
/// are delivered at once; inside one they are folded into a draft that is
/// committed when the outermost hold is released.
pub(crate) struct Root<C: Collection> {
    hub: Arc<Hub<C>>,
    batch: Mutex<BatchState<C>>,
}

impl<C: Collection> Root<C> {
    pub(crate) fn new(label: impl Into<String>, items: C) -> Self {
        Self {
            hub: Arc::new(Hub::new(label, items)),
            batch: Mutex::new(BatchState {
                depth: 0,
                pending: None,
                ended: false,
            }),
        }
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        self.hub.with(f)
    }

    /// Attach a receiver. Inside a hold, what has been recorded so far is
    /// delivered first, so the new receiver's initial view and the events it
    /// later gets never overlap.
    pub(crate) fn subscribe(&self, receiver: Arc<dyn Receiver<C>>) -> Subscription<C> {
        loop {
            match self.flush_pending(true) {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => {
                    warn!(
                        source = %self.hub.label(),
                        error = %e,
                        "failed to flush held events before attach"
                    );
                }
            }
        }
        self.hub.attach(Arc::new(Persistent), receiver)
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    pub(crate) fn is_hot(&self) -> bool {
        self.hub.phase() == Phase::Hot
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.batch.lock().ended {
            return Err(SourceError::Ended);
        }
        Ok(())
    }

    /// Apply a validated-on-apply event and deliver or record it.
    pub(crate) fn commit(&self, event: C::Event) -> Result<()> {
        let mut batch = self.batch.lock();
        if batch.ended {
            return Err(SourceError::Ended);
        }
        if batch.depth > 0 {
            self.hub.apply(&event)?;
            if let Some(pending) = batch.pending.as_mut() {
                pending
                    .record(event)
                    .map_err(|e| SourceError::unreachable("batch draft rejected applied event", e))?;
            }
            return Ok(());
        }
        drop(batch);
        self.hub.publish(event)
    }

    pub(crate) fn hold(&self) -> Hold<'_, C> {
        let mut batch = self.batch.lock();
        if batch.depth == 0 {
            batch.pending = Some(self.hub.with(C::draft));
        }
        batch.depth += 1;
        Hold {
            root: self,
            released: false,
        }
    }

    fn resume(&self) -> Result<()> {
        let pending = {
            let mut batch = self.batch.lock();
            match batch.depth {
                0 => {
                    return Err(SourceError::Unreachable(
                        "hold released more often than taken".to_string(),
                    ))
                }
                1 => {
                    batch.depth = 0;
                    batch.pending.take()
                }
                _ => {
                    batch.depth -= 1;
                    None
                }
            }
        };

        match pending.and_then(Coalesce::commit) {
            Some(event) => {
                trace!(source = %self.hub.label(), ?event, "flushing held events");
                self.hub.emit(event)
            }
            None => Ok(()),
        }
    }

    /// Deliver the events recorded by the open hold, if any. With `reseed`
    /// the hold stays open over a fresh draft. Returns whether an event was
    /// delivered.
    fn flush_pending(&self, reseed: bool) -> Result<bool> {
        let event = {
            let mut batch = self.batch.lock();
            let Some(pending) = batch.pending.take() else {
                return Ok(false);
            };
            if reseed {
                batch.pending = Some(self.hub.with(C::draft));
            }
            pending.commit()
        };
        match event {
            Some(event) => {
                trace!(source = %self.hub.label(), ?event, "flushing held events");
                self.hub.emit(event)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Mark the source ended. Held events are delivered before receivers
    /// hear about the end; nothing is delivered afterwards.
    pub(crate) fn end(&self) {
        {
            let mut batch = self.batch.lock();
            if batch.ended {
                return;
            }
            batch.ended = true;
        }
        if let Err(e) = self.flush_pending(false) {
            warn!(
                source = %self.hub.label(),
                error = %e,
                "failed to flush held events before end"
            );
        }
        self.hub.end();
    }
}

/// Suspends delivery from a root source while alive.
///
/// Mutations made while any hold is open are coalesced and delivered as a
/// single event when the outermost hold is released. Dropping the guard
/// releases it; call [`Hold::release`] to observe delivery errors.
#[must_use = "events are delivered when the hold is released"]
pub struct Hold<'a, C: Collection> {
    root: &'a Root<C>,
    released: bool,
}

impl<C: Collection> Hold<'_, C> {
    /// Release the hold, delivering the coalesced event if this was the
    /// outermost one.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.root.resume()
    }
}

impl<C: Collection> Drop for Hold<'_, C> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.root.resume() {
            warn!(source = %self.root.hub.label(), error = %e, "failed to flush held events");
        }
    }
}
