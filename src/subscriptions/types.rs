//! Receiver contract, subscription handles and the `Source` trait.

use crate::error::{Result, SourceError};
use crate::types::{Collection, SubscriberId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::hub::{Activation, Hub};

/// Consumer of a source's events.
///
/// Only `event` is required. Methods take `&self`; receivers that keep
/// state use interior mutability.
pub trait Receiver<C: Collection>: Send + Sync {
    /// Called once with the live view at attach time.
    fn init(&self, _view: &C) {}

    /// Called for each change, in commit order.
    ///
    /// An error is reported back to the mutation that triggered delivery
    /// once every other receiver has been served.
    fn event(&self, event: &C::Event) -> Result<()>;

    /// No further events will arrive.
    fn end(&self) {}

    /// Called once after the subscription has been released.
    fn unsubscribed(&self) {}
}

/// Adapts a single callback into a [`Receiver`].
pub struct FnReceiver<C, F> {
    callback: F,
    _collection: PhantomData<fn(&C)>,
}

impl<C, F> FnReceiver<C, F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _collection: PhantomData,
        }
    }
}

impl<C, F> Receiver<C> for FnReceiver<C, F>
where
    C: Collection,
    F: Fn(&C::Event) + Send + Sync,
{
    fn event(&self, event: &C::Event) -> Result<()> {
        (self.callback)(event);
        Ok(())
    }
}

/// Receiver that ignores everything. Keeps a source hot.
pub struct NullReceiver;

impl<C: Collection> Receiver<C> for NullReceiver {
    fn event(&self, _event: &C::Event) -> Result<()> {
        Ok(())
    }
}

/// Something that can be subscribed to.
pub trait Source<C: Collection>: Send + Sync {
    /// Attach a shared receiver.
    fn subscribe_with(&self, receiver: Arc<dyn Receiver<C>>) -> Subscription<C>;

    /// Attach a receiver.
    fn subscribe<R>(&self, receiver: R) -> Subscription<C>
    where
        R: Receiver<C> + 'static,
        Self: Sized,
    {
        self.subscribe_with(Arc::new(receiver))
    }

    /// Attach a single event callback.
    fn subscribe_fn<F>(&self, callback: F) -> Subscription<C>
    where
        F: Fn(&C::Event) + Send + Sync + 'static,
        Self: Sized,
    {
        self.subscribe(FnReceiver::new(callback))
    }
}

impl<C: Collection, S: Source<C> + ?Sized> Source<C> for Arc<S> {
    fn subscribe_with(&self, receiver: Arc<dyn Receiver<C>>) -> Subscription<C> {
        (**self).subscribe_with(receiver)
    }
}

/// Type-erased source handle.
pub type SharedSource<C> = Arc<dyn Source<C>>;

/// Handle to one attached receiver.
///
/// Exposes the source's live view until released. Releasing is idempotent
/// and also happens on drop; releasing the last subscription of a source
/// takes it cold.
pub struct Subscription<C: Collection> {
    id: SubscriberId,
    hub: Arc<Hub<C>>,
    activation: Arc<dyn Activation>,
    released: AtomicBool,
}

impl<C: Collection> Subscription<C> {
    pub(crate) fn new(id: SubscriberId, hub: Arc<Hub<C>>, activation: Arc<dyn Activation>) -> Self {
        Self {
            id,
            hub,
            activation,
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Read the live view.
    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> Result<R> {
        if self.is_released() {
            return Err(SourceError::Released);
        }
        Ok(self.hub.with(f))
    }

    /// Clone the live view.
    pub fn snapshot(&self) -> Result<C> {
        self.with(C::clone)
    }

    /// Detach the receiver. Only the first call has an effect.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        let (receiver, went_cold) = self.hub.detach(self.id);
        if went_cold {
            self.activation.clone().offline();
        }
        if let Some(receiver) = receiver {
            receiver.unsubscribed();
        }
    }
}

impl<C: Collection> Drop for Subscription<C> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<C: Collection> fmt::Debug for Subscription<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("source", &self.hub.label())
            .field("released", &self.is_released())
            .finish()
    }
}
