//! Channel-backed receivers for consuming a source from another thread.

use crate::error::Result;
use crate::types::Collection;
use crossbeam_channel::{
    bounded, Receiver as ChannelReceiver, RecvError, RecvTimeoutError, Sender, TryRecvError,
    TrySendError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::types::{Receiver, Source, Subscription};

/// Configuration for a channel receiver.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    /// Max buffered deliveries before the receiver stops forwarding.
    /// Default: 1000
    pub buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { buffer_size: 1000 }
    }
}

/// What a channel receiver forwards.
#[derive(Clone, Debug)]
pub enum Delivery<C: Collection> {
    /// Live view at attach time.
    Init(C),
    /// One change.
    Event(C::Event),
    /// The source ended.
    End,
    /// The subscription was released.
    Unsubscribed,
}

struct Forwarder<C: Collection> {
    sender: Sender<Delivery<C>>,
    overflowed: Arc<AtomicBool>,
}

impl<C: Collection> Forwarder<C> {
    /// Drops the delivery once the consumer has fallen behind.
    fn forward(&self, delivery: Delivery<C>) {
        if self.overflowed.load(Ordering::Acquire) {
            return;
        }
        match self.sender.try_send(delivery) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    capacity = ?self.sender.capacity(),
                    "channel receiver overflowed, dropping further deliveries"
                );
                self.overflowed.store(true, Ordering::Release);
            }
            // Consumer hung up; nothing left to notify.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl<C: Collection> Receiver<C> for Forwarder<C> {
    fn init(&self, view: &C) {
        self.forward(Delivery::Init(view.clone()));
    }

    fn event(&self, event: &C::Event) -> Result<()> {
        self.forward(Delivery::Event(event.clone()));
        Ok(())
    }

    fn end(&self) {
        self.forward(Delivery::End);
    }

    fn unsubscribed(&self) {
        self.forward(Delivery::Unsubscribed);
    }
}

/// Subscription whose deliveries are read from a bounded channel.
pub struct ChannelHandle<C: Collection> {
    subscription: Subscription<C>,
    receiver: ChannelReceiver<Delivery<C>>,
    overflowed: Arc<AtomicBool>,
}

impl<C: Collection> ChannelHandle<C> {
    /// Receive the next delivery (blocking).
    pub fn recv(&self) -> std::result::Result<Delivery<C>, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a delivery (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<Delivery<C>, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<Delivery<C>, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn subscription(&self) -> &Subscription<C> {
        &self.subscription
    }

    /// True once the buffer filled up and deliveries started being dropped.
    pub fn is_overflowed(&self) -> bool {
        self.overflowed.load(Ordering::Acquire)
    }

    pub fn release(&self) {
        self.subscription.release();
    }
}

/// Subscribe to `source`, forwarding every delivery into a bounded channel.
pub fn channel<C, S>(source: &S, config: ChannelConfig) -> ChannelHandle<C>
where
    C: Collection,
    S: Source<C> + ?Sized,
{
    let (sender, receiver) = bounded(config.buffer_size);
    let overflowed = Arc::new(AtomicBool::new(false));
    let forwarder = Forwarder {
        sender,
        overflowed: Arc::clone(&overflowed),
    };
    let subscription = source.subscribe_with(Arc::new(forwarder));
    ChannelHandle {
        subscription,
        receiver,
        overflowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::manual::Manual;

    #[test]
    fn test_forwards_init_events_and_release() {
        let source = Manual::from_vec(vec![1]);
        let handle = channel(&source, ChannelConfig::default());

        source.push(2).unwrap();
        handle.release();

        assert!(matches!(handle.try_recv(), Ok(Delivery::Init(v)) if v == vec![1]));
        assert!(matches!(
            handle.try_recv(),
            Ok(Delivery::Event(Event::Append { values })) if values == vec![2]
        ));
        assert!(matches!(handle.try_recv(), Ok(Delivery::Unsubscribed)));
        assert!(handle.try_recv().is_err());
    }

    #[test]
    fn test_slow_consumer_overflows() {
        let source = Manual::new();
        let handle = channel(&source, ChannelConfig { buffer_size: 2 });

        for i in 0..10 {
            source.push(i).unwrap();
        }

        assert!(handle.is_overflowed());
        // Init plus the first event fit; everything after was dropped.
        assert!(matches!(handle.try_recv(), Ok(Delivery::Init(_))));
        assert!(matches!(handle.try_recv(), Ok(Delivery::Event(_))));
        assert!(handle.try_recv().is_err());
    }

    #[test]
    fn test_consumes_from_another_thread() {
        let source = Manual::new();
        let handle = channel(&source, ChannelConfig::default());
        source.push("a".to_string()).unwrap();
        source.end();

        let received = std::thread::spawn(move || {
            let mut seen = Vec::new();
            loop {
                match handle.recv_timeout(Duration::from_millis(100)) {
                    Ok(Delivery::End) | Err(_) => break,
                    Ok(delivery) => seen.push(delivery),
                }
            }
            seen.len()
        })
        .join()
        .unwrap();

        assert_eq!(received, 2);
    }
}
