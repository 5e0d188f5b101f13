//! Driver shared by single-upstream derived sources.

use crate::error::{Result, SourceError};
use crate::events::Event;
use crate::subscriptions::hub::{Activation, Hub};
use crate::subscriptions::{Receiver, SharedSource, Subscription};
use crate::types::{Collection, Element};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::error;

/// Work deferred until after the translated event has been delivered.
pub(crate) type Cleanup = Box<dyn FnOnce() + Send>;

/// Translation from one upstream container into a downstream sequence.
///
/// Implementations keep whatever bookkeeping they need to re-express an
/// upstream event in the downstream index space. Callbacks run under the
/// node's lock.
pub(crate) trait Operator: Send + 'static {
    type Input: Collection;
    type Output: Element;

    /// Build bookkeeping from the upstream view and return the initial
    /// downstream content.
    fn populate(&mut self, view: &Self::Input) -> Vec<Self::Output>;

    /// Re-express an upstream event. `None` when nothing downstream changes.
    fn translate(
        &mut self,
        event: &<Self::Input as Collection>::Event,
    ) -> Result<Option<Event<Self::Output>>>;

    /// Drop all bookkeeping when the node goes cold.
    fn reset(&mut self);

    fn take_cleanup(&mut self) -> Option<Cleanup> {
        None
    }
}

struct NodeState<O: Operator> {
    op: O,
    upstream: Option<Subscription<O::Input>>,
    /// Set once the upstream view has been received.
    live: bool,
}

/// A derived source: owns a downstream hub and, while hot, one upstream
/// subscription.
pub(crate) struct Node<O: Operator> {
    hub: Arc<Hub<Vec<O::Output>>>,
    upstream: SharedSource<O::Input>,
    state: Mutex<NodeState<O>>,
}

impl<O: Operator> Node<O> {
    pub(crate) fn new(label: &str, upstream: SharedSource<O::Input>, op: O) -> Arc<Self> {
        Arc::new(Self {
            hub: Arc::new(Hub::new(label, Vec::new())),
            upstream,
            state: Mutex::new(NodeState {
                op,
                upstream: None,
                live: false,
            }),
        })
    }

    pub(crate) fn subscribe(
        self: &Arc<Self>,
        receiver: Arc<dyn Receiver<Vec<O::Output>>>,
    ) -> Subscription<Vec<O::Output>> {
        let activation: Arc<dyn Activation> = Arc::clone(self) as Arc<dyn Activation>;
        self.hub.attach(activation, receiver)
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    pub(crate) fn is_hot(&self) -> bool {
        self.hub.phase().is_hot()
    }

    fn populate(&self, view: &O::Input) {
        let content = {
            let mut state = self.state.lock();
            state.live = true;
            state.op.populate(view)
        };
        self.hub.replace(content);
    }

    fn forward(&self, event: &<O::Input as Collection>::Event) -> Result<()> {
        let (translated, cleanup) = {
            let mut state = self.state.lock();
            if !state.live {
                return Ok(());
            }
            let translated = state
                .op
                .translate(event)
                .map_err(|e| self.lost_track("failed to translate upstream event", e))?;
            (translated, state.op.take_cleanup())
        };

        let delivered = match translated {
            Some(event) => {
                self.hub
                    .apply(&event)
                    .map_err(|e| self.lost_track("translated event does not fit mirror", e))?;
                self.hub.emit(event)
            }
            None => Ok(()),
        };
        if let Some(cleanup) = cleanup {
            cleanup();
        }
        delivered
    }

    fn lost_track(&self, context: &str, cause: SourceError) -> SourceError {
        error!(source = %self.hub.label(), error = %cause, "{}", context);
        SourceError::unreachable(self.hub.label(), cause)
    }
}

impl<O: Operator> Activation for Node<O> {
    fn online(self: Arc<Self>) {
        let link = Link {
            node: Arc::downgrade(&self),
        };
        let subscription = self.upstream.subscribe_with(Arc::new(link));
        self.state.lock().upstream = Some(subscription);
    }

    fn offline(self: Arc<Self>) {
        let (upstream, cleanup) = {
            let mut state = self.state.lock();
            state.live = false;
            state.op.reset();
            (state.upstream.take(), state.op.take_cleanup())
        };
        if let Some(subscription) = upstream {
            subscription.release();
        }
        self.hub.replace(Vec::new());
        self.hub.reopen();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

/// Upstream receiver feeding a [`Node`]. Holds the node weakly so an
/// upstream registration never keeps a derived source alive.
struct Link<O: Operator> {
    node: Weak<Node<O>>,
}

impl<O: Operator> Receiver<O::Input> for Link<O> {
    fn init(&self, view: &O::Input) {
        if let Some(node) = self.node.upgrade() {
            node.populate(view);
        }
    }

    fn event(&self, event: &<O::Input as Collection>::Event) -> Result<()> {
        match self.node.upgrade() {
            Some(node) => node.forward(event),
            None => Ok(()),
        }
    }

    fn end(&self) {
        if let Some(node) = self.node.upgrade() {
            node.hub.end();
        }
    }
}
