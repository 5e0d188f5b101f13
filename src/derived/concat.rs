//! Concatenation of two sequence sources.

use crate::error::{Result, SourceError};
use crate::events::{Change, Draft, Event};
use crate::subscriptions::hub::{Activation, Hub};
use crate::subscriptions::{Receiver, SharedSource, Source, Subscription};
use crate::types::Element;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

struct Half<T: Element> {
    subscription: Option<Subscription<Vec<T>>>,
    len: usize,
    live: bool,
    ended: bool,
}

impl<T: Element> Default for Half<T> {
    fn default() -> Self {
        Self {
            subscription: None,
            len: 0,
            live: false,
            ended: false,
        }
    }
}

struct ConcatState<T: Element> {
    left: Half<T>,
    right: Half<T>,
}

impl<T: Element> ConcatState<T> {
    fn half(&mut self, side: Side) -> &mut Half<T> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

struct ConcatInner<T: Element> {
    hub: Arc<Hub<Vec<T>>>,
    left: SharedSource<Vec<T>>,
    right: SharedSource<Vec<T>>,
    state: Mutex<ConcatState<T>>,
}

impl<T: Element> ConcatInner<T> {
    fn populate(&self, side: Side, view: &Vec<T>) {
        {
            let mut state = self.state.lock();
            let half = state.half(side);
            half.len = view.len();
            half.live = true;
        }
        self.hub.modify(|items| match side {
            Side::Left => {
                items.splice(0..0, view.iter().cloned());
            }
            Side::Right => items.extend(view.iter().cloned()),
        });
    }

    fn forward(&self, side: Side, event: &Event<T>) -> Result<()> {
        let translated = {
            let mut state = self.state.lock();
            let total = state.left.len + state.right.len;
            let offset = match side {
                Side::Left => 0,
                Side::Right => state.left.len,
            };
            let half = state.half(side);
            if !half.live {
                return Ok(());
            }
            let translated = Self::offset(event, half.len, offset, total)
                .map_err(|e| self.lost_track(e))?;
            half.len = event.len_after(half.len).map_err(|e| self.lost_track(e))?;
            translated
        };

        match translated {
            Some(event) => {
                self.hub.apply(&event).map_err(|e| self.lost_track(e))?;
                self.hub.emit(event)
            }
            None => Ok(()),
        }
    }

    /// Re-express a side-local event at `offset` in a sequence of `total`.
    fn offset(event: &Event<T>, len: usize, offset: usize, total: usize) -> Result<Option<Event<T>>> {
        let mut draft = Draft::new(total);
        for change in event.changes(len)? {
            match change {
                Change::Splice {
                    index,
                    delete,
                    insert,
                } => draft.range_replace(offset + index, delete, insert.to_vec())?,
                Change::Assign { index, value } => draft.assign(offset + index, value.clone())?,
            }
        }
        Ok(draft.commit())
    }

    fn end(&self, side: Side) {
        let finished = {
            let mut state = self.state.lock();
            state.half(side).ended = true;
            state.left.ended && state.right.ended
        };
        if finished {
            self.hub.end();
        }
    }

    fn lost_track(&self, cause: SourceError) -> SourceError {
        error!(source = %self.hub.label(), error = %cause, "failed to translate upstream event");
        SourceError::unreachable(self.hub.label(), cause)
    }
}

impl<T: Element> Activation for ConcatInner<T> {
    fn online(self: Arc<Self>) {
        for side in [Side::Left, Side::Right] {
            let link = SideLink {
                inner: Arc::downgrade(&self),
                side,
            };
            let upstream = match side {
                Side::Left => &self.left,
                Side::Right => &self.right,
            };
            let subscription = upstream.subscribe_with(Arc::new(link));
            self.state.lock().half(side).subscription = Some(subscription);
        }
    }

    fn offline(self: Arc<Self>) {
        let (left, right) = {
            let mut state = self.state.lock();
            let left = std::mem::take(&mut state.left);
            let right = std::mem::take(&mut state.right);
            (left.subscription, right.subscription)
        };
        for subscription in [left, right].into_iter().flatten() {
            subscription.release();
        }
        self.hub.replace(Vec::new());
        self.hub.reopen();
    }
}

struct SideLink<T: Element> {
    inner: Weak<ConcatInner<T>>,
    side: Side,
}

impl<T: Element> Receiver<Vec<T>> for SideLink<T> {
    fn init(&self, view: &Vec<T>) {
        if let Some(inner) = self.inner.upgrade() {
            inner.populate(self.side, view);
        }
    }

    fn event(&self, event: &Event<T>) -> Result<()> {
        match self.inner.upgrade() {
            Some(inner) => inner.forward(self.side, event),
            None => Ok(()),
        }
    }

    fn end(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.end(self.side);
        }
    }
}

/// Two sequence sources, one after the other.
///
/// Events from the right-hand source are offset by the current length of
/// the left-hand one. The concatenation ends once both sides have ended.
pub struct Concatenated<T: Element> {
    inner: Arc<ConcatInner<T>>,
}

impl<T: Element> Clone for Concatenated<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Element> Concatenated<T> {
    pub fn new(left: SharedSource<Vec<T>>, right: SharedSource<Vec<T>>) -> Self {
        Self {
            inner: Arc::new(ConcatInner {
                hub: Arc::new(Hub::new("concat", Vec::new())),
                left,
                right,
                state: Mutex::new(ConcatState {
                    left: Half::default(),
                    right: Half::default(),
                }),
            }),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.hub.subscriber_count()
    }

    pub fn is_hot(&self) -> bool {
        self.inner.hub.phase().is_hot()
    }
}

impl<T: Element> Source<Vec<T>> for Concatenated<T> {
    fn subscribe_with(&self, receiver: Arc<dyn Receiver<Vec<T>>>) -> Subscription<Vec<T>> {
        let activation: Arc<dyn Activation> = Arc::clone(&self.inner) as Arc<dyn Activation>;
        self.inner.hub.attach(activation, receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::Manual;

    fn concat(left: &Manual<i32>, right: &Manual<i32>) -> Concatenated<i32> {
        Concatenated::new(Arc::new(left.clone()), Arc::new(right.clone()))
    }

    #[test]
    fn test_right_events_are_offset() {
        let left = Manual::from_vec(vec![1, 2]);
        let right = Manual::from_vec(vec![10]);
        let joined = concat(&left, &right);

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let sub = joined.subscribe_fn(move |e: &Event<i32>| sink.lock().push(e.clone()));
        assert_eq!(sub.snapshot().unwrap(), vec![1, 2, 10]);

        right.prepend([9]).unwrap();
        left.push(3).unwrap();
        right.assign(1, 11).unwrap();

        assert_eq!(
            *events.lock(),
            vec![
                Event::Splice {
                    index: 2,
                    delete: 0,
                    insert: vec![9]
                },
                Event::Splice {
                    index: 2,
                    delete: 0,
                    insert: vec![3]
                },
                Event::Assign {
                    index: 4,
                    value: 11
                },
            ]
        );
        assert_eq!(sub.snapshot().unwrap(), vec![1, 2, 3, 9, 11]);
    }

    #[test]
    fn test_ends_when_both_sides_end() {
        struct Ends(Arc<Mutex<u32>>);
        impl Receiver<Vec<i32>> for Ends {
            fn event(&self, _event: &Event<i32>) -> Result<()> {
                Ok(())
            }
            fn end(&self) {
                *self.0.lock() += 1;
            }
        }

        let left = Manual::new();
        let right = Manual::new();
        let joined = concat(&left, &right);
        let ended = Arc::new(Mutex::new(0));
        let _sub = joined.subscribe(Ends(Arc::clone(&ended)));

        left.end();
        assert_eq!(*ended.lock(), 0);
        right.end();
        assert_eq!(*ended.lock(), 1);
    }

    #[test]
    fn test_release_unsubscribes_both_sides() {
        let left = Manual::from_vec(vec![1]);
        let right = Manual::from_vec(vec![2]);
        let joined = concat(&left, &right);

        let sub = joined.subscribe_fn(|_: &Event<i32>| {});
        assert_eq!(left.subscriber_count() + right.subscriber_count(), 2);
        sub.release();
        assert_eq!(left.subscriber_count() + right.subscriber_count(), 0);
        assert!(!joined.is_hot());
    }
}
