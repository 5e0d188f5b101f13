//! Sorted view of a sequence source.

use crate::error::Result;
use crate::events::{Change, Draft, Event};
use crate::subscriptions::{Receiver, SharedSource, Source, Subscription};
use crate::types::Element;
use std::cmp::Ordering;
use std::sync::Arc;

use super::node::{Node, Operator};

type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

pub(crate) struct SortOp<T> {
    compare: Comparator<T>,
    /// Sorted position of each upstream element, in upstream order.
    positions: Vec<usize>,
    sorted: Vec<T>,
}

impl<T: Element> SortOp<T> {
    /// Remove upstream element `index`, returning its former sorted
    /// position.
    fn take(&mut self, index: usize) -> usize {
        let at = self.positions.remove(index);
        self.sorted.remove(at);
        for position in &mut self.positions {
            if *position > at {
                *position -= 1;
            }
        }
        at
    }

    /// Insert `value` as upstream element `index`, after every element it
    /// compares equal to. Returns its sorted position.
    fn put(&mut self, index: usize, value: T) -> usize {
        let at = self
            .sorted
            .partition_point(|x| (self.compare)(x, &value) != Ordering::Greater);
        self.sorted.insert(at, value);
        for position in &mut self.positions {
            if *position >= at {
                *position += 1;
            }
        }
        self.positions.insert(index, at);
        at
    }

    /// True when `value` may replace the element at sorted position `at`
    /// without moving.
    fn stays(&self, at: usize, value: &T) -> bool {
        let after_prev = at == 0 || (self.compare)(&self.sorted[at - 1], value) != Ordering::Greater;
        let before_next = at + 1 >= self.sorted.len()
            || (self.compare)(value, &self.sorted[at + 1]) == Ordering::Less;
        after_prev && before_next
    }
}

impl<T: Element> Operator for SortOp<T> {
    type Input = Vec<T>;
    type Output = T;

    fn populate(&mut self, view: &Vec<T>) -> Vec<T> {
        let mut order: Vec<usize> = (0..view.len()).collect();
        order.sort_by(|&a, &b| (self.compare)(&view[a], &view[b]));

        self.positions = vec![0; view.len()];
        for (at, &index) in order.iter().enumerate() {
            self.positions[index] = at;
        }
        self.sorted = order.iter().map(|&i| view[i].clone()).collect();
        self.sorted.clone()
    }

    fn translate(&mut self, event: &Event<T>) -> Result<Option<Event<T>>> {
        let mut draft = Draft::new(self.sorted.len());
        for change in event.changes(self.positions.len())? {
            match change {
                Change::Splice {
                    index,
                    delete,
                    insert,
                } => {
                    for _ in 0..delete {
                        let at = self.take(index);
                        draft.range_replace(at, 1, Vec::new())?;
                    }
                    for (offset, value) in insert.iter().enumerate() {
                        let at = self.put(index + offset, value.clone());
                        draft.range_replace(at, 0, vec![value.clone()])?;
                    }
                }
                Change::Assign { index, value } => {
                    let at = self.positions[index];
                    if self.stays(at, value) {
                        self.sorted[at] = value.clone();
                        draft.assign(at, value.clone())?;
                    } else {
                        let from = self.take(index);
                        let to = self.put(index, value.clone());
                        draft.range_replace(from, 1, Vec::new())?;
                        draft.range_replace(to, 0, vec![value.clone()])?;
                    }
                }
            }
        }
        Ok(draft.commit())
    }

    fn reset(&mut self) {
        self.positions = Vec::new();
        self.sorted = Vec::new();
    }
}

/// Upstream elements kept in comparator order.
///
/// Ties keep arrival order: an element inserted next to equal elements goes
/// after all of them. An assignment that changes an element's rank is
/// delivered as a removal at the old position plus an insertion at the new
/// one.
pub struct Sorted<T: Element> {
    node: Arc<Node<SortOp<T>>>,
}

impl<T: Element> Clone for Sorted<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T: Element> Sorted<T> {
    pub fn new<F>(upstream: SharedSource<Vec<T>>, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        let op = SortOp {
            compare: Arc::new(compare),
            positions: Vec::new(),
            sorted: Vec::new(),
        };
        Self {
            node: Node::new("sort", upstream, op),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.node.subscriber_count()
    }

    pub fn is_hot(&self) -> bool {
        self.node.is_hot()
    }
}

impl<T: Element> Source<Vec<T>> for Sorted<T> {
    fn subscribe_with(&self, receiver: Arc<dyn Receiver<Vec<T>>>) -> Subscription<Vec<T>> {
        self.node.subscribe(receiver)
    }
}
