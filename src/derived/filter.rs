//! Predicate filter over a sequence source.

use crate::error::Result;
use crate::events::{Change, Draft, Event};
use crate::subscriptions::{Receiver, SharedSource, Source, Subscription};
use crate::types::Element;
use std::sync::Arc;

use super::node::{Node, Operator};

pub(crate) type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

pub(crate) struct FilterOp<T> {
    predicate: Predicate<T>,
    /// One mark per upstream element: did it pass?
    marks: Vec<bool>,
    passing: usize,
}

impl<T: Element> FilterOp<T> {
    fn new(predicate: Predicate<T>) -> Self {
        Self {
            predicate,
            marks: Vec::new(),
            passing: 0,
        }
    }

    /// Downstream position of upstream `index`: the number of passing
    /// elements before it.
    fn downstream_index(&self, index: usize) -> usize {
        self.marks[..index].iter().filter(|m| **m).count()
    }
}

impl<T: Element> Operator for FilterOp<T> {
    type Input = Vec<T>;
    type Output = T;

    fn populate(&mut self, view: &Vec<T>) -> Vec<T> {
        self.marks = view.iter().map(|v| (self.predicate)(v)).collect();
        let passed: Vec<T> = view
            .iter()
            .zip(&self.marks)
            .filter(|(_, pass)| **pass)
            .map(|(v, _)| v.clone())
            .collect();
        self.passing = passed.len();
        passed
    }

    fn translate(&mut self, event: &Event<T>) -> Result<Option<Event<T>>> {
        let mut draft = Draft::new(self.passing);
        for change in event.changes(self.marks.len())? {
            match change {
                Change::Splice {
                    index,
                    delete,
                    insert,
                } => {
                    let at = self.downstream_index(index);
                    let removed = self.marks[index..index + delete]
                        .iter()
                        .filter(|m| **m)
                        .count();
                    let marks: Vec<bool> = insert.iter().map(|v| (self.predicate)(v)).collect();
                    let kept: Vec<T> = insert
                        .iter()
                        .zip(&marks)
                        .filter(|(_, pass)| **pass)
                        .map(|(v, _)| v.clone())
                        .collect();
                    self.marks.splice(index..index + delete, marks);
                    self.passing = self.passing - removed + kept.len();
                    draft.range_replace(at, removed, kept)?;
                }
                Change::Assign { index, value } => {
                    let at = self.downstream_index(index);
                    let was = self.marks[index];
                    let now = (self.predicate)(value);
                    self.marks[index] = now;
                    match (was, now) {
                        (true, true) => draft.assign(at, value.clone())?,
                        (true, false) => {
                            self.passing -= 1;
                            draft.range_replace(at, 1, Vec::new())?;
                        }
                        (false, true) => {
                            self.passing += 1;
                            draft.range_replace(at, 0, vec![value.clone()])?;
                        }
                        (false, false) => {}
                    }
                }
            }
        }
        Ok(draft.commit())
    }

    fn reset(&mut self) {
        self.marks = Vec::new();
        self.passing = 0;
    }
}

/// Elements of an upstream sequence that pass a predicate, in upstream
/// order.
///
/// The predicate runs once per inserted or assigned element; removals never
/// re-evaluate it. Changes confined to failing elements emit nothing.
pub struct Filtered<T: Element> {
    node: Arc<Node<FilterOp<T>>>,
}

impl<T: Element> Clone for Filtered<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T: Element> Filtered<T> {
    pub fn new<F>(upstream: SharedSource<Vec<T>>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            node: Node::new("filter", upstream, FilterOp::new(Arc::new(predicate))),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.node.subscriber_count()
    }

    pub fn is_hot(&self) -> bool {
        self.node.is_hot()
    }
}

impl<T: Element> Source<Vec<T>> for Filtered<T> {
    fn subscribe_with(&self, receiver: Arc<dyn Receiver<Vec<T>>>) -> Subscription<Vec<T>> {
        self.node.subscribe(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::Manual;
    use parking_lot::Mutex;

    fn evens(source: &Manual<i32>) -> Filtered<i32> {
        Filtered::new(Arc::new(source.clone()), |v: &i32| v % 2 == 0)
    }

    fn record(filtered: &Filtered<i32>) -> (Subscription<Vec<i32>>, Arc<Mutex<Vec<Event<i32>>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let sub = filtered.subscribe_fn(move |e: &Event<i32>| sink.lock().push(e.clone()));
        (sub, events)
    }

    #[test]
    fn test_assign_into_passing_inserts() {
        let source = Manual::from_vec(vec![1, 2, 3, 4, 5]);
        let filtered = evens(&source);
        let (sub, events) = record(&filtered);
        assert_eq!(sub.snapshot().unwrap(), vec![2, 4]);

        source.assign(0, 2).unwrap();

        assert_eq!(*events.lock(), vec![Event::Prepend { values: vec![2] }]);
        assert_eq!(sub.snapshot().unwrap(), vec![2, 2, 4]);
    }

    #[test]
    fn test_assign_transitions() {
        let source = Manual::from_vec(vec![2, 3, 4]);
        let filtered = evens(&source);
        let (sub, events) = record(&filtered);

        source.assign(0, 6).unwrap(); // pass -> pass
        source.assign(2, 5).unwrap(); // pass -> fail
        source.assign(1, 9).unwrap(); // fail -> fail

        assert_eq!(
            *events.lock(),
            vec![Event::Assign { index: 0, value: 6 }, Event::RemoveLast]
        );
        assert_eq!(sub.snapshot().unwrap(), vec![6]);
    }

    #[test]
    fn test_removing_failing_element_is_silent() {
        let source = Manual::from_vec(vec![1, 2, 3]);
        let filtered = evens(&source);
        let (sub, events) = record(&filtered);

        source.remove_first().unwrap();
        source.remove_last().unwrap();

        assert!(events.lock().is_empty());
        assert_eq!(sub.snapshot().unwrap(), vec![2]);
    }

    #[test]
    fn test_splice_maps_to_filtered_positions() {
        let source = Manual::from_vec(vec![2, 1, 4, 3, 6]);
        let filtered = evens(&source);
        let (sub, events) = record(&filtered);

        // Upstream 4, 3 replaced with 8, 7, 10; downstream 4 becomes 8, 10.
        source.range_replace(2, 2, [8, 7, 10]).unwrap();

        assert_eq!(
            *events.lock(),
            vec![Event::Splice {
                index: 1,
                delete: 1,
                insert: vec![8, 10]
            }]
        );
        assert_eq!(sub.snapshot().unwrap(), vec![2, 8, 10, 6]);
    }

    #[test]
    fn test_goes_cold_and_restarts() {
        let source = Manual::from_vec(vec![1, 2]);
        let filtered = evens(&source);

        let sub = filtered.subscribe_fn(|_: &Event<i32>| {});
        assert!(filtered.is_hot());
        assert_eq!(source.subscriber_count(), 1);
        sub.release();
        assert!(!filtered.is_hot());
        assert_eq!(source.subscriber_count(), 0);

        source.push(4).unwrap();
        let sub = filtered.subscribe_fn(|_: &Event<i32>| {});
        assert_eq!(sub.snapshot().unwrap(), vec![2, 4]);
    }
}
