//! Ordered `(key, value)` view of a map source.

use crate::collections::{Key, MapEvent, OrderedMap};
use crate::error::Result;
use crate::events::{Draft, Event};
use crate::subscriptions::{Receiver, SharedSource, Source, Subscription};
use crate::types::Element;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use super::node::{Node, Operator};

pub(crate) struct EntriesOp<K, V> {
    keys: Vec<K>,
    index: HashMap<K, usize>,
    _value: PhantomData<fn() -> V>,
}

impl<K: Key, V: Element> EntriesOp<K, V> {
    fn reindex(&mut self, from: usize) {
        for (i, key) in self.keys.iter().enumerate().skip(from) {
            self.index.insert(key.clone(), i);
        }
    }

    /// Every present key deleted and nothing both deleted and changed:
    /// the whole sequence can be replaced at once.
    fn replaces_everything(&self, event: &MapEvent<K, V>, doomed: &[usize]) -> bool {
        if self.keys.is_empty() || doomed.len() != self.keys.len() {
            return false;
        }
        let deleted: HashSet<&K> = event.deleted.iter().collect();
        !event.changed.iter().any(|(k, _)| deleted.contains(k))
    }
}

/// Changed pairs with repeated keys folded into their first position.
fn dedupe<K: Key, V: Element>(changed: &[(K, V)]) -> Vec<(K, V)> {
    let mut out: Vec<(K, V)> = Vec::with_capacity(changed.len());
    for (key, value) in changed {
        match out.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.clone(),
            None => out.push((key.clone(), value.clone())),
        }
    }
    out
}

impl<K: Key, V: Element> Operator for EntriesOp<K, V> {
    type Input = OrderedMap<K, V>;
    type Output = (K, V);

    fn populate(&mut self, view: &OrderedMap<K, V>) -> Vec<(K, V)> {
        self.keys = view.keys().cloned().collect();
        self.index.clear();
        self.reindex(0);
        view.entries().to_vec()
    }

    fn translate(&mut self, event: &MapEvent<K, V>) -> Result<Option<Event<(K, V)>>> {
        let len = self.keys.len();
        let mut doomed: Vec<usize> = event
            .deleted
            .iter()
            .filter_map(|k| self.index.get(k).copied())
            .collect();
        doomed.sort_unstable();
        doomed.dedup();

        let mut draft = Draft::new(len);
        if self.replaces_everything(event, &doomed) {
            let entries = dedupe(&event.changed);
            self.keys = entries.iter().map(|(k, _)| k.clone()).collect();
            self.index.clear();
            self.reindex(0);
            draft.range_replace(0, len, entries)?;
            return Ok(draft.commit());
        }

        for &at in doomed.iter().rev() {
            let key = self.keys.remove(at);
            self.index.remove(&key);
            draft.range_replace(at, 1, Vec::new())?;
        }
        if let Some(&first) = doomed.first() {
            self.reindex(first);
        }

        for (key, value) in &event.changed {
            let pair = (key.clone(), value.clone());
            match self.index.get(key) {
                Some(&at) => draft.assign(at, pair)?,
                None => {
                    self.index.insert(key.clone(), self.keys.len());
                    self.keys.push(key.clone());
                    draft.append(vec![pair])?;
                }
            }
        }
        Ok(draft.commit())
    }

    fn reset(&mut self) {
        self.keys = Vec::new();
        self.index = HashMap::new();
    }
}

/// A map source as a sequence of `(key, value)` pairs in key insertion
/// order.
///
/// Updates to present keys become assignments; new keys are appended.
/// Deletions are applied in descending position order. A change that
/// deletes every present key is delivered as one range replacement.
pub struct Entries<K: Key, V: Element> {
    node: Arc<Node<EntriesOp<K, V>>>,
}

impl<K: Key, V: Element> Clone for Entries<K, V> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<K: Key, V: Element> Entries<K, V> {
    pub fn new(upstream: SharedSource<OrderedMap<K, V>>) -> Self {
        let op = EntriesOp {
            keys: Vec::new(),
            index: HashMap::new(),
            _value: PhantomData,
        };
        Self {
            node: Node::new("entries", upstream, op),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.node.subscriber_count()
    }

    pub fn is_hot(&self) -> bool {
        self.node.is_hot()
    }
}

impl<K: Key, V: Element> Source<Vec<(K, V)>> for Entries<K, V> {
    fn subscribe_with(
        &self,
        receiver: Arc<dyn Receiver<Vec<(K, V)>>>,
    ) -> Subscription<Vec<(K, V)>> {
        self.node.subscribe(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::ManualMap;
    use parking_lot::Mutex;

    type Pair = (&'static str, i32);

    fn watch(
        source: &ManualMap<&'static str, i32>,
    ) -> (Subscription<Vec<Pair>>, Arc<Mutex<Vec<Event<Pair>>>>) {
        let entries = Entries::new(Arc::new(source.clone()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let sub = entries.subscribe_fn(move |e: &Event<Pair>| sink.lock().push(e.clone()));
        (sub, events)
    }

    fn abc() -> ManualMap<&'static str, i32> {
        [("a", 1), ("b", 2), ("c", 3)].into_iter().collect()
    }

    #[test]
    fn test_non_contiguous_deletes_compose() {
        let source = abc();
        let (sub, events) = watch(&source);

        source
            .batch(|m| {
                m.remove(&"a").unwrap();
                m.remove(&"c").unwrap();
            })
            .unwrap();

        assert_eq!(
            *events.lock(),
            vec![Event::Composite {
                events: vec![Event::RemoveLast, Event::RemoveFirst]
            }]
        );
        assert_eq!(sub.snapshot().unwrap(), vec![("b", 2)]);
    }

    #[test]
    fn test_update_assigns_and_new_key_appends() {
        let source = abc();
        let (sub, events) = watch(&source);

        source.set("b", 20).unwrap();
        source.set("d", 4).unwrap();

        assert_eq!(
            *events.lock(),
            vec![
                Event::Assign {
                    index: 1,
                    value: ("b", 20)
                },
                Event::Append {
                    values: vec![("d", 4)]
                },
            ]
        );
        assert_eq!(
            sub.snapshot().unwrap(),
            vec![("a", 1), ("b", 20), ("c", 3), ("d", 4)]
        );
    }

    #[test]
    fn test_replace_all_is_one_range_replace() {
        let source = abc();
        let (sub, events) = watch(&source);

        source.replace_all([("x", 9), ("y", 8)]).unwrap();

        assert_eq!(
            *events.lock(),
            vec![Event::Splice {
                index: 0,
                delete: 3,
                insert: vec![("x", 9), ("y", 8)]
            }]
        );
        assert_eq!(sub.snapshot().unwrap(), vec![("x", 9), ("y", 8)]);
    }

    #[test]
    fn test_deleted_and_changed_key_moves_to_end() {
        let source = abc();
        let (sub, _events) = watch(&source);

        source.replace_all([("a", 5)]).unwrap();
        // Not a clean replacement: "a" is deleted and re-inserted.
        assert_eq!(sub.snapshot().unwrap(), vec![("a", 5)]);
        assert_eq!(source.snapshot().entries(), &[("a", 5)][..]);
    }
}
