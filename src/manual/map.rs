//! Writable associative source.

use crate::collections::{Key, MapEvent, OrderedMap};
use crate::error::Result;
use crate::subscriptions::{Receiver, Source, Subscription};
use crate::types::Element;
use std::fmt;
use std::sync::Arc;

use super::root::{Hold, Root};

/// A writable map that iterates in key insertion order.
///
/// Setting an existing key updates it in place; a new key goes to the end.
/// A set of keys is a `ManualMap<K, ()>`.
pub struct ManualMap<K: Key, V: Element> {
    root: Arc<Root<OrderedMap<K, V>>>,
}

impl<K: Key, V: Element> Clone for ManualMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
        }
    }
}

impl<K: Key, V: Element> ManualMap<K, V> {
    pub fn new() -> Self {
        Self::from_map(OrderedMap::new())
    }

    pub fn from_map(items: OrderedMap<K, V>) -> Self {
        Self::labelled("manual", items)
    }

    pub fn labelled(label: impl Into<String>, items: OrderedMap<K, V>) -> Self {
        Self {
            root: Arc::new(Root::new(label, items)),
        }
    }

    pub fn len(&self) -> usize {
        self.root.with(OrderedMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.root.with(|map| map.get(key).cloned())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.root.with(|map| map.contains_key(key))
    }

    pub fn snapshot(&self) -> OrderedMap<K, V> {
        self.root.with(OrderedMap::clone)
    }

    pub fn subscriber_count(&self) -> usize {
        self.root.subscriber_count()
    }

    pub fn is_hot(&self) -> bool {
        self.root.is_hot()
    }

    /// Insert or update `key`, returning the previous value.
    pub fn set(&self, key: K, value: V) -> Result<Option<V>> {
        self.root.ensure_open()?;
        let previous = self.get(&key);
        self.root.commit(MapEvent {
            deleted: Vec::new(),
            changed: vec![(key, value)],
        })?;
        Ok(previous)
    }

    pub fn remove(&self, key: &K) -> Result<Option<V>> {
        self.root.ensure_open()?;
        let Some(previous) = self.get(key) else {
            return Ok(None);
        };
        self.root.commit(MapEvent {
            deleted: vec![key.clone()],
            changed: Vec::new(),
        })?;
        Ok(Some(previous))
    }

    pub fn clear(&self) -> Result<()> {
        self.replace_all(Vec::new())
    }

    /// Drop every key and insert `entries`, as one event.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (K, V)>) -> Result<()> {
        self.root.ensure_open()?;
        let deleted: Vec<K> = self.root.with(|map| map.keys().cloned().collect());
        let mut changed: Vec<(K, V)> = Vec::new();
        for (key, value) in entries {
            match changed.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => changed.push((key, value)),
            }
        }
        let event = MapEvent { deleted, changed };
        if event.is_empty() {
            return Ok(());
        }
        self.root.commit(event)
    }

    /// Run `f`, delivering everything it changes as one event.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> Result<R> {
        let hold = self.root.hold();
        let out = f(self);
        hold.release()?;
        Ok(out)
    }

    pub fn hold(&self) -> Hold<'_, OrderedMap<K, V>> {
        self.root.hold()
    }

    pub fn end(&self) {
        self.root.end();
    }
}

impl<K: Key, V: Element> Default for ManualMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, V: Element> FromIterator<(K, V)> for ManualMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map(iter.into_iter().collect())
    }
}

impl<K: Key, V: Element> fmt::Debug for ManualMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.with(|map| f.debug_tuple("ManualMap").field(map).finish())
    }
}

impl<K: Key, V: Element> Source<OrderedMap<K, V>> for ManualMap<K, V> {
    fn subscribe_with(
        &self,
        receiver: Arc<dyn Receiver<OrderedMap<K, V>>>,
    ) -> Subscription<OrderedMap<K, V>> {
        self.root.subscribe(receiver)
    }
}
