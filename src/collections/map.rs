//! Ordered associative container and its change events.

use crate::error::Result;
use crate::types::{Coalesce, Collection, Element};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// Keys usable in an [`OrderedMap`].
pub trait Key: Element + Eq + Hash {}

impl<K> Key for K where K: Element + Eq + Hash {}

/// One change to an [`OrderedMap`].
///
/// Deletions apply first, then changes. A changed key that is present is
/// updated in place; an absent key is appended to the iteration order. A key
/// listed in both is therefore deleted and re-inserted at the end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEvent<K, V> {
    pub deleted: Vec<K>,
    pub changed: Vec<(K, V)>,
}

impl<K, V> MapEvent<K, V> {
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty() && self.changed.is_empty()
    }
}

/// Map that iterates in key insertion order.
#[derive(Clone)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

impl<K: Key, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Position of `key` in iteration order.
    pub fn position(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn entries(&self) -> &[(K, V)] {
        &self.entries
    }

    /// Insert or update. New keys go to the end of the iteration order.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Remove a key, shifting later entries down by one.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let at = self.index.remove(key)?;
        let (_, value) = self.entries.remove(at);
        for (i, (k, _)) in self.entries.iter().enumerate().skip(at) {
            self.index.insert(k.clone(), i);
        }
        Some(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

impl<K: Key, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for OrderedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

impl<K: Key, V: Element> Collection for OrderedMap<K, V> {
    type Event = MapEvent<K, V>;
    type Draft = MapDraft<K, V>;

    fn apply(&mut self, event: &MapEvent<K, V>) -> Result<()> {
        for key in &event.deleted {
            self.remove(key);
        }
        for (key, value) in &event.changed {
            self.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn draft(&self) -> MapDraft<K, V> {
        MapDraft::new(self.keys().cloned())
    }
}

/// Coalesces map events recorded during a batch.
#[derive(Clone, Debug)]
pub struct MapDraft<K, V> {
    initial: HashSet<K>,
    deleted: Vec<K>,
    changed: Vec<(K, V)>,
}

impl<K: Key, V: Element> MapDraft<K, V> {
    /// Start a draft against a map holding `keys`.
    pub fn new(keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            initial: keys.into_iter().collect(),
            deleted: Vec::new(),
            changed: Vec::new(),
        }
    }

    pub fn set(&mut self, key: K, value: V) {
        match self.changed.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.changed.push((key, value)),
        }
    }

    pub fn delete(&mut self, key: K) {
        self.changed.retain(|(k, _)| *k != key);
        if self.initial.contains(&key) && !self.deleted.contains(&key) {
            self.deleted.push(key);
        }
    }
}

impl<K: Key, V: Element> Coalesce<MapEvent<K, V>> for MapDraft<K, V> {
    fn record(&mut self, event: MapEvent<K, V>) -> Result<()> {
        for key in event.deleted {
            self.delete(key);
        }
        for (key, value) in event.changed {
            self.set(key, value);
        }
        Ok(())
    }

    fn commit(self) -> Option<MapEvent<K, V>> {
        let event = MapEvent {
            deleted: self.deleted,
            changed: self.changed,
        };
        if event.is_empty() {
            None
        } else {
            Some(event)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(pairs: &[(&'static str, i32)]) -> OrderedMap<&'static str, i32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_insertion_order_survives_removal() {
        let mut map = map_of(&[("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(map.remove(&"a"), Some(1));
        map.insert("d", 4);
        map.insert("b", 20);

        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, vec!["b", "c", "d"]);
        assert_eq!(map.get(&"b"), Some(&20));
        assert_eq!(map.position(&"d"), Some(2));
    }

    #[test]
    fn test_apply_deletes_before_changes() {
        let mut map = map_of(&[("a", 1), ("b", 2)]);
        map.apply(&MapEvent {
            deleted: vec!["a"],
            changed: vec![("a", 10), ("b", 3)],
        })
        .unwrap();
        assert_eq!(map.entries(), &[("b", 3), ("a", 10)]);
    }

    #[test]
    fn test_draft_set_then_delete_new_key_cancels() {
        let map = map_of(&[("a", 1)]);
        let mut draft = map.draft();
        draft.set("x", 1);
        draft.delete("x");
        assert!(draft.commit().is_none());
    }

    #[test]
    fn test_draft_delete_then_set_existing_key() {
        let map = map_of(&[("a", 1), ("b", 2)]);
        let mut draft = map.draft();
        draft.delete("a");
        draft.set("a", 5);

        let event = draft.commit().unwrap();
        let mut replay = map.clone();
        replay.apply(&event).unwrap();
        assert_eq!(replay.entries(), &[("b", 2), ("a", 5)]);
    }

    #[test]
    fn test_draft_keeps_latest_value() {
        let map = map_of(&[]);
        let mut draft = map.draft();
        draft
            .record(MapEvent {
                deleted: vec![],
                changed: vec![("k", 1)],
            })
            .unwrap();
        draft
            .record(MapEvent {
                deleted: vec![],
                changed: vec![("k", 2)],
            })
            .unwrap();
        assert_eq!(
            draft.commit(),
            Some(MapEvent {
                deleted: vec![],
                changed: vec![("k", 2)],
            })
        );
    }
}
