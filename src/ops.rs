//! Fluent construction of derived sources.
//!
//! Every builder is a pure factory: nothing subscribes upstream until the
//! result gains its first receiver.
//!
//! ```ignore
//! let todos = Manual::from_vec(vec![3, 1, 2]);
//! let view = todos.filter(|n| *n > 1).map(|n| n * 10).sort();
//! let sub = view.for_each(|n| println!("{n}"));
//! ```

use crate::collections::{Key, OrderedMap};
use crate::derived::{
    Concatenated, ElementMapper, Entries, Filtered, Mapped, Sorted, StatefulMapped,
};
use crate::error::Result;
use crate::events::Event;
use crate::subscriptions::{NullReceiver, Receiver, SharedSource, Source, Subscription};
use crate::types::Element;
use std::cmp::Ordering;
use std::sync::Arc;

/// Combinators over sequence sources.
pub trait SourceExt<T: Element>: Source<Vec<T>> + Clone + Sized + 'static {
    /// Transform every element.
    fn map<U, F>(&self, transform: F) -> Mapped<T, U>
    where
        U: Element,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Mapped::new(self.shared(), transform)
    }

    /// Transform every element with per-element state.
    fn map_with<M: ElementMapper<T>>(&self, mapper: M) -> StatefulMapped<T, M> {
        StatefulMapped::new(self.shared(), mapper)
    }

    /// Keep the elements that pass `predicate`.
    fn filter<F>(&self, predicate: F) -> Filtered<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Filtered::new(self.shared(), predicate)
    }

    /// Sort ascending.
    fn sort(&self) -> Sorted<T>
    where
        T: Ord,
    {
        Sorted::new(self.shared(), T::cmp)
    }

    fn sort_by<F>(&self, compare: F) -> Sorted<T>
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Sorted::new(self.shared(), compare)
    }

    /// This source followed by `other`.
    fn concat<S>(&self, other: S) -> Concatenated<T>
    where
        S: Source<Vec<T>> + 'static,
    {
        Concatenated::new(self.shared(), Arc::new(other))
    }

    /// Call `f` for every element present now and every element inserted or
    /// assigned later, until the subscription is released.
    fn for_each<F>(&self, f: F) -> Subscription<Vec<T>>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe(ForEach { callback: f })
    }

    /// Keep the chain hot without observing it.
    fn sink(&self) -> Subscription<Vec<T>> {
        self.subscribe(NullReceiver)
    }

    fn shared(&self) -> SharedSource<Vec<T>> {
        Arc::new(self.clone())
    }
}

impl<T: Element, S: Source<Vec<T>> + Clone + 'static> SourceExt<T> for S {}

/// Combinators over map sources.
pub trait MapSourceExt<K: Key, V: Element>: Source<OrderedMap<K, V>> + Clone + Sized + 'static {
    /// `(key, value)` pairs in key insertion order.
    fn entries(&self) -> Entries<K, V> {
        Entries::new(Arc::new(self.clone()))
    }
}

impl<K: Key, V: Element, S: Source<OrderedMap<K, V>> + Clone + 'static> MapSourceExt<K, V> for S {}

struct ForEach<F> {
    callback: F,
}

impl<T, F> Receiver<Vec<T>> for ForEach<F>
where
    T: Element,
    F: Fn(&T) + Send + Sync,
{
    fn init(&self, view: &Vec<T>) {
        view.iter().for_each(&self.callback);
    }

    fn event(&self, event: &Event<T>) -> Result<()> {
        for value in event.inserted() {
            (self.callback)(value);
        }
        Ok(())
    }
}
