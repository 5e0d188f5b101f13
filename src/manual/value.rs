//! Writable single-value source.

use crate::collections::Value;
use crate::error::Result;
use crate::subscriptions::{Receiver, Source, Subscription};
use crate::types::Element;
use std::fmt;
use std::sync::Arc;

use super::root::{Hold, Root};

/// A single writable value. Every `set` emits the new value.
pub struct ManualValue<T: Element> {
    root: Arc<Root<Value<T>>>,
}

impl<T: Element> Clone for ManualValue<T> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
        }
    }
}

impl<T: Element> ManualValue<T> {
    pub fn new(value: T) -> Self {
        Self::labelled("manual", value)
    }

    pub fn labelled(label: impl Into<String>, value: T) -> Self {
        Self {
            root: Arc::new(Root::new(label, Value(value))),
        }
    }

    pub fn get(&self) -> T {
        self.root.with(|v| v.0.clone())
    }

    pub fn subscriber_count(&self) -> usize {
        self.root.subscriber_count()
    }

    pub fn is_hot(&self) -> bool {
        self.root.is_hot()
    }

    /// Replace the value, returning the previous one.
    pub fn set(&self, value: T) -> Result<T> {
        self.root.ensure_open()?;
        let previous = self.get();
        self.root.commit(value)?;
        Ok(previous)
    }

    /// Replace the value with `f(current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> Result<()> {
        self.root.ensure_open()?;
        let next = self.root.with(|v| f(&v.0));
        self.root.commit(next)
    }

    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> Result<R> {
        let hold = self.root.hold();
        let out = f(self);
        hold.release()?;
        Ok(out)
    }

    pub fn hold(&self) -> Hold<'_, Value<T>> {
        self.root.hold()
    }

    pub fn end(&self) {
        self.root.end();
    }
}

impl<T: Element + Default> Default for ManualValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Element> fmt::Debug for ManualValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.with(|v| f.debug_tuple("ManualValue").field(&v.0).finish())
    }
}

impl<T: Element> Source<Value<T>> for ManualValue<T> {
    fn subscribe_with(&self, receiver: Arc<dyn Receiver<Value<T>>>) -> Subscription<Value<T>> {
        self.root.subscribe(receiver)
    }
}
