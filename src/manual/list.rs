//! Writable sequence source.

use crate::error::Result;
use crate::events::{check_index, clamp_range, Event};
use crate::subscriptions::{Receiver, Source, Subscription};
use crate::types::Element;
use std::fmt;
use std::sync::Arc;

use super::root::{Hold, Root};

/// A writable sequence: the mutation entry point of a source graph.
///
/// Every mutator updates the owned content synchronously and, when at least
/// one receiver is attached, delivers the matching [`Event`] before
/// returning. Degenerate calls (empty insert lists, removing from an empty
/// sequence) change nothing and deliver nothing.
///
/// Cloning yields another handle to the same source.
pub struct Manual<T: Element> {
    root: Arc<Root<Vec<T>>>,
}

impl<T: Element> Clone for Manual<T> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
        }
    }
}

impl<T: Element> Manual<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self::labelled("manual", items)
    }

    /// Create a source whose log lines carry `label`.
    pub fn labelled(label: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            root: Arc::new(Root::new(label, items)),
        }
    }

    pub fn len(&self) -> usize {
        self.root.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.root.with(|items| items.get(index).cloned())
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.root.with(Vec::clone)
    }

    /// Read the content without cloning it. `f` must not call back into
    /// this source.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.root.with(|items| f(items))
    }

    pub fn subscriber_count(&self) -> usize {
        self.root.subscriber_count()
    }

    pub fn is_hot(&self) -> bool {
        self.root.is_hot()
    }

    pub fn push(&self, value: T) -> Result<()> {
        self.append(vec![value])
    }

    pub fn append(&self, values: impl IntoIterator<Item = T>) -> Result<()> {
        let values: Vec<T> = values.into_iter().collect();
        if values.is_empty() {
            return self.root.ensure_open();
        }
        self.root.commit(Event::Append { values })
    }

    /// Remove and return the last element.
    pub fn remove_last(&self) -> Result<Option<T>> {
        self.root.ensure_open()?;
        let Some(last) = self.root.with(|items| items.last().cloned()) else {
            return Ok(None);
        };
        self.root.commit(Event::RemoveLast)?;
        Ok(Some(last))
    }

    pub fn prepend(&self, values: impl IntoIterator<Item = T>) -> Result<()> {
        let values: Vec<T> = values.into_iter().collect();
        if values.is_empty() {
            return self.root.ensure_open();
        }
        self.root.commit(Event::Prepend { values })
    }

    /// Remove and return the first element.
    pub fn remove_first(&self) -> Result<Option<T>> {
        self.root.ensure_open()?;
        let Some(first) = self.root.with(|items| items.first().cloned()) else {
            return Ok(None);
        };
        self.root.commit(Event::RemoveFirst)?;
        Ok(Some(first))
    }

    /// Remove up to `delete` elements at `index`, insert `insert` there, and
    /// return the removed elements.
    ///
    /// `index` past the end is an error; `delete` is clamped to the
    /// elements available after `index`.
    pub fn range_replace(
        &self,
        index: usize,
        delete: usize,
        insert: impl IntoIterator<Item = T>,
    ) -> Result<Vec<T>> {
        self.root.ensure_open()?;
        let insert: Vec<T> = insert.into_iter().collect();
        let removed = self.root.with(|items| {
            clamp_range(index, delete, items.len())
                .map(|delete| items[index..index + delete].to_vec())
        })?;
        if removed.is_empty() && insert.is_empty() {
            return Ok(removed);
        }
        self.root.commit(Event::Splice {
            index,
            delete: removed.len(),
            insert,
        })?;
        Ok(removed)
    }

    /// Replace the element at `index`, returning the previous value.
    pub fn assign(&self, index: usize, value: T) -> Result<T> {
        self.root.ensure_open()?;
        let previous = self.root.with(|items| {
            check_index(index, items.len())?;
            Ok(items[index].clone())
        })?;
        self.root.commit(Event::Assign { index, value })?;
        Ok(previous)
    }

    pub fn clear(&self) -> Result<()> {
        self.root.ensure_open()?;
        let len = self.len();
        if len == 0 {
            return Ok(());
        }
        self.root.commit(Event::Splice {
            index: 0,
            delete: len,
            insert: Vec::new(),
        })
    }

    /// Run `f`, delivering everything it changes as one event.
    ///
    /// Nested batches, and mutations made by receivers while the batch is
    /// open, fold into the outermost batch.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> Result<R> {
        let hold = self.root.hold();
        let out = f(self);
        hold.release()?;
        Ok(out)
    }

    /// Suspend delivery until the returned guard is released.
    pub fn hold(&self) -> Hold<'_, Vec<T>> {
        self.root.hold()
    }

    /// End the source: receivers are told no further events will arrive and
    /// later mutations fail.
    pub fn end(&self) {
        self.root.end();
    }
}

impl<T: Element> Default for Manual<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> From<Vec<T>> for Manual<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T: Element> fmt::Debug for Manual<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.with(|items| f.debug_tuple("Manual").field(items).finish())
    }
}

impl<T: Element> Source<Vec<T>> for Manual<T> {
    fn subscribe_with(&self, receiver: Arc<dyn Receiver<Vec<T>>>) -> Subscription<Vec<T>> {
        self.root.subscribe(receiver)
    }
}
