//! Single-value container.

use crate::error::Result;
use crate::types::{Coalesce, Collection, Element};
use std::ops::Deref;

/// A single observable value. Its event is the replacement value.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Value<T>(pub T);

impl<T> Value<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Value<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Element> Collection for Value<T> {
    type Event = T;
    type Draft = ValueDraft<T>;

    fn apply(&mut self, event: &T) -> Result<()> {
        self.0 = event.clone();
        Ok(())
    }

    fn draft(&self) -> ValueDraft<T> {
        ValueDraft { latest: None }
    }
}

/// Keeps only the last value recorded.
#[derive(Clone, Debug)]
pub struct ValueDraft<T> {
    latest: Option<T>,
}

impl<T> Coalesce<T> for ValueDraft<T> {
    fn record(&mut self, event: T) -> Result<()> {
        self.latest = Some(event);
        Ok(())
    }

    fn commit(self) -> Option<T> {
        self.latest
    }
}
