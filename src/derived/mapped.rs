//! Element-wise transform of a sequence source.

use crate::error::Result;
use crate::events::Event;
use crate::subscriptions::{Receiver, SharedSource, Source, Subscription};
use crate::types::Element;
use std::sync::Arc;

use super::node::{Node, Operator};

type Transform<U, T> = Arc<dyn Fn(&U) -> T + Send + Sync>;

pub(crate) struct MapOp<U, T> {
    transform: Transform<U, T>,
}

impl<U: Element, T: Element> Operator for MapOp<U, T> {
    type Input = Vec<U>;
    type Output = T;

    fn populate(&mut self, view: &Vec<U>) -> Vec<T> {
        view.iter().map(|v| (self.transform)(v)).collect()
    }

    fn translate(&mut self, event: &Event<U>) -> Result<Option<Event<T>>> {
        Ok(Some(event.map(&*self.transform)))
    }

    fn reset(&mut self) {}
}

/// Upstream elements passed through a pure transform. Every upstream event
/// is mirrored with the same shape.
pub struct Mapped<U: Element, T: Element> {
    node: Arc<Node<MapOp<U, T>>>,
}

impl<U: Element, T: Element> Clone for Mapped<U, T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<U: Element, T: Element> Mapped<U, T> {
    pub fn new<F>(upstream: SharedSource<Vec<U>>, transform: F) -> Self
    where
        F: Fn(&U) -> T + Send + Sync + 'static,
    {
        let op = MapOp {
            transform: Arc::new(transform),
        };
        Self {
            node: Node::new("map", upstream, op),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.node.subscriber_count()
    }

    pub fn is_hot(&self) -> bool {
        self.node.is_hot()
    }
}

impl<U: Element, T: Element> Source<Vec<T>> for Mapped<U, T> {
    fn subscribe_with(&self, receiver: Arc<dyn Receiver<Vec<T>>>) -> Subscription<Vec<T>> {
        self.node.subscribe(receiver)
    }
}
