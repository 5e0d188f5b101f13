//! Element-wise transform that keeps per-element state.

use crate::error::{Result, SourceError};
use crate::events::{Change, Draft, Event};
use crate::subscriptions::{Receiver, SharedSource, Source, Subscription};
use crate::types::Element;
use std::marker::PhantomData;
use std::sync::Arc;

use super::node::{Cleanup, Node, Operator};

/// Mapper that keeps state for every upstream element.
///
/// `open` runs when the derived source goes hot and its result is shared by
/// every element; `close` runs when it goes cold, after every element state
/// has been disposed.
///
/// When an element is assigned, `update` may refresh its state in place and
/// return `true`. The default returns `false`, in which case the old state
/// is disposed and a fresh one initialized. Disposals run after the mapped
/// event has been delivered.
pub trait ElementMapper<U>: Send + Sync + 'static {
    type Output: Element;
    type State: Send + 'static;
    type Shared: Send + Sync + 'static;

    fn open(&self) -> Self::Shared;

    fn init(&self, shared: &Self::Shared, value: &U) -> Self::State;

    fn map(&self, shared: &Self::Shared, state: &Self::State, value: &U) -> Self::Output;

    fn update(&self, _shared: &Self::Shared, _state: &mut Self::State, _value: &U) -> bool {
        false
    }

    fn dispose(&self, shared: &Self::Shared, state: Self::State);

    fn close(&self, _shared: &Self::Shared) {}
}

pub(crate) struct StatefulOp<U, M: ElementMapper<U>> {
    mapper: Arc<M>,
    shared: Option<Arc<M::Shared>>,
    states: Vec<M::State>,
    retired: Vec<M::State>,
    closing: Option<Arc<M::Shared>>,
    _input: PhantomData<fn(&U)>,
}

impl<U: Element, M: ElementMapper<U>> StatefulOp<U, M> {
    fn open_shared(&mut self) -> Arc<M::Shared> {
        let mapper = &self.mapper;
        Arc::clone(self.shared.get_or_insert_with(|| Arc::new(mapper.open())))
    }
}

impl<U: Element, M: ElementMapper<U>> Operator for StatefulOp<U, M> {
    type Input = Vec<U>;
    type Output = M::Output;

    fn populate(&mut self, view: &Vec<U>) -> Vec<M::Output> {
        let shared = self.open_shared();
        self.states = view.iter().map(|v| self.mapper.init(&shared, v)).collect();
        view.iter()
            .zip(&self.states)
            .map(|(v, state)| self.mapper.map(&shared, state, v))
            .collect()
    }

    fn translate(&mut self, event: &Event<U>) -> Result<Option<Event<M::Output>>> {
        let shared = self
            .shared
            .clone()
            .ok_or_else(|| SourceError::unreachable("map", "event before population"))?;
        let mut draft = Draft::new(self.states.len());
        for change in event.changes(self.states.len())? {
            match change {
                Change::Splice {
                    index,
                    delete,
                    insert,
                } => {
                    let fresh: Vec<M::State> =
                        insert.iter().map(|v| self.mapper.init(&shared, v)).collect();
                    let outputs: Vec<M::Output> = insert
                        .iter()
                        .zip(&fresh)
                        .map(|(v, state)| self.mapper.map(&shared, state, v))
                        .collect();
                    self.retired
                        .extend(self.states.splice(index..index + delete, fresh));
                    draft.range_replace(index, delete, outputs)?;
                }
                Change::Assign { index, value } => {
                    let mapper = Arc::clone(&self.mapper);
                    let state = &mut self.states[index];
                    if !mapper.update(&shared, state, value) {
                        let fresh = mapper.init(&shared, value);
                        self.retired.push(std::mem::replace(state, fresh));
                    }
                    let output = mapper.map(&shared, &self.states[index], value);
                    draft.assign(index, output)?;
                }
            }
        }
        Ok(draft.commit())
    }

    fn reset(&mut self) {
        self.retired.append(&mut self.states);
        self.closing = self.shared.take();
    }

    fn take_cleanup(&mut self) -> Option<Cleanup> {
        if self.retired.is_empty() && self.closing.is_none() {
            return None;
        }
        let retired = std::mem::take(&mut self.retired);
        let closing = self.closing.take();
        let shared = self.shared.clone().or_else(|| closing.clone())?;
        let mapper = Arc::clone(&self.mapper);
        Some(Box::new(move || {
            for state in retired {
                mapper.dispose(&shared, state);
            }
            if let Some(closing) = closing {
                mapper.close(&closing);
            }
        }))
    }
}

/// Upstream elements mapped through an [`ElementMapper`].
pub struct StatefulMapped<U: Element, M: ElementMapper<U>> {
    node: Arc<Node<StatefulOp<U, M>>>,
}

impl<U: Element, M: ElementMapper<U>> Clone for StatefulMapped<U, M> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<U: Element, M: ElementMapper<U>> StatefulMapped<U, M> {
    pub fn new(upstream: SharedSource<Vec<U>>, mapper: M) -> Self {
        let op = StatefulOp {
            mapper: Arc::new(mapper),
            shared: None,
            states: Vec::new(),
            retired: Vec::new(),
            closing: None,
            _input: PhantomData,
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

impl<U: Element, M: ElementMapper<U>> Source<Vec<M::Output>> for StatefulMapped<U, M> {
    fn subscribe_with(
        &self,
        receiver: Arc<dyn Receiver<Vec<M::Output>>>,
    ) -> Subscription<Vec<M::Output>> {
        self.node.subscribe(receiver)
    }
}
