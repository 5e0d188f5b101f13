//! Core capability traits shared by every observable container.

use crate::error::Result;
use std::fmt;

/// Values that can travel through a source graph.
///
/// Blanket-implemented for every `Clone + Debug + Send + Sync + 'static` type.
pub trait Element: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> Element for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

/// An observable container: the live view a source shares with its
/// subscribers, together with the change description it emits.
pub trait Collection: Clone + Send + Sync + 'static {
    /// Incremental change description for this container.
    type Event: Clone + fmt::Debug + Send + Sync + 'static;

    /// Builder used to coalesce several events into one.
    type Draft: Coalesce<Self::Event> + Send + 'static;

    /// Apply an event in place. Fails without clamping when the event does
    /// not fit the current content.
    fn apply(&mut self, event: &Self::Event) -> Result<()>;

    /// Start a coalescing draft seeded from the current content.
    fn draft(&self) -> Self::Draft;
}

/// Accumulates events and reduces them to a single equivalent event.
pub trait Coalesce<E> {
    /// Record an event that was applied after everything recorded so far.
    fn record(&mut self, event: E) -> Result<()>;

    /// The smallest equivalent event, or `None` when the net effect is nil.
    fn commit(self) -> Option<E>;
}

/// Identifier of a receiver registered with one source.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriberId({})", self.0)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Demand state of a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    /// No subscribers; derived sources hold no mirror.
    #[default]
    Cold,
    /// First subscriber is attaching; the mirror is being populated.
    Warming,
    /// At least one subscriber; the mirror is authoritative.
    Hot,
}

impl Phase {
    pub fn is_hot(self) -> bool {
        self == Phase::Hot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_default_is_cold() {
        assert_eq!(Phase::default(), Phase::Cold);
        assert!(!Phase::Warming.is_hot());
        assert!(Phase::Hot.is_hot());
    }

    #[test]
    fn test_subscriber_id_format() {
        let id = SubscriberId(7);
        assert_eq!(format!("{:?}", id), "SubscriberId(7)");
        assert_eq!(id.to_string(), "7");
    }
}
