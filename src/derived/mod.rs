//! Derived sources.
//!
//! A derived source is itself a [`Source`](crate::subscriptions::Source)
//! and subscribes upstream only while it has receivers of its own. While
//! hot it keeps a private mirror of whatever it needs to re-express
//! upstream events in its own index space; when the last receiver releases
//! it drops that mirror, releases upstream, and starts from a fresh
//! upstream view on the next subscribe.
//!
//! Operator callbacks (predicates, transforms, comparators, mappers) run
//! while the derived source holds its lock and must not mutate a source the
//! same chain depends on.

mod concat;
mod entries;
mod filter;
mod mapped;
mod node;
mod sort;
mod stateful;

pub use concat::Concatenated;
pub use entries::Entries;
pub use filter::Filtered;
pub use mapped::Mapped;
pub use sort::Sorted;
pub use stateful::{ElementMapper, StatefulMapped};
