//! # Tributary
//!
//! Push-based, demand-driven observable collections that describe every
//! change as a fine-grained incremental event instead of a new snapshot.
//!
//! ## Core Concepts
//!
//! - **Sources**: anything that can be subscribed to; a subscription exposes
//!   a shared live view plus a release handle
//! - **Events**: the closed set of sequence changes, coalesced by drafts
//! - **Root sources**: `Manual`, `ManualMap` and `ManualValue`, the only
//!   places a graph is mutated
//! - **Derived sources**: filter, map, sort, concat and map entries, each
//!   hot only while it has receivers
//!
//! ## Example
//!
//! ```ignore
//! use tributary::{Manual, SourceExt};
//!
//! let numbers = Manual::from_vec(vec![5, 2, 8]);
//! let evens = numbers.filter(|n| n % 2 == 0).sort();
//!
//! let sub = evens.for_each(|n| println!("even: {n}"));
//! numbers.push(4)?;
//! assert_eq!(sub.snapshot()?, vec![2, 4, 8]);
//! ```

pub mod collections;
pub mod derived;
pub mod error;
pub mod events;
pub mod manual;
pub mod ops;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use collections::{Key, MapDraft, MapEvent, OrderedMap, Value, ValueDraft};
pub use derived::{
    Concatenated, ElementMapper, Entries, Filtered, Mapped, Sorted, StatefulMapped,
};
pub use error::{Result, SourceError};
pub use events::{Change, Draft, Event};
pub use manual::{Hold, Manual, ManualMap, ManualValue};
pub use ops::{MapSourceExt, SourceExt};
pub use subscriptions::{
    channel, ChannelConfig, ChannelHandle, Delivery, FnReceiver, NullReceiver, Receiver,
    SharedSource, Source, Subscription,
};
pub use types::*;
