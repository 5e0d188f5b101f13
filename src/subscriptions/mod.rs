//! Subscription system for live source updates.
//!
//! Every source owns a subscription controller that:
//! - counts demand, taking the source hot on the first subscribe and cold
//!   after the last release;
//! - holds the live view shared by all subscribers;
//! - fans events out to receivers in registration order.
//!
//! Subscribing or releasing from inside a receiver callback is allowed.
//! Events published during a fan-out are queued behind it, and a receiver
//! attached mid-delivery never sees events that were already in flight.
//!
//! # Example
//!
//! ```ignore
//! let source = Manual::from_vec(vec![1, 2, 3]);
//!
//! let sub = source.subscribe_fn(|event| println!("changed: {:?}", event));
//! source.push(4)?;
//! assert_eq!(sub.snapshot()?, vec![1, 2, 3, 4]);
//!
//! sub.release(); // source goes cold
//! ```

mod channel;
pub(crate) mod hub;
mod types;

pub use channel::{channel, ChannelConfig, ChannelHandle, Delivery};
pub use types::{FnReceiver, NullReceiver, Receiver, SharedSource, Source, Subscription};
