//! Non-sequence containers: ordered maps and single values.
//!
//! Sequences use `Vec<T>` directly with [`Event`](crate::events::Event).

mod map;
mod value;

pub use map::{Key, MapDraft, MapEvent, OrderedMap};
pub use value::{Value, ValueDraft};
