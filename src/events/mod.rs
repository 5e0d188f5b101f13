//! Sequence event algebra and the draft builder.
//!
//! An [`Event`] is an immutable description of one change to an ordered
//! sequence. Applying an event to the pre-event sequence reproduces the
//! post-event sequence exactly; composite sub-events apply in order, each
//! against the state left by the previous one.
//!
//! A [`Draft`] accumulates several raw mutations and commits them as one
//! minimal event (or nothing, when they cancel out).

mod draft;
mod event;

pub use draft::Draft;
pub use event::{Change, Event};
pub(crate) use event::{check_index, check_range, clamp_range};
