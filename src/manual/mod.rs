//! Root sources: the only places a source graph is mutated.
//!
//! Each root owns its content outright, so it keeps it across cold
//! periods. Mutations are applied synchronously and delivered to current
//! receivers before the call returns, unless a [`Hold`] is open, in which
//! case they are coalesced and delivered when the outermost hold closes.

mod list;
mod map;
mod root;
mod value;

pub use list::Manual;
pub use map::ManualMap;
pub use root::Hold;
pub use value::ManualValue;
