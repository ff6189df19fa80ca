//! The stateful half of the tracker.
//!
//! `transit-sources` hands us a channel of typed feed messages; this crate
//! turns them into something a display layer can poll: a coalescing buffer
//! bounding the update rate, the authoritative fleet map with online/offline
//! inference, and a `Session` object tying feed, buffer and map together
//! with guaranteed teardown.
//!

pub use coalesce::*;
pub use fleet::*;
pub use session::*;

mod coalesce;
mod fleet;
mod session;
