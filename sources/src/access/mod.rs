//! Access methods for the remote services.
//!

pub use directions::*;
pub use livefeed::*;
pub use locator::*;

mod directions;
mod livefeed;
mod locator;
