//! Definition of the data formats the tracker understands.
//!
//! - `polyline`: the encoded route geometry returned by the directions provider
//! - `event`: the JSON events carried by the live position feed
//!

// Re-export for convenience
//
pub use event::*;
pub use polyline::*;

mod event;
pub mod polyline;
