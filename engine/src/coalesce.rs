//! Update coalescing.
//!
//! The feed can deliver many positions per vehicle per second; the display
//! layer wants at most one change per vehicle per interval.  We keep one
//! pending slot per vehicle (last write wins) and swap the whole buffer out
//! on each flush, so a burst costs one map update and nothing is ever lost:
//! an event landing during a flush goes into the fresh buffer.
//!

use std::collections::HashMap;
use std::mem;
use std::time::Duration;

use transit_common::Position;

/// Default flush cadence.
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(5_000);

/// Pending updates, one slot per vehicle.
///
#[derive(Debug, Default)]
pub struct Pending(HashMap<String, Position>);

impl Pending {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a position; overwrites anything already pending for that id.
    ///
    pub fn push(&mut self, id: String, position: Position) {
        self.0.insert(id, position);
    }

    /// A vehicle that signed off must not resurrect on the next flush.
    ///
    pub fn discard(&mut self, id: &str) {
        self.0.remove(id);
    }

    /// Swap the buffer for an empty one and hand the batch to the caller.
    ///
    pub fn flush(&mut self) -> HashMap<String, Position> {
        mem::take(&mut self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
