//! The authoritative in-memory fleet map.
//!
//! Entity id → last known position & timestamp.  Online/offline is never
//! stored: it is derived from the timestamp on every read, so a snapshot is
//! always consistent with wall-clock time.
//!

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use transit_common::Position;

/// Default freshness window: two flush intervals, tolerating one missed
/// cycle.
pub const ONLINE_WINDOW_MS: i64 = 10_000;

/// One tracked vehicle.
///
#[derive(Clone, Debug, Serialize)]
pub struct Vehicle {
    /// Externally assigned, stable id
    pub id: String,
    /// Display label
    pub name: String,
    /// Absent until the first event is observed
    pub last_position: Option<Position>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Vehicle {
    fn placeholder(id: &str, name: &str) -> Self {
        Vehicle {
            id: id.to_string(),
            name: name.to_string(),
            last_position: None,
            last_seen: None,
        }
    }

    /// Online means a report within the freshness window.
    ///
    pub fn is_online(&self, now: DateTime<Utc>, window_ms: i64) -> bool {
        match self.last_seen {
            Some(t) => now.signed_duration_since(t) <= Duration::milliseconds(window_ms),
            None => false,
        }
    }
}

/// One row of a snapshot, status already derived.
///
#[derive(Clone, Debug, Serialize)]
pub struct VehicleStatus {
    pub id: String,
    pub name: String,
    pub last_position: Option<Position>,
    pub last_seen: Option<DateTime<Utc>>,
    pub online: bool,
}

/// The fleet map itself.  `BTreeMap` so snapshots come out ordered by id.
///
#[derive(Debug)]
pub struct Fleet {
    vehicles: BTreeMap<String, Vehicle>,
    /// Freshness window in ms, policy value
    window_ms: i64,
}

impl Default for Fleet {
    fn default() -> Self {
        Self::new()
    }
}

impl Fleet {
    pub fn new() -> Self {
        Self::with_window(ONLINE_WINDOW_MS)
    }

    pub fn with_window(window_ms: i64) -> Self {
        Fleet {
            vehicles: BTreeMap::new(),
            window_ms,
        }
    }

    /// Pre-register vehicles known from configuration; they show up in
    /// snapshots with no position, offline.
    ///
    pub fn seed(&mut self, names: &BTreeMap<String, String>) {
        for (id, name) in names {
            self.vehicles
                .entry(id.clone())
                .or_insert_with(|| Vehicle::placeholder(id, name));
        }
    }

    /// Merge one coalesced batch, stamping every entry with `now`.  Unseen
    /// ids are created on the fly with the id as label.
    ///
    pub fn apply_batch(&mut self, batch: HashMap<String, Position>, now: DateTime<Utc>) {
        for (id, position) in batch {
            let v = self
                .vehicles
                .entry(id.clone())
                .or_insert_with(|| Vehicle::placeholder(&id, &id));
            v.last_position = Some(position);
            v.last_seen = Some(now);
        }
    }

    /// Remove the vehicle entirely.
    ///
    pub fn remove(&mut self, id: &str) -> bool {
        self.vehicles.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Owned, ordered copy for the display layer, never a live reference.
    ///
    pub fn snapshot(&self, now: DateTime<Utc>) -> Vec<VehicleStatus> {
        self.vehicles
            .values()
            .map(|v| VehicleStatus {
                id: v.id.clone(),
                name: v.name.clone(),
                last_position: v.last_position,
                last_seen: v.last_seen,
                online: v.is_online(now, self.window_ms),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn batch(entries: &[(&str, f64, f64)]) -> HashMap<String, Position> {
        entries
            .iter()
            .map(|(id, lat, lon)| (id.to_string(), Position::new(*lat, *lon)))
            .collect()
    }

    #[test]
    fn test_apply_batch_creates_and_stamps() {
        let mut fleet = Fleet::new();
        let now = Utc::now();

        fleet.apply_batch(batch(&[("7", 10.001, 76.001)]), now);

        let snap = fleet.snapshot(now);
        assert_eq!(1, snap.len());
        assert_eq!("7", snap[0].id);
        assert_eq!(Some(Position::new(10.001, 76.001)), snap[0].last_position);
        assert_eq!(Some(now), snap[0].last_seen);
        assert!(snap[0].online);
    }

    #[test]
    fn test_remove() {
        let mut fleet = Fleet::new();
        let now = Utc::now();
        fleet.apply_batch(batch(&[("7", 10.0, 76.0)]), now);

        assert!(fleet.remove("7"));
        assert!(!fleet.remove("7"));
        assert!(fleet.snapshot(now).is_empty());
    }

    #[rstest]
    #[case(9_999, true)]
    #[case(10_000, true)]
    #[case(10_001, false)]
    fn test_online_boundary(#[case] age_ms: i64, #[case] online: bool) {
        let mut fleet = Fleet::new();
        let now = Utc::now();
        let seen = now - Duration::milliseconds(age_ms);

        fleet.apply_batch(batch(&[("7", 10.0, 76.0)]), seen);

        let snap = fleet.snapshot(now);
        assert_eq!(online, snap[0].online);
    }

    #[test]
    fn test_seeded_vehicles_are_offline_placeholders() {
        let mut fleet = Fleet::new();
        let names: BTreeMap<String, String> =
            [("101".to_string(), "College Bus 101".to_string())].into();
        fleet.seed(&names);

        let snap = fleet.snapshot(Utc::now());
        assert_eq!(1, snap.len());
        assert_eq!("College Bus 101", snap[0].name);
        assert!(snap[0].last_position.is_none());
        assert!(!snap[0].online);
    }

    #[test]
    fn test_seed_does_not_clobber_live_state() {
        let mut fleet = Fleet::new();
        let now = Utc::now();
        fleet.apply_batch(batch(&[("101", 10.0, 76.0)]), now);

        let names: BTreeMap<String, String> =
            [("101".to_string(), "College Bus 101".to_string())].into();
        fleet.seed(&names);

        let snap = fleet.snapshot(now);
        assert!(snap[0].last_position.is_some());
    }

    #[test]
    fn test_snapshot_is_ordered_and_owned() {
        let mut fleet = Fleet::new();
        let now = Utc::now();
        fleet.apply_batch(batch(&[("b", 1.0, 1.0), ("a", 2.0, 2.0), ("c", 3.0, 3.0)]), now);

        let snap = fleet.snapshot(now);
        let ids: Vec<&str> = snap.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(vec!["a", "b", "c"], ids);

        // Mutating the map afterwards must not affect the copy we took.
        fleet.remove("a");
        assert_eq!(3, snap.len());
    }
}
