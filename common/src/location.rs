//! Geographic positions and bounding boxes.
//!
//! Everything in this workspace speaks (latitude, longitude) in decimal
//! degrees.  Some providers want their pairs the other way around, the
//! conversion happens at their client, never here.
//!

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// one degree is circumference of earth / 360°, convert into nautical miles
const ONE_DEG_NM: f64 = (40_000. / 1.852) / 360.;

/// A point on the globe.  Plain value type, copied around freely.
///
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Position {
    /// Latitude in degrees, positive north
    pub lat: f64,
    /// Longitude in degrees, positive east
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Position { lat, lon }
    }

    /// Within the valid coordinate ranges?  Out-of-range positions coming off
    /// the wire are dropped by the callers, they never reach the fleet map.
    ///
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// Bounding box, degrees.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BB {
    /// Longitude - X0
    pub min_lon: f64,
    /// Latitude - Y0
    pub min_lat: f64,
    /// Longitude - X1
    pub max_lon: f64,
    /// Latitude - Y1
    pub max_lat: f64,
}

impl BB {
    /// Take a position and create a bounding box of `dist` nautical miles away
    ///
    /// So from (lat, lon) we generate the following bounding box:
    /// (lat - dist, lon - dist, lat + dist, lon + dist)
    ///
    #[tracing::instrument]
    pub fn from_position(value: &Position, dist: u32) -> Self {
        Self::from_lat_lon(value.lat, value.lon, dist)
    }

    /// Take a lat lon tuple and create a bounding box of `dist` nautical miles away
    ///
    /// NOTE: `dist` is in Nautical Miles
    ///
    #[tracing::instrument]
    pub fn from_lat_lon(lat: f64, lon: f64, dist: u32) -> Self {
        let dist = dist as f64 / ONE_DEG_NM;

        // Calculate the four corners
        //
        let (min_lat, max_lat) = (lat - dist, lat + dist);
        let (min_lon, max_lon) = (lon - dist, lon + dist);

        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Is the point inside the box (borders included)?
    ///
    pub fn contains(&self, pos: &Position) -> bool {
        (self.min_lat..=self.max_lat).contains(&pos.lat)
            && (self.min_lon..=self.max_lon).contains(&pos.lon)
    }

    /// Wire representation, (lon, lat) corner order.
    ///
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}
