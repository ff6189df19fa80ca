//! Events carried by the live position feed.
//!
//! The feed speaks newline-delimited JSON, one event per line, tagged by the
//! `event` field.
//!

use serde::{Deserialize, Serialize};

/// One inbound feed event.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum FeedEvent {
    /// Position report for one vehicle.
    #[serde(rename_all = "camelCase")]
    Location {
        entity_id: String,
        latitude: f64,
        longitude: f64,
    },
    /// The vehicle signed off; it must disappear from the fleet.
    #[serde(rename_all = "camelCase")]
    EntityDisconnected { entity_id: String },
}

/// First line sent on a fresh feed connection: bearer token plus the optional
/// bounding box of the watched area, (lon, lat) corner order.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Subscribe {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}
