//! Directions provider client.
//!
//! One-shot POST returning the route geometry as an encoded polyline; we
//! decode it and hand the caller the full path.  No retry and no cache here,
//! every invocation is independent and the caller decides policy.
//!

use clap::{crate_name, crate_version};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use transit_common::Position;
use transit_formats::polyline;

use crate::{Auth, DirectionsSite, RouteError};

/// This is the directions client struct.
///
#[derive(Clone, Debug)]
pub struct Directions {
    /// Full endpoint URL taken from config
    base_url: String,
    /// API key
    api_key: String,
    /// reqwest async client
    client: Client,
}

/// Request payload.  NOTE: the provider wants its pairs in (lon, lat) order,
/// the opposite of everything else in this workspace.
///
#[derive(Debug, Serialize)]
struct Param {
    coordinates: [[f64; 2]; 2],
}

#[derive(Debug, Deserialize)]
struct Answer {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    geometry: Option<String>,
}

impl Directions {
    /// Load the endpoint & credentials from in-memory loaded config
    ///
    #[tracing::instrument]
    pub fn new(site: &DirectionsSite) -> Self {
        trace!("directions::new");

        let api_key = match &site.auth {
            Some(Auth::Key { api_key }) => api_key.clone(),
            _ => String::new(),
        };
        Directions {
            base_url: site.base_url.clone(),
            api_key,
            client: Client::new(),
        }
    }

    /// Fetch one route from `origin` to `destination`.
    ///
    #[tracing::instrument(skip(self))]
    pub async fn route(
        &self,
        origin: Position,
        destination: Position,
    ) -> Result<Vec<Position>, RouteError> {
        trace!("Fetching route through {}…", self.base_url);

        // (lon, lat), see `Param`.
        //
        let data = Param {
            coordinates: [
                [origin.lon, origin.lat],
                [destination.lon, destination.lat],
            ],
        };

        let resp = self
            .client
            .post(&self.base_url)
            .header(
                "user-agent",
                format!("{}/{}", crate_name!(), crate_version!()),
            )
            .header("authorization", &self.api_key)
            .json(&data)
            .send()
            .await?;

        debug!("raw resp={:?}", &resp);

        // Check status
        //
        match resp.status() {
            StatusCode::OK => {}
            code => return Err(RouteError::Status(code)),
        }

        let answer: Answer = resp.json().await?;
        let geometry = answer
            .routes
            .first()
            .and_then(|r| r.geometry.as_deref())
            .ok_or(RouteError::NoRoute)?;

        trace!("geometry={}", geometry);
        Ok(polyline::decode(geometry)?)
    }
}
