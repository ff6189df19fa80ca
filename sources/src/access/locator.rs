//! Position provider client, the platform location capability at this level.
//!
//! One request per call, always fresh, high accuracy requested.  Every
//! failure maps to one of the four `GeolocationError` kinds; nothing is
//! swallowed and nothing is retried from here.
//!

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, trace};

use transit_common::Position;

use crate::{GeolocationError, LocatorSite};

/// Hard budget for one position request.
const LOCATE_TIMEOUT: Duration = Duration::from_secs(10);

/// This is the position provider client struct.
///
#[derive(Clone, Debug)]
pub struct Locator {
    /// Full endpoint URL taken from config
    base_url: String,
    /// reqwest async client, carries the timeout budget
    client: Client,
}

#[derive(Debug, Deserialize)]
struct Answer {
    latitude: f64,
    longitude: f64,
}

impl Locator {
    /// Load the endpoint from in-memory loaded config
    ///
    #[tracing::instrument]
    pub fn new(site: &LocatorSite) -> Self {
        trace!("locator::new");

        let client = Client::builder()
            .timeout(LOCATE_TIMEOUT)
            .build()
            .unwrap_or_default();
        Locator {
            base_url: site.base_url.clone(),
            client,
        }
    }

    /// Ask for the current position once.
    ///
    #[tracing::instrument(skip(self))]
    pub async fn locate(&self) -> Result<Position, GeolocationError> {
        trace!("Locating through {}…", self.base_url);

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("accuracy", "high")])
            // max-age 0, we never accept a stale answer.
            .header("cache-control", "no-cache, max-age=0")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeolocationError::Timeout
                } else {
                    GeolocationError::Unknown(e.to_string())
                }
            })?;

        debug!("raw resp={:?}", &resp);

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(GeolocationError::Denied)
            }
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
                return Err(GeolocationError::Unavailable)
            }
            code if code.is_server_error() => return Err(GeolocationError::Unavailable),
            code => return Err(GeolocationError::Unknown(code.to_string())),
        }

        let answer: Answer = resp
            .json()
            .await
            .map_err(|e| GeolocationError::Unknown(e.to_string()))?;

        let pos = Position::new(answer.latitude, answer.longitude);
        if !pos.is_valid() {
            return Err(GeolocationError::Unavailable);
        }
        Ok(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use httpmock::prelude::*;
    use serde_json::json;

    fn locator(url: String) -> Locator {
        Locator::new(&LocatorSite { base_url: url })
    }

    #[tokio::test]
    async fn test_locate_ok() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/position")
                    .query_param("accuracy", "high");
                then.status(200)
                    .json_body(json!({"latitude": 10.0, "longitude": 76.0}));
            })
            .await;

        let pos = locator(server.url("/position")).locate().await.unwrap();

        m.assert_async().await;
        assert_eq!(Position::new(10.0, 76.0), pos);
    }

    #[tokio::test]
    async fn test_locate_denied() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/position");
                then.status(403);
            })
            .await;

        let res = locator(server.url("/position")).locate().await;
        assert!(matches!(res, Err(GeolocationError::Denied)));
    }

    #[tokio::test]
    async fn test_locate_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/position");
                then.status(503);
            })
            .await;

        let res = locator(server.url("/position")).locate().await;
        assert!(matches!(res, Err(GeolocationError::Unavailable)));
    }

    #[tokio::test]
    async fn test_locate_garbage_position() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/position");
                then.status(200)
                    .json_body(json!({"latitude": 91.0, "longitude": 0.0}));
            })
            .await;

        let res = locator(server.url("/position")).locate().await;
        assert!(matches!(res, Err(GeolocationError::Unavailable)));
    }
}
