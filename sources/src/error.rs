use thiserror::Error;

pub use transit_formats::DecodeError;

/// Geolocation failures, one variant per condition the position provider can
/// report.  Never retried from here, the caller decides.
///
#[derive(Debug, Error)]
pub enum GeolocationError {
    #[error("permission denied by the position provider")]
    Denied,
    #[error("position unavailable")]
    Unavailable,
    #[error("no position within the timeout budget")]
    Timeout,
    #[error("unknown geolocation failure: {0}")]
    Unknown(String),
}

/// Route fetching failures.
///
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("directions provider returned {0}")]
    Status(reqwest::StatusCode),
    #[error("no route found between the given points")]
    NoRoute,
    #[error("bad route geometry: {0}")]
    Decode(#[from] DecodeError),
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Live feed failures.  Transport-level ones drive the reconnection state
/// machine; `AttemptsExhausted` is the only fatal, user-visible one.
///
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("connect to {0} failed: {1}")]
    Connect(String, #[source] std::io::Error),
    #[error("subscribe failed: {0}")]
    Handshake(#[source] std::io::Error),
    #[error("feed closed by peer")]
    Closed,
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("gave up after {0} connection attempts")]
    AttemptsExhausted(usize),
}
