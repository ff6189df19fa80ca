//! Common logging initializer.
//!

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise logging early.
///
/// Filters come from the environment (`RUST_LOG`), output is the compact
/// format on stderr.
///
pub fn init_logging() {
    let fmt = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    // Load filters from environment
    //
    let filter = EnvFilter::from_default_env();

    // Combine filter & specific format
    //
    tracing_subscriber::registry().with(filter).with(fmt).init();
}
