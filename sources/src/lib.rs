//! Module to deal with the different remote services the tracker talks to.
//!
//! The different submodules deal with the differences between them:
//!
//! - authentication (bearer token, API key or nothing)
//! - one-shot request/response (`directions`, `locator`)
//! - persistent streaming (`livefeed`)
//!

// Re-export these modules for a shorter import path.
//
pub use access::*;
pub use auth::*;
pub use config::*;
pub use error::*;

mod access;
mod auth;
mod config;
mod error;
