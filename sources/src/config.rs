//! Main configuration management and loading
//!
//! Everything the tracker needs to reach its remote services lives in one
//! `sources.hcl` file: the live feed endpoint and token, the directions
//! provider and its key, the position provider, and the known fleet.
//!

use std::collections::BTreeMap;
use std::fs;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use eyre::{eyre, Result};
use serde::Deserialize;
use tracing::trace;

use transit_common::{default_file, Position};

use crate::Auth;

/// Default configuration filename
const CONFIG: &str = "sources.hcl";
/// Current version, safety check on load
const CVERSION: usize = 1;

/// The live position feed.
///
#[derive(Clone, Debug, Deserialize)]
pub struct FeedSite {
    /// host:port of the feed
    pub base_url: String,
    /// Credentials
    pub auth: Option<Auth>,
}

/// The external directions provider.
///
#[derive(Clone, Debug, Deserialize)]
pub struct DirectionsSite {
    /// Full endpoint URL
    pub base_url: String,
    /// Credentials
    pub auth: Option<Auth>,
    /// The fixed destination every route ends at (the campus)
    pub destination: Position,
}

/// The position provider standing in for the platform location capability.
///
#[derive(Clone, Debug, Deserialize)]
pub struct LocatorSite {
    /// Full endpoint URL
    pub base_url: String,
}

/// The whole `sources.hcl` content.
///
#[derive(Debug, Deserialize)]
pub struct Sources {
    /// Version number for safety
    pub version: usize,
    pub feed: FeedSite,
    pub directions: DirectionsSite,
    pub locator: LocatorSite,
    /// Known fleet, id → display name.  Vehicles listed here exist in
    /// snapshots before their first position event.
    #[serde(default)]
    pub vehicles: BTreeMap<String, String>,
}

impl Sources {
    /// Returns the path of the default config file
    ///
    pub fn default_file() -> PathBuf {
        default_file(CONFIG)
    }

    /// Install the default file
    ///
    pub fn install_defaults(dir: &Path) -> std::io::Result<()> {
        // Create config directory if needed
        //
        if !dir.exists() {
            create_dir_all(dir)?
        }

        // Copy content of `sources.hcl` into place.
        //
        let fname = dir.join(CONFIG);
        let content = include_str!("sources.hcl");
        fs::write(fname, content)
    }

    /// Load configuration from either the specified file or the default one.
    ///
    #[tracing::instrument]
    pub fn load(fname: Option<&PathBuf>) -> Result<Sources> {
        let cnf = match fname {
            Some(cnf) => cnf.clone(),
            _ => Sources::default_file(),
        };
        trace!("Loading from {:?}", cnf);

        let data = fs::read_to_string(&cnf)?;
        Sources::from_hcl(&data)
    }

    /// Parse and check the version number.
    ///
    fn from_hcl(data: &str) -> Result<Sources> {
        let cfg: Sources = hcl::from_str(data)?;
        if cfg.version != CVERSION {
            return Err(eyre!("Bad sources file version, aborting…"));
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let cfg = Sources::from_hcl(include_str!("sources.hcl")).unwrap();
        assert_eq!(CVERSION, cfg.version);
        assert!(!cfg.feed.base_url.is_empty());
        assert!(cfg.directions.destination.is_valid());
        assert!(!cfg.vehicles.is_empty());
    }

    #[test]
    fn test_bad_version_is_rejected() {
        let data = include_str!("sources.hcl").replacen("version = 1", "version = 0", 1);
        assert!(Sources::from_hcl(&data).is_err());
    }

    #[test]
    fn test_auth_shapes() {
        let cfg = Sources::from_hcl(include_str!("sources.hcl")).unwrap();
        assert!(matches!(cfg.feed.auth, Some(Auth::Token { .. })));
        assert!(matches!(cfg.directions.auth, Some(Auth::Key { .. })));
    }
}
