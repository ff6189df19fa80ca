//! Module describing all possible commands and sub-commands to the
//! `transitctl` main driver.
//!
//! We have five main commands:
//!
//! - `track` follows the live feed and prints fleet snapshots at every
//!   coalescing interval
//! - `route` asks the directions provider for a path to the campus (or any
//!   point) and prints the decoded geometry
//! - `locate` asks the position provider where we are
//! - `decode` decodes an encoded polyline given on the command line
//! - `list` shows the fleet known from configuration
//!

use std::path::PathBuf;

use clap::{crate_description, crate_name, crate_version, Parser};

/// CLI options
#[derive(Debug, Parser)]
#[clap(name = crate_name!(), about = crate_description!())]
#[clap(version = crate_version!())]
pub struct Opts {
    /// configuration file.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// Sub-commands (see below).
    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

// ------

/// All sub-commands:
///
/// `track [-d SECS] [-r NM]`
/// `route [--from-lat X --from-lon Y]`
/// `locate`
/// `decode POLYLINE`
/// `list`
///
#[derive(Debug, Parser)]
pub enum SubCommand {
    /// Follow the live feed and print fleet snapshots
    Track(TrackOpts),
    /// Fetch & decode a route to the campus
    Route(RouteOpts),
    /// Ask the position provider where we are
    Locate,
    /// Decode an encoded polyline
    Decode(DecodeOpts),
    /// List the fleet known from configuration
    List,
}

#[derive(Debug, Parser)]
pub struct TrackOpts {
    /// Stop after that many seconds (0 = forever).
    #[clap(short = 'd', long, default_value = "0")]
    pub duration: u64,
    /// Only watch an area of that many nautical miles around the campus.
    #[clap(short = 'r', long)]
    pub radius: Option<u32>,
}

#[derive(Debug, Parser)]
pub struct RouteOpts {
    /// Origin latitude; the position provider is asked when absent.
    #[clap(long, requires = "from_lon")]
    pub from_lat: Option<f64>,
    /// Origin longitude.
    #[clap(long, requires = "from_lat")]
    pub from_lon: Option<f64>,
}

#[derive(Debug, Parser)]
pub struct DecodeOpts {
    /// The encoded polyline.
    pub polyline: String,
}
