//! `transitctl` is the CLI utility driving the tracking core.
//!
//! Two independent pipelines meet here:
//!
//! - live feed → coalescer → fleet map → snapshot printing (`track`)
//! - position provider → directions provider → polyline decoder (`route`)
//!

use std::time::Duration;

use clap::{crate_name, crate_version, Parser};
use eyre::Result;
use tabled::builder::Builder;
use tabled::settings::Style;
use tokio::time::{interval, sleep};
use tracing::{info, trace};

use transit_common::{config_path, init_logging, Position, BB};
use transit_engine::{Session, VehicleStatus, FLUSH_INTERVAL};
use transit_formats::polyline;
use transit_sources::{Directions, LiveFeed, Locator, Sources};

use crate::cli::{DecodeOpts, Opts, SubCommand, TrackOpts};

mod cli;

/// Binary name
pub const NAME: &str = crate_name!();
/// Binary version
pub const VERSION: &str = crate_version!();

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();

    // Initialise logging.
    //
    init_logging();

    // Config has the endpoints & credentials for every source, plus the
    // known fleet.
    //
    let cfg = match opts.config {
        Some(ref fname) => Sources::load(Some(fname))?,
        None => {
            let def = Sources::default_file();
            if !def.exists() {
                info!("Installing default configuration in {:?}", config_path());
                Sources::install_defaults(&config_path())?;
            }
            Sources::load(None)?
        }
    };

    // Banner
    //
    eprintln!("{}/{}", NAME, VERSION);

    handle_subcmd(&cfg, &opts.subcmd).await
}

async fn handle_subcmd(cfg: &Sources, subcmd: &SubCommand) -> Result<()> {
    match subcmd {
        // Handle `track`
        //
        SubCommand::Track(topts) => {
            trace!("track");

            track(cfg, topts).await
        }

        // Handle `route`
        //
        SubCommand::Route(ropts) => {
            trace!("route");

            let origin = match (ropts.from_lat, ropts.from_lon) {
                (Some(lat), Some(lon)) => Position::new(lat, lon),
                _ => Locator::new(&cfg.locator).locate().await?,
            };
            let path = Directions::new(&cfg.directions)
                .route(origin, cfg.directions.destination)
                .await?;

            print_path(&path);
            Ok(())
        }

        // Handle `locate`
        //
        SubCommand::Locate => {
            trace!("locate");

            let pos = Locator::new(&cfg.locator).locate().await?;
            println!("{}", pos);
            Ok(())
        }

        // Handle `decode`
        //
        SubCommand::Decode(DecodeOpts { polyline: line }) => {
            trace!("decode");

            let path = polyline::decode(line)?;
            print_path(&path);
            Ok(())
        }

        // Handle `list`
        //
        SubCommand::List => {
            trace!("list");

            let mut builder = Builder::default();
            builder.push_record(["Id", "Name"]);
            cfg.vehicles.iter().for_each(|(id, name)| {
                builder.push_record([id, name]);
            });
            println!("{}", builder.build().with(Style::modern()).to_string());
            Ok(())
        }
    }
}

/// Follow the live feed, printing a fleet snapshot at every coalescing
/// interval until Ctrl+C or the timer expires.
///
#[tracing::instrument(skip(cfg))]
async fn track(cfg: &Sources, opts: &TrackOpts) -> Result<()> {
    let mut feed = LiveFeed::new(&cfg.feed);
    if let Some(radius) = opts.radius {
        feed = feed.with_bbox(BB::from_position(&cfg.directions.destination, radius));
    }

    let session = Session::start(&feed, &cfg.vehicles);

    // 0 means forever.
    //
    let total = if opts.duration == 0 {
        // Effectively forever; Ctrl+C is the way out.
        Duration::from_secs(86_400 * 365)
    } else {
        Duration::from_secs(opts.duration)
    };
    let deadline = sleep(total);
    tokio::pin!(deadline);

    let mut tick = interval(FLUSH_INTERVAL);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                println!("[{}]", session.connection());
                println!("{}", fmt_snapshot(&session.snapshot()));
            }
            _ = &mut deadline => {
                trace!("End of scheduled run.");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                trace!("^C");
                break;
            }
        }
    }

    session.stop().await;
    Ok(())
}

/// Render one snapshot the way `list` does, status included.
///
fn fmt_snapshot(snap: &[VehicleStatus]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Id", "Name", "Position", "Last seen", "Status"]);

    snap.iter().for_each(|v| {
        let pos = v
            .last_position
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".into());
        let seen = v
            .last_seen
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".into());
        let status = if v.online { "online" } else { "offline" };
        builder.push_record([v.id.as_str(), v.name.as_str(), &pos, &seen, status]);
    });

    builder.build().with(Style::modern()).to_string()
}

/// One position per line, latitude first.
///
fn print_path(path: &[Position]) {
    path.iter().for_each(|p| println!("{}", p));
}
