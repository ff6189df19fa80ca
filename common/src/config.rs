//! Default locations for the various configuration files.
//!
//! All configuration lives under one base directory; the actual file format
//! and content are up to each crate, we only resolve paths here.
//!

use std::path::PathBuf;

use home::home_dir;
use tracing::trace;

/// Main name for the directory base
const TAG: &str = "transit-rs";

#[cfg(unix)]
const BASEDIR: &str = ".config";

/// Returns the base configuration directory.
///
#[cfg(unix)]
pub fn config_path() -> PathBuf {
    let homedir = home_dir().unwrap();
    let def: PathBuf = makepath!(homedir, BASEDIR, TAG);
    trace!("Config path: {:?}", def);
    def
}

/// Returns the base configuration directory.
///
#[cfg(windows)]
pub fn config_path() -> PathBuf {
    let homedir = env!("LOCALAPPDATA");
    makepath!(homedir, TAG)
}

/// Returns the path of the named file inside the config directory.
///
pub fn default_file(fname: &str) -> PathBuf {
    config_path().join(fname)
}
