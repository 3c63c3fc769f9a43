//! Logging setup for the devdb binary.
//!
//! Library code logs through `tracing` macros; the binary installs a plain
//! fmt subscriber on stderr so stdout stays free for `--json` output.
//! `RUST_LOG` directives apply when no `-v`/`-q` flag is given.

use crate::error::{Error, Result};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map CLI verbosity flags to a tracing level.
///
/// `quiet` wins over any `-v` count.
pub fn level_for(verbose: u8, quiet: bool) -> Level {
    match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// Filter for the given flags and `RUST_LOG` value. Explicit flags win;
/// unparsable directives fall back to the flag level.
pub fn filter_for(verbose: u8, quiet: bool, rust_log: Option<&str>) -> EnvFilter {
    let flags_given = quiet || verbose > 0;
    if !flags_given {
        if let Some(filter) = rust_log.and_then(|d| EnvFilter::try_new(d).ok()) {
            return filter;
        }
    }
    EnvFilter::default().add_directive(LevelFilter::from_level(level_for(verbose, quiet)).into())
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(verbose: u8, quiet: bool) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose, quiet, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
        .map_err(|e| Error::configuration(format!("Failed to initialize logging: {}", e)))
}
