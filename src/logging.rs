//! Log sink setup
//!
//! Installs a `tracing-subscriber` fmt subscriber writing either to the log
//! file in the base directory (truncated on start) or to stderr.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors from installing the log subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file could not be created
    #[error("could not create log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A global subscriber was already installed
    #[error("failed to install log subscriber: {0}")]
    Init(String),
}

/// Where log events go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Truncate and write to this file
    File(PathBuf),
    /// Write to stderr
    Stderr,
}

/// Filter from `RUST_LOG`, or `debug`/`info` depending on `verbose`
pub fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "i3geoweather=debug,info" } else { "info" })
    })
}

/// Installs the global subscriber
pub fn init(target: LogTarget, verbose: bool) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose))
        .with_target(false);

    let result = match target {
        LogTarget::File(path) => {
            let file = File::create(&path).map_err(|source| LoggingError::Io { path, source })?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        LogTarget::Stderr => builder.with_writer(io::stderr).try_init(),
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}
