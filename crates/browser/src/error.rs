//! Driver error type

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

use crate::cdp::CDPError;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("no Chrome/Chromium executable found; set the executable path explicitly")]
    ExecutableNotFound,

    #[error("failed to launch browser at {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("browser exited before DevTools became available ({0})")]
    Exited(ExitStatus),

    #[error("DevTools endpoint not available after {0:?}")]
    StartTimeout(Duration),

    #[error("cannot read DevTools descriptor {path}: {reason}")]
    Descriptor { path: PathBuf, reason: String },

    #[error("browser is not running")]
    NotRunning,

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error(transparent)]
    Cdp(#[from] CDPError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, DriverError>;
