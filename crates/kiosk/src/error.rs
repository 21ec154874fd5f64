//! Kiosk error taxonomy
//!
//! `Config` and `Launch` are fatal and end the process. `Command` and
//! `Unavailable` only ever reach the log; the next watchdog tick or event
//! tries again.

use browser::DriverError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KioskError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot launch browser: {0}")]
    Launch(#[source] DriverError),

    #[error("browser command failed: {0}")]
    Command(#[source] DriverError),

    #[error("browser unavailable: {0}")]
    Unavailable(#[source] DriverError),

    #[error("supervisor already started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, KioskError>;
