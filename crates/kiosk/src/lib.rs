//! Kiosk supervisor
//!
//! Keeps an unattended browser on its home page: launches it through a
//! [`browser::BrowserDriver`], sends every forbidden navigation back home,
//! restarts the browser when it dies, and goes home when the page falls
//! silent.
//!
//! # Moving parts
//!
//! - [`Supervisor`] owns the session and the driver, and runs the watchdog
//! - [`watchdog::Watchdog`] polls liveness and idleness every 3 seconds
//! - [`filter::EventFilter`] checks each navigation event against the allow-list
//! - [`activity::ActivityClock`] is the only state the last two share

pub mod activity;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod navigation;
pub mod session;
pub mod supervisor;
pub mod watchdog;

#[cfg(test)]
mod testing;

pub use config::KioskConfig;
pub use error::KioskError;
pub use session::{AllowList, SessionConfig};
pub use supervisor::Supervisor;
