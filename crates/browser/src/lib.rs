//! Browser Driver - launch and control a kiosk browser over CDP
//!
//! This crate owns everything that touches the browser itself: the
//! Chromium process, the Chrome DevTools Protocol connection, and the
//! translation of raw CDP traffic into a few navigation events.
//!
//! # Architecture
//!
//! 1. **`cdp`**: one WebSocket, request/response matching, event callbacks
//! 2. **`launcher`**: process spawn, flags, profile dir, `DevToolsActivePort`
//! 3. **`driver`**: the `BrowserDriver` trait a supervisor programs against
//! 4. **`chrome`**: `ChromeDriver`, the real implementation
//!
//! Supervisors never see CDP. They see `Task`s going in and
//! `BrowserEvent`s coming out.

pub mod cdp;
pub mod chrome;
pub mod driver;
pub mod error;
pub mod events;
pub mod launcher;
pub mod task;

pub use cdp::{CDPClient, CDPSession};
pub use chrome::ChromeDriver;
pub use driver::BrowserDriver;
pub use error::DriverError;
pub use events::{BrowserEvent, EventSubscriber, Subscribers};
pub use launcher::{DevToolsEndpoint, FlagValue, LaunchOptions};
pub use task::Task;
