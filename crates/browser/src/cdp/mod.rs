//! CDP (Chrome DevTools Protocol) Client Implementation
//!
//! Core principle: Single WebSocket connection, multiplexed sessions.

pub mod client;
pub mod protocol;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{CDPClient, CDPError};
pub use protocol::{CDPEvent, CDPRequest, CDPResponse};
pub use session::CDPSession;
