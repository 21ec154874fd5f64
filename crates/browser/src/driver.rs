//! Browser Driver contract
//!
//! Everything a supervisor needs from the browser and nothing more:
//! start it, check it, restart it, stop it, send it command sequences,
//! and hear about what the page is doing.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::events::EventSubscriber;
use crate::launcher::DevToolsEndpoint;
use crate::task::Task;

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Start the browser process and connect to it
    async fn launch(&self) -> Result<()>;

    /// Process alive, control channel open, page not crashed
    async fn is_running(&self) -> bool;

    /// Relaunch after a crash. Replaces whatever is left of the old instance.
    async fn startup(&self) -> Result<()>;

    /// Stop the browser process and release its resources
    async fn close(&self) -> Result<()>;

    /// Run tasks in order; the first failure aborts the rest and is returned
    async fn run_tasks(&self, tasks: &[Task]) -> Result<()>;

    /// Re-read the handshake descriptor of the running browser
    async fn devtools_endpoint(&self) -> Result<DevToolsEndpoint>;

    /// Register for events. Registrations survive restarts.
    fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>);
}
