//! The one corrective action the kiosk knows: go home

use browser::{BrowserDriver, Task};
use std::sync::Arc;
use url::Url;

use crate::error::{KioskError, Result};

/// Navigation capability handed to the watchdog and the event filter
///
/// Cheap to clone. Every call is idempotent: it always lands on the same
/// home page, so overlapping calls are harmless.
#[derive(Clone)]
pub struct HomeNavigation {
    driver: Arc<dyn BrowserDriver>,
    home: Url,
}

impl HomeNavigation {
    pub fn new(driver: Arc<dyn BrowserDriver>, home: Url) -> Self {
        Self { driver, home }
    }

    /// Sequence run once after launch
    pub fn initial_tasks(&self) -> Vec<Task> {
        vec![Task::navigate(self.home.as_str()), Task::disable("Fetch")]
    }

    /// Sequence run on every recovery
    pub fn recovery_tasks(&self) -> Vec<Task> {
        vec![Task::navigate(self.home.as_str())]
    }

    pub async fn go_home(&self) -> Result<()> {
        self.run(&self.recovery_tasks()).await
    }

    pub async fn run(&self, tasks: &[Task]) -> Result<()> {
        self.driver.run_tasks(tasks).await.map_err(KioskError::Command)
    }

    /// Go home, logging instead of returning a failure
    pub async fn go_home_logged(&self, reason: &str) {
        tracing::debug!(reason, home = %self.home, "navigating home");
        if let Err(e) = self.go_home().await {
            tracing::error!(error = %e, reason, "could not navigate home");
        }
    }
}
