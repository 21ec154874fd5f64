//! Watchdog loop - the kiosk's self-healing
//!
//! Every tick: if the browser is gone, restart it and go home; if the page
//! has been silent for longer than the idle timeout, go home. Failures are
//! logged and left for the next tick.

use browser::BrowserDriver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::activity::ActivityClock;
use crate::error::KioskError;
use crate::navigation::HomeNavigation;

/// Fixed polling period
pub const WATCHDOG_INTERVAL: Duration = Duration::from_secs(3);

pub struct Watchdog {
    driver: Arc<dyn BrowserDriver>,
    navigation: HomeNavigation,
    activity: Arc<ActivityClock>,
    idle_timeout: Duration,
    /// Browser state seen on the previous tick
    alive: Arc<AtomicBool>,
}

impl Watchdog {
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        navigation: HomeNavigation,
        activity: Arc<ActivityClock>,
        idle_timeout: Duration,
        alive: Arc<AtomicBool>,
    ) -> Self {
        Self {
            driver,
            navigation,
            activity,
            idle_timeout,
            alive,
        }
    }

    /// Tick until `shutdown` flips (or its sender goes away)
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval_at(Instant::now() + WATCHDOG_INTERVAL, WATCHDOG_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!("watchdog started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = interval.tick() => {}
            }
            self.tick().await;
        }
        tracing::debug!("watchdog stopped");
    }

    pub async fn tick(&self) {
        if self.driver.is_running().await {
            if !self.alive.swap(true, Ordering::SeqCst) {
                tracing::info!("browser is running");
            }
        } else {
            if self.alive.swap(false, Ordering::SeqCst) {
                tracing::warn!("browser is not running");
            }
            match self.driver.startup().await {
                Ok(()) => {
                    self.alive.store(true, Ordering::SeqCst);
                    tracing::info!("browser restarted");
                }
                Err(e) => {
                    tracing::error!(error = %KioskError::Unavailable(e), "browser restart failed");
                }
            }
            self.navigation.go_home_logged("browser restart").await;
        }

        let idle = self.activity.idle();
        if idle > self.idle_timeout {
            tracing::info!(?idle, "no browser activity");
            self.navigation.go_home_logged("idle timeout").await;
        }
    }
}
