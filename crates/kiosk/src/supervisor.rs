//! Supervisor - owns the kiosk session from launch to shutdown

use browser::BrowserDriver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::activity::ActivityClock;
use crate::error::{KioskError, Result};
use crate::filter::EventFilter;
use crate::navigation::HomeNavigation;
use crate::session::SessionConfig;
use crate::watchdog::{Watchdog, WATCHDOG_INTERVAL};

/// Upper bound for closing the browser on shutdown
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Supervisor {
    session: SessionConfig,
    driver: Arc<dyn BrowserDriver>,
    navigation: HomeNavigation,
    activity: Arc<ActivityClock>,
    alive: Arc<AtomicBool>,
    started: AtomicBool,
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    pub fn new(session: SessionConfig, driver: Arc<dyn BrowserDriver>) -> Self {
        let navigation = HomeNavigation::new(driver.clone(), session.home.clone());
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            session,
            driver,
            navigation,
            activity: Arc::new(ActivityClock::new()),
            alive: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            watchdog: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Browser state as of the last check
    pub fn is_browser_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Time since the browser last produced an event
    pub fn idle(&self) -> Duration {
        self.activity.idle()
    }

    /// Launch the browser, send it home, and start the watchdog.
    ///
    /// Returns once the watchdog is running. Only launch problems are
    /// errors; a failed first navigation is left to the watchdog.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(KioskError::AlreadyStarted);
        }

        self.driver.subscribe(Arc::new(EventFilter::new(
            self.session.allow_list.clone(),
            self.navigation.clone(),
            self.activity.clone(),
        )));

        tracing::info!(session = %self.session.id, home = %self.session.home, "launching browser");
        self.driver.launch().await.map_err(KioskError::Launch)?;
        self.alive.store(true, Ordering::SeqCst);

        tokio::time::sleep(self.session.task_delay).await;

        let endpoint = match self.driver.devtools_endpoint().await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::error!(error = %e, "cannot read DevTools descriptor");
                return Err(KioskError::Launch(e));
            }
        };
        tracing::debug!(port = endpoint.port, path = %endpoint.browser_path, "DevTools endpoint");

        if let Err(e) = self.navigation.run(&self.navigation.initial_tasks()).await {
            tracing::error!(error = %e, "could not navigate home");
        }
        self.activity.touch();

        let Some(shutdown) = self.shutdown_tx.lock().await.as_ref().map(watch::Sender::subscribe) else {
            tracing::warn!("shutdown requested during start, not starting watchdog");
            return Ok(());
        };

        let watchdog = Watchdog::new(
            self.driver.clone(),
            self.navigation.clone(),
            self.activity.clone(),
            self.session.idle_timeout,
            self.alive.clone(),
        );
        let span = tracing::info_span!("watchdog", session = %self.session.id);
        let handle = tokio::spawn(watchdog.run(shutdown).instrument(span));
        *self.watchdog.lock().await = Some(handle);

        Ok(())
    }

    /// Stop the watchdog and close the browser. Later calls do nothing.
    pub async fn shutdown(&self) {
        let Some(shutdown_tx) = self.shutdown_tx.lock().await.take() else {
            return;
        };
        tracing::info!(session = %self.session.id, "shutting down");
        let _ = shutdown_tx.send(true);

        if let Some(mut handle) = self.watchdog.lock().await.take() {
            match tokio::time::timeout(WATCHDOG_INTERVAL, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "watchdog task failed"),
                Err(_) => {
                    tracing::warn!("watchdog did not stop in time, aborting it");
                    handle.abort();
                }
            }
        }

        match tokio::time::timeout(CLOSE_TIMEOUT, self.driver.close()).await {
            Ok(Ok(())) => tracing::info!("browser closed"),
            Ok(Err(e)) => tracing::warn!(error = %e, "could not close browser"),
            Err(_) => tracing::warn!("browser did not close within {:?}", CLOSE_TIMEOUT),
        }
        self.alive.store(false, Ordering::SeqCst);
    }
}
