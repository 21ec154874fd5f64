//! Chrome Driver - BrowserDriver over a locally launched Chromium
//!
//! Owns one browser instance at a time. A restart builds a complete new
//! instance (process, profile, CDP connection, page session) and throws the
//! old one away; nothing is patched in place.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::Mutex;

use crate::cdp::{CDPClient, CDPEvent, CDPSession};
use crate::driver::BrowserDriver;
use crate::error::{DriverError, Result};
use crate::events::{BrowserEvent, EventSubscriber, Subscribers, FORWARDED_EVENTS};
use crate::launcher::{self, DevToolsEndpoint, LaunchOptions, Profile};
use crate::task::Task;

/// How long `close` waits for the process to exit after killing it
const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

/// One launched browser instance
struct Instance {
    child: Child,
    // Dropped after the child is gone so a temp profile can be removed
    profile: Profile,
    client: Arc<CDPClient>,
    page: CDPSession,
    crashed: Arc<AtomicBool>,
}

impl Instance {
    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
            && !self.client.is_closed()
            && !self.crashed.load(Ordering::SeqCst)
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.client.close().await {
            tracing::debug!("CDP close failed: {}", e);
        }
        if let Err(e) = self.child.start_kill() {
            tracing::debug!("Browser kill failed: {}", e);
        }
        match tokio::time::timeout(EXIT_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => tracing::debug!("Browser exited: {}", status),
            Ok(Err(e)) => tracing::warn!("Waiting for browser failed: {}", e),
            Err(_) => tracing::warn!("Browser did not exit within {:?}", EXIT_TIMEOUT),
        }
        drop(self.profile);
    }
}

/// Drives a Chromium process over CDP
pub struct ChromeDriver {
    options: LaunchOptions,
    subscribers: Arc<Subscribers>,
    instance: Mutex<Option<Instance>>,
}

impl ChromeDriver {
    pub fn new(options: LaunchOptions) -> Self {
        Self {
            options,
            subscribers: Arc::new(Subscribers::new()),
            instance: Mutex::new(None),
        }
    }

    async fn spawn_instance(&self) -> Result<Instance> {
        let profile = Profile::create(&self.options)?;
        let (child, endpoint) = launcher::spawn(&self.options, &profile).await?;

        let client = CDPClient::connect(&endpoint.ws_url()).await?;
        let crashed = Arc::new(AtomicBool::new(false));
        self.forward_events(&client, &crashed);

        let page = CDPSession::attach_first_page(client.clone()).await?;
        tracing::info!("Browser ready, page target {}", page.target_id);

        Ok(Instance {
            child,
            profile,
            client,
            page,
            crashed,
        })
    }

    /// Route CDP events to our subscribers
    fn forward_events(&self, client: &CDPClient, crashed: &Arc<AtomicBool>) {
        for method in FORWARDED_EVENTS {
            let subscribers = self.subscribers.clone();
            let crashed = crashed.clone();
            client.subscribe(
                *method,
                Arc::new(move |event: CDPEvent| {
                    let Some(event) = BrowserEvent::from_cdp(&event) else {
                        return;
                    };
                    if event == BrowserEvent::TargetCrashed {
                        tracing::warn!("Page target crashed");
                        crashed.store(true, Ordering::SeqCst);
                    }
                    subscribers.dispatch(&event);
                }),
            );
        }
    }

    async fn page(&self) -> Result<CDPSession> {
        self.instance
            .lock()
            .await
            .as_ref()
            .map(|instance| instance.page.clone())
            .ok_or(DriverError::NotRunning)
    }
}

/// Send `tasks` in order, stopping at the first failure
async fn run_on_page(page: &CDPSession, tasks: &[Task]) -> Result<()> {
    for task in tasks {
        tracing::debug!("Running task: {}", task);
        let result = page.send(task.method(), task.params()).await?;

        // Page.navigate reports unreachable hosts in the result, not as an error
        if let Task::Navigate(url) = task {
            if let Some(reason) = result.get("errorText").and_then(Value::as_str) {
                return Err(DriverError::Navigation {
                    url: url.clone(),
                    reason: reason.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn launch(&self) -> Result<()> {
        let mut slot = self.instance.lock().await;
        if let Some(old) = slot.take() {
            old.shutdown().await;
        }
        *slot = Some(self.spawn_instance().await?);
        Ok(())
    }

    async fn is_running(&self) -> bool {
        match self.instance.lock().await.as_mut() {
            Some(instance) => instance.is_alive(),
            None => false,
        }
    }

    async fn startup(&self) -> Result<()> {
        tracing::info!("Restarting browser");
        self.launch().await
    }

    async fn close(&self) -> Result<()> {
        let instance = self.instance.lock().await.take();
        if let Some(instance) = instance {
            instance.shutdown().await;
        }
        Ok(())
    }

    async fn run_tasks(&self, tasks: &[Task]) -> Result<()> {
        let page = self.page().await?;
        run_on_page(&page, tasks).await
    }

    async fn devtools_endpoint(&self) -> Result<DevToolsEndpoint> {
        let slot = self.instance.lock().await;
        let instance = slot.as_ref().ok_or(DriverError::NotRunning)?;
        DevToolsEndpoint::read(instance.profile.path())
    }

    fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.register(subscriber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::testing::{serve, Reply, ScriptedEndpoint};
    use crate::cdp::CDPError;
    use serde_json::json;
    use std::path::PathBuf;

    async fn attached_page(endpoint: &ScriptedEndpoint) -> CDPSession {
        let client = CDPClient::connect(&endpoint.url).await.unwrap();
        let no_domains: &[&str] = &[];
        CDPSession::attach(client, "T1".to_string(), Some(no_domains))
            .await
            .unwrap()
    }

    fn kiosk_tasks() -> Vec<Task> {
        vec![Task::navigate("https://example.org/"), Task::disable("Fetch")]
    }

    #[tokio::test]
    async fn test_tasks_run_in_order() {
        let endpoint = serve(|method| match method {
            "Target.attachToTarget" => Reply::Result(json!({ "sessionId": "S1" })),
            _ => Reply::Result(json!({})),
        })
        .await;
        let page = attached_page(&endpoint).await;

        run_on_page(&page, &kiosk_tasks()).await.unwrap();

        assert_eq!(
            endpoint.received(),
            vec!["Target.attachToTarget", "Page.navigate", "Fetch.disable"]
        );
    }

    #[tokio::test]
    async fn test_navigation_error_text_stops_sequence() {
        let endpoint = serve(|method| match method {
            "Target.attachToTarget" => Reply::Result(json!({ "sessionId": "S1" })),
            "Page.navigate" => Reply::Result(json!({
                "frameId": "F1",
                "errorText": "net::ERR_NAME_NOT_RESOLVED",
            })),
            _ => Reply::Result(json!({})),
        })
        .await;
        let page = attached_page(&endpoint).await;

        let err = run_on_page(&page, &kiosk_tasks()).await.unwrap_err();

        match err {
            DriverError::Navigation { url, reason } => {
                assert_eq!(url, "https://example.org/");
                assert_eq!(reason, "net::ERR_NAME_NOT_RESOLVED");
            }
            other => panic!("expected navigation error, got {:?}", other),
        }
        assert!(!endpoint.received().iter().any(|m| m == "Fetch.disable"));
    }

    #[tokio::test]
    async fn test_protocol_error_stops_sequence() {
        let endpoint = serve(|method| match method {
            "Target.attachToTarget" => Reply::Result(json!({ "sessionId": "S1" })),
            "Page.navigate" => Reply::Error(-32000, "Cannot navigate to invalid URL"),
            _ => Reply::Result(json!({})),
        })
        .await;
        let page = attached_page(&endpoint).await;

        let err = run_on_page(&page, &kiosk_tasks()).await.unwrap_err();

        assert!(matches!(
            err,
            DriverError::Cdp(CDPError::Protocol { code: -32000, .. })
        ));
        assert_eq!(
            endpoint.received(),
            vec!["Target.attachToTarget", "Page.navigate"]
        );
    }

    #[tokio::test]
    async fn test_not_running_before_launch() {
        let driver = ChromeDriver::new(LaunchOptions::kiosk());

        assert!(!driver.is_running().await);
        assert!(matches!(
            driver.run_tasks(&[Task::navigate("about:blank")]).await,
            Err(DriverError::NotRunning)
        ));
        assert!(matches!(
            driver.devtools_endpoint().await,
            Err(DriverError::NotRunning)
        ));
        // Closing nothing is fine
        driver.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_launch_failure_leaves_driver_stopped() {
        let options = LaunchOptions {
            executable: Some(PathBuf::from("/nonexistent/chromium")),
            ..LaunchOptions::kiosk()
        };
        let driver = ChromeDriver::new(options);

        assert!(matches!(driver.launch().await, Err(DriverError::Spawn { .. })));
        assert!(!driver.is_running().await);
        assert!(driver.startup().await.is_err());
    }

    #[tokio::test]
    #[ignore] // Needs Chrome/Chromium installed
    async fn test_launch_navigate_close() {
        let driver = ChromeDriver::new(LaunchOptions::default().flag(
            "headless",
            crate::launcher::FlagValue::Bool(true),
        ));

        driver.launch().await.unwrap();
        assert!(driver.is_running().await);
        assert!(driver.devtools_endpoint().await.unwrap().port > 0);

        driver
            .run_tasks(&[Task::navigate("about:blank"), Task::disable("Fetch")])
            .await
            .unwrap();

        driver.close().await.unwrap();
        assert!(!driver.is_running().await);
    }
}
