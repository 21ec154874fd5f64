//! Event Filter - keeps the kiosk on allowed pages
//!
//! Every event counts as activity. Requests issued by a document outside
//! the allow-list send the page home. The check runs on the driver's
//! delivery path, so the navigation itself is spawned and never awaited here.

use browser::{BrowserEvent, EventSubscriber};
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::activity::ActivityClock;
use crate::navigation::HomeNavigation;
use crate::session::AllowList;

pub struct EventFilter {
    allow_list: AllowList,
    navigation: HomeNavigation,
    activity: Arc<ActivityClock>,
    runtime: Handle,
}

impl EventFilter {
    /// Must be called from within a tokio runtime; corrective navigations
    /// are spawned onto it.
    pub fn new(allow_list: AllowList, navigation: HomeNavigation, activity: Arc<ActivityClock>) -> Self {
        Self {
            allow_list,
            navigation,
            activity,
            runtime: Handle::current(),
        }
    }
}

impl EventSubscriber for EventFilter {
    fn name(&self) -> &str {
        "EventFilter"
    }

    fn on_event(&self, event: &BrowserEvent) {
        self.activity.touch();

        let BrowserEvent::RequestWillBeSent { document_url, .. } = event else {
            return;
        };
        if self.allow_list.permits(document_url) {
            return;
        }

        tracing::info!(url = %document_url, "forbidden URL");
        let navigation = self.navigation.clone();
        self.runtime.spawn(async move {
            navigation.go_home_logged("forbidden URL").await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use crate::testing::MockDriver;
    use browser::Task;
    use std::time::Duration;

    fn filter(driver: &Arc<MockDriver>) -> (EventFilter, Arc<ActivityClock>) {
        let session = SessionConfig::new(
            vec!["https://example.org".to_string()],
            "https://example.org/app?x=1",
            Duration::from_secs(5),
            Duration::ZERO,
        )
        .unwrap();
        let activity = Arc::new(ActivityClock::new());
        let navigation = HomeNavigation::new(driver.clone(), session.home.clone());
        let filter = EventFilter::new(session.allow_list, navigation, activity.clone());
        (filter, activity)
    }

    fn request(document_url: &str) -> BrowserEvent {
        BrowserEvent::RequestWillBeSent {
            request_id: "1".to_string(),
            document_url: document_url.to_string(),
            url: format!("{}/favicon.ico", document_url),
        }
    }

    /// Let spawned corrective navigations run
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_allowed_request_is_left_alone() {
        let driver = MockDriver::new();
        let (filter, _) = filter(&driver);

        filter.on_event(&request("https://example.org/other"));
        settle().await;

        assert!(driver.sequences().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_request_goes_home_once() {
        let driver = MockDriver::new();
        let (filter, _) = filter(&driver);

        filter.on_event(&request("https://evil.test/x"));
        settle().await;

        assert_eq!(
            driver.sequences(),
            vec![vec![Task::navigate("https://example.org/app?x=1")]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_event_is_activity() {
        let driver = MockDriver::new();
        let (filter, activity) = filter(&driver);

        for event in [
            request("https://example.org/ok"),
            request("https://evil.test/x"),
            BrowserEvent::LoadEventFired,
        ] {
            tokio::time::advance(Duration::from_secs(4)).await;
            assert_eq!(activity.idle(), Duration::from_secs(4));
            filter.on_event(&event);
            assert_eq!(activity.idle(), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_requests_are_checked() {
        let driver = MockDriver::new();
        let (filter, _) = filter(&driver);

        filter.on_event(&BrowserEvent::FrameNavigated {
            url: "https://evil.test/x".to_string(),
        });
        filter.on_event(&BrowserEvent::ResponseReceived {
            request_id: "2".to_string(),
            url: "https://evil.test/x".to_string(),
        });
        settle().await;

        assert!(driver.sequences().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure_is_swallowed() {
        let driver = MockDriver::new();
        driver.fail_tasks.store(true, std::sync::atomic::Ordering::SeqCst);
        let (filter, _) = filter(&driver);

        filter.on_event(&request("https://evil.test/a"));
        filter.on_event(&request("https://evil.test/b"));
        settle().await;

        // Both attempted, neither escalated
        assert_eq!(driver.navigations(), 2);
    }

    #[test]
    fn test_delivery_from_foreign_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let driver = MockDriver::new();
        let (filter, _) = runtime.block_on(async { filter(&driver) });
        let filter = Arc::new(filter);

        let delivering = filter.clone();
        std::thread::spawn(move || delivering.on_event(&request("https://evil.test/x")))
            .join()
            .unwrap();

        runtime.block_on(async {
            for _ in 0..100 {
                if driver.navigations() == 1 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });
        assert_eq!(driver.navigations(), 1);
    }
}
