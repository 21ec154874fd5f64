//! In-memory BrowserDriver for supervisor and filter tests

use async_trait::async_trait;
use browser::{
    BrowserDriver, BrowserEvent, DevToolsEndpoint, DriverError, EventSubscriber, Subscribers, Task,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MockDriver {
    pub running: AtomicBool,
    pub launches: AtomicUsize,
    pub startups: AtomicUsize,
    pub closes: AtomicUsize,
    pub fail_launch: AtomicBool,
    pub fail_startup: AtomicBool,
    pub fail_tasks: AtomicBool,
    pub missing_descriptor: AtomicBool,
    /// Every sequence passed to `run_tasks`, in call order
    pub sequences: Mutex<Vec<Vec<Task>>>,
    subscribers: Subscribers,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver an event the way the real driver's reader task would
    pub fn emit(&self, event: BrowserEvent) {
        self.subscribers.dispatch(&event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn sequences(&self) -> Vec<Vec<Task>> {
        self.sequences.lock().unwrap().clone()
    }

    /// Number of sequences that navigated somewhere
    pub fn navigations(&self) -> usize {
        self.sequences()
            .iter()
            .filter(|seq| seq.iter().any(|t| matches!(t, Task::Navigate(_))))
            .count()
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn launch(&self) -> Result<(), DriverError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(DriverError::ExecutableNotFound);
        }
        self.set_running(true);
        Ok(())
    }

    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn startup(&self) -> Result<(), DriverError> {
        self.startups.fetch_add(1, Ordering::SeqCst);
        if self.fail_startup.load(Ordering::SeqCst) {
            return Err(DriverError::StartTimeout(std::time::Duration::from_secs(10)));
        }
        self.set_running(true);
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.set_running(false);
        Ok(())
    }

    async fn run_tasks(&self, tasks: &[Task]) -> Result<(), DriverError> {
        self.sequences.lock().unwrap().push(tasks.to_vec());
        if self.fail_tasks.load(Ordering::SeqCst) {
            return Err(DriverError::NotRunning);
        }
        Ok(())
    }

    async fn devtools_endpoint(&self) -> Result<DevToolsEndpoint, DriverError> {
        if self.missing_descriptor.load(Ordering::SeqCst) {
            return Err(DriverError::Descriptor {
                path: "/tmp/profile/DevToolsActivePort".into(),
                reason: "No such file or directory".into(),
            });
        }
        Ok(DevToolsEndpoint {
            port: 9222,
            browser_path: "/devtools/browser/mock".to_string(),
        })
    }

    fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.register(subscriber);
    }
}
