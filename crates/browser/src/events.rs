//! Browser events and the subscription interface
//!
//! Design: the driver translates the raw CDP stream into a small enum and
//! hands each event to every registered subscriber, synchronously, on the
//! CDP reader task. Subscribers that need to do real work spawn it.

use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};

use crate::cdp::CDPEvent;

/// CDP methods the driver forwards to subscribers
pub const FORWARDED_EVENTS: &[&str] = &[
    "Network.requestWillBeSent",
    "Network.responseReceived",
    "Page.frameNavigated",
    "Page.domContentEventFired",
    "Page.loadEventFired",
    "Inspector.targetCrashed",
];

/// Navigation-related events from the managed page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    /// A request is about to leave; `document_url` is the page that issued it
    RequestWillBeSent {
        request_id: String,
        document_url: String,
        url: String,
    },
    ResponseReceived {
        request_id: String,
        url: String,
    },
    FrameNavigated {
        url: String,
    },
    DomContentLoaded,
    LoadEventFired,
    /// The renderer for the page died
    TargetCrashed,
}

impl BrowserEvent {
    /// Event-kind tag (the CDP method this came from)
    pub fn kind(&self) -> &'static str {
        match self {
            BrowserEvent::RequestWillBeSent { .. } => "Network.requestWillBeSent",
            BrowserEvent::ResponseReceived { .. } => "Network.responseReceived",
            BrowserEvent::FrameNavigated { .. } => "Page.frameNavigated",
            BrowserEvent::DomContentLoaded => "Page.domContentEventFired",
            BrowserEvent::LoadEventFired => "Page.loadEventFired",
            BrowserEvent::TargetCrashed => "Inspector.targetCrashed",
        }
    }

    /// Translate a raw CDP event. `None` for methods we don't forward or
    /// payloads missing the fields we need.
    pub fn from_cdp(event: &CDPEvent) -> Option<Self> {
        let params = event.params.as_ref().unwrap_or(&Value::Null);
        let text = |v: &Value| v.as_str().map(str::to_string);

        match event.method.as_str() {
            "Network.requestWillBeSent" => Some(BrowserEvent::RequestWillBeSent {
                request_id: text(&params["requestId"]).unwrap_or_default(),
                document_url: text(&params["documentURL"])?,
                url: text(&params["request"]["url"]).unwrap_or_default(),
            }),
            "Network.responseReceived" => Some(BrowserEvent::ResponseReceived {
                request_id: text(&params["requestId"]).unwrap_or_default(),
                url: text(&params["response"]["url"]).unwrap_or_default(),
            }),
            "Page.frameNavigated" => Some(BrowserEvent::FrameNavigated {
                url: text(&params["frame"]["url"])?,
            }),
            "Page.domContentEventFired" => Some(BrowserEvent::DomContentLoaded),
            "Page.loadEventFired" => Some(BrowserEvent::LoadEventFired),
            "Inspector.targetCrashed" => Some(BrowserEvent::TargetCrashed),
            _ => None,
        }
    }
}

/// Receives browser events
///
/// Called from the driver's delivery context, possibly concurrently with
/// anything else in the process. Must return quickly.
pub trait EventSubscriber: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &str;

    /// Handle one event
    fn on_event(&self, event: &BrowserEvent);
}

/// Registered subscribers, shared between the driver and its CDP callbacks
#[derive(Default)]
pub struct Subscribers {
    inner: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>) {
        tracing::debug!("Registered event subscriber: {}", subscriber.name());
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(subscriber);
    }

    /// Hand the event to every subscriber, in registration order
    pub fn dispatch(&self, event: &BrowserEvent) {
        let subscribers = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        for subscriber in subscribers.iter() {
            subscriber.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
