//! CDP Client - The Core Communication Layer
//!
//! Design decisions:
//! 1. Single WebSocket per browser connection (no per-session WS overhead)
//! 2. Request/response matching via ID, events broadcast to subscribers
//! 3. Every request is bounded by a timeout. A hung browser must never
//!    hang the caller.
//! 4. Once the socket is gone the client is dead for good. Reconnecting is
//!    the driver's job (it relaunches the whole browser).

use dashmap::DashMap;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::protocol::*;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

type Pending = Arc<DashMap<RequestId, oneshot::Sender<CDPResponse>>>;
type Subscribers = Arc<DashMap<String, Vec<EventCallback>>>;

/// Default upper bound for a single request round-trip
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum CDPError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CDP protocol error: {code} - {message}")]
    Protocol { code: i32, message: String },

    #[error("Request {method} timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("Connection closed")]
    Closed,
}

/// Result type for CDP operations
pub type Result<T> = std::result::Result<T, CDPError>;

/// Event subscriber callback
///
/// Runs on the reader task. Must not block.
pub type EventCallback = Arc<dyn Fn(CDPEvent) + Send + Sync>;

/// CDP Client - manages single WebSocket connection to browser
pub struct CDPClient {
    /// Monotonic request ID counter
    next_id: AtomicU64,

    /// Pending requests waiting for responses
    pending: Pending,

    /// Key: method name (e.g., "Page.loadEventFired"), Value: callbacks
    subscribers: Subscribers,

    /// WebSocket write half
    ws_sink: Arc<RwLock<WsSink>>,

    /// Set by the reader task when the socket goes away
    closed: Arc<AtomicBool>,

    request_timeout: Duration,

    reader: JoinHandle<()>,
}

impl CDPClient {
    /// Connect to Chrome DevTools Protocol endpoint
    pub async fn connect(ws_url: &str) -> Result<Arc<Self>> {
        Self::connect_with_timeout(ws_url, DEFAULT_REQUEST_TIMEOUT).await
    }

    pub async fn connect_with_timeout(ws_url: &str, request_timeout: Duration) -> Result<Arc<Self>> {
        let (ws_stream, _) = connect_async(ws_url).await?;
        let (sink, mut stream) = ws_stream.split();

        let pending: Pending = Arc::new(DashMap::new());
        let subscribers: Subscribers = Arc::new(DashMap::new());
        let closed = Arc::new(AtomicBool::new(false));

        let reader = {
            let pending = pending.clone();
            let subscribers = subscribers.clone();
            let closed = closed.clone();
            tokio::spawn(async move {
                while let Some(msg) = stream.next().await {
                    match msg {
                        Ok(Message::Text(text)) => {
                            if let Err(e) = dispatch_message(&pending, &subscribers, &text) {
                                tracing::error!("Failed to handle message: {}", e);
                            }
                        }
                        Ok(Message::Close(_)) => {
                            tracing::info!("WebSocket closed by browser");
                            break;
                        }
                        Err(e) => {
                            tracing::error!("WebSocket error: {}", e);
                            break;
                        }
                        _ => {}
                    }
                }

                closed.store(true, Ordering::SeqCst);
                // Dropping the senders wakes every waiter with `Closed`
                pending.clear();
            })
        };

        Ok(Arc::new(Self {
            next_id: AtomicU64::new(1),
            pending,
            subscribers,
            ws_sink: Arc::new(RwLock::new(sink)),
            closed,
            request_timeout,
            reader,
        }))
    }

    /// Send CDP request and wait for response
    pub async fn send_request(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
        session_id: Option<SessionId>,
    ) -> Result<Value> {
        if self.is_closed() {
            return Err(CDPError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let method = method.into();
        let request = CDPRequest {
            id,
            method: method.clone(),
            params,
            session_id,
        };

        let json = serde_json::to_string(&request)?;
        let rx = self.register(id)?;

        let mut sink = self.ws_sink.write().await;
        if let Err(e) = sink.send(Message::Text(json)).await {
            self.pending.remove(&id);
            return Err(CDPError::WebSocket(e));
        }
        drop(sink);

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(CDPError::Closed),
            Err(_) => {
                self.pending.remove(&id);
                return Err(CDPError::Timeout {
                    method,
                    timeout: self.request_timeout,
                });
            }
        };

        if let Some(error) = response.error {
            return Err(CDPError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Park a waiter for response `id`
    fn register(&self, id: RequestId) -> Result<oneshot::Receiver<CDPResponse>> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        // The reader may have cleared `pending` just before the insert
        if self.is_closed() {
            self.pending.remove(&id);
            return Err(CDPError::Closed);
        }
        Ok(rx)
    }

    /// Subscribe to CDP events
    pub fn subscribe(&self, method: impl Into<String>, callback: EventCallback) {
        self.subscribers
            .entry(method.into())
            .or_insert_with(Vec::new)
            .push(callback);
    }

    /// True once the socket is gone (closed by either side or errored)
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close connection gracefully
    pub async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let result = {
            let mut sink = self.ws_sink.write().await;
            sink.close().await
        };
        self.reader.abort();
        self.pending.clear();
        result.map_err(CDPError::from)
    }
}

impl Drop for CDPClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Route one incoming frame: responses to their waiter, events to subscribers
fn dispatch_message(pending: &Pending, subscribers: &Subscribers, text: &str) -> Result<()> {
    let msg: CDPMessage = serde_json::from_str(text)?;

    match msg {
        CDPMessage::Response(response) => {
            if let Some((_, tx)) = pending.remove(&response.id) {
                let _ = tx.send(response); // Receiver may have timed out
            } else {
                tracing::warn!("Received response for unknown request: {}", response.id);
            }
        }
        CDPMessage::Event(event) => {
            if let Some(callbacks) = subscribers.get(&event.method) {
                for callback in callbacks.value() {
                    callback(event.clone());
                }
            }
        }
    }

    Ok(())
}
