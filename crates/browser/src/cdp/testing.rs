//! Scripted CDP endpoint for tests
//!
//! Accepts one WebSocket connection and answers each request according to a
//! script keyed on the method name.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// What the endpoint does with one request
pub(crate) enum Reply {
    Result(Value),
    Error(i32, &'static str),
    /// Swallow the request
    Silent,
    /// Close the socket instead of answering
    Close,
}

pub(crate) struct ScriptedEndpoint {
    pub url: String,
    received: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEndpoint {
    /// Methods received so far, in arrival order
    pub fn received(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub(crate) async fn serve<F>(script: F) -> ScriptedEndpoint
where
    F: Fn(&str) -> Reply + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let received = Arc::new(Mutex::new(Vec::new()));

    let log = received.clone();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            let request: Value = serde_json::from_str(&text).unwrap();
            let method = request["method"].as_str().unwrap_or_default().to_string();
            let id = request["id"].clone();
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(method.clone());

            let reply = match script(&method) {
                Reply::Result(result) => json!({ "id": id, "result": result }),
                Reply::Error(code, message) => {
                    json!({ "id": id, "error": { "code": code, "message": message } })
                }
                Reply::Silent => continue,
                Reply::Close => {
                    let _ = ws.close(None).await;
                    break;
                }
            };
            if ws.send(Message::Text(reply.to_string())).await.is_err() {
                break;
            }
        }
    });

    ScriptedEndpoint { url, received }
}
