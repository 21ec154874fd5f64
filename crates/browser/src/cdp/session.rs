//! CDP Session - Represents a connection to a specific browser target
//!
//! Design: Lightweight wrapper around CDPClient with target-specific context.
//! All sessions share the same WebSocket - no per-session connection overhead.

use super::client::{CDPClient, Result};
use super::protocol::{AttachToTargetResult, GetTargetsResult, SessionId, TargetId};
use serde_json::{json, Value};
use std::sync::Arc;

/// Domains the kiosk needs events from
pub const DEFAULT_DOMAINS: &[&str] = &["Page", "Network", "Inspector"];

/// CDP Session bound to a specific target
#[derive(Clone)]
pub struct CDPSession {
    /// Shared CDP client
    client: Arc<CDPClient>,

    /// Target this session is attached to
    pub target_id: TargetId,

    /// Session ID assigned by Chrome
    pub session_id: SessionId,
}

impl CDPSession {
    /// Attach to a target and create session
    pub async fn attach(
        client: Arc<CDPClient>,
        target_id: TargetId,
        domains: Option<&[&str]>,
    ) -> Result<Self> {
        let result = client
            .send_request(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true,
                })),
                None,
            )
            .await?;

        let attach_result: AttachToTargetResult = serde_json::from_value(result)?;
        let session_id = attach_result.session_id;

        let domains = domains.unwrap_or(DEFAULT_DOMAINS);

        // Enable all domains in parallel
        let enable_futures: Vec<_> = domains
            .iter()
            .map(|domain| {
                let client = client.clone();
                let session_id = session_id.clone();
                async move {
                    client
                        .send_request(format!("{}.enable", domain), None, Some(session_id))
                        .await
                }
            })
            .collect();

        // A missing domain only costs us some events, not the session
        let results = futures_util::future::join_all(enable_futures).await;
        let failures = results.iter().filter(|r| r.is_err()).count();
        if failures > 0 {
            tracing::warn!("Some domain enables failed: {}/{}", failures, results.len());
        }

        Ok(Self {
            client,
            target_id,
            session_id,
        })
    }

    /// Attach to the first page target, opening one on about:blank if the
    /// browser has none yet
    pub async fn attach_first_page(client: Arc<CDPClient>) -> Result<Self> {
        let result = client.send_request("Target.getTargets", None, None).await?;
        let targets: GetTargetsResult = serde_json::from_value(result)?;

        let target_id = match targets
            .target_infos
            .into_iter()
            .find(|t| t.target_type == "page")
        {
            Some(page) => page.target_id,
            None => {
                let created = client
                    .send_request(
                        "Target.createTarget",
                        Some(json!({ "url": "about:blank" })),
                        None,
                    )
                    .await?;
                created["targetId"].as_str().unwrap_or_default().to_string()
            }
        };

        tracing::debug!("Attaching to page target {}", target_id);
        Self::attach(client, target_id, None).await
    }

    /// Send command within this session's context
    pub async fn send(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value> {
        self.client
            .send_request(method, params, Some(self.session_id.clone()))
            .await
    }
}
