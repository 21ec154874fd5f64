//! CDP Protocol Types
//!
//! Only the envelope types plus the handful of payloads the driver reads.
//! Everything else stays as `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request ID - monotonically increasing
pub type RequestId = u64;

/// Target ID from Chrome
pub type TargetId = String;

/// Session ID for attached targets
pub type SessionId = String;

/// CDP Request sent to browser
#[derive(Debug, Clone, Serialize)]
pub struct CDPRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// CDP Response from browser
#[derive(Debug, Clone, Deserialize)]
pub struct CDPResponse {
    pub id: RequestId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ProtocolError>,
}

/// Error object carried by a failed response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProtocolError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// CDP Event from browser (no request ID)
#[derive(Debug, Clone, Deserialize)]
pub struct CDPEvent {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

/// Anything the browser can send us: a response (has `id`) or an event
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CDPMessage {
    Response(CDPResponse),
    Event(CDPEvent),
}

/// Target Info from Target.getTargets / Target.getTargetInfo
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetInfo {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub attached: bool,
}

/// Result of Target.getTargets
#[derive(Debug, Clone, Deserialize)]
pub struct GetTargetsResult {
    #[serde(rename = "targetInfos")]
    pub target_infos: Vec<TargetInfo>,
}

/// Result of Target.attachToTarget
#[derive(Debug, Clone, Deserialize)]
pub struct AttachToTargetResult {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_dispatch_by_shape() {
        let response: CDPMessage =
            serde_json::from_value(json!({ "id": 7, "result": { "frameId": "F" } })).unwrap();
        assert!(matches!(response, CDPMessage::Response(ref r) if r.id == 7));

        let event: CDPMessage = serde_json::from_value(json!({
            "method": "Page.loadEventFired",
            "params": { "timestamp": 1.0 },
            "sessionId": "S1"
        }))
        .unwrap();
        match event {
            CDPMessage::Event(ev) => {
                assert_eq!(ev.method, "Page.loadEventFired");
                assert_eq!(ev.session_id.as_deref(), Some("S1"));
            }
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_error_response() {
        let msg: CDPMessage = serde_json::from_value(json!({
            "id": 3,
            "error": { "code": -32000, "message": "Cannot navigate to invalid URL" }
        }))
        .unwrap();
        let CDPMessage::Response(response) = msg else {
            panic!("expected response");
        };
        let error = response.error.unwrap();
        assert_eq!(error.code, -32000);
        assert!(response.result.is_none());
    }

    #[test]
    fn test_request_omits_empty_fields() {
        let request = CDPRequest {
            id: 1,
            method: "Fetch.disable".to_string(),
            params: None,
            session_id: None,
        };
        let text = serde_json::to_string(&request).unwrap();
        assert_eq!(text, r#"{"id":1,"method":"Fetch.disable"}"#);
    }
}
