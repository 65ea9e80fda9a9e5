use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// `type` discriminators seen on the realtime channel
pub mod frame_types {
    /// Outbound chat frame, also echoed back by some backends
    pub const MESSAGE: &str = "message";
    pub const PRIVATE_MESSAGE: &str = "private_message";
    pub const GROUP_MESSAGE: &str = "group_message";
    pub const NOTIFICATION: &str = "notification";
    pub const FOLLOW_REQUEST_UPDATE: &str = "follow_request_update";
    /// Older camelCase spelling still emitted by some deployments
    pub const FOLLOW_REQUEST_UPDATE_LEGACY: &str = "followRequestUpdate";
    pub const USER_LIST_UPDATE: &str = "user_list_update";

    pub const CHAT: [&str; 3] = [MESSAGE, PRIVATE_MESSAGE, GROUP_MESSAGE];
    pub const FOLLOW_REQUEST: [&str; 2] = [FOLLOW_REQUEST_UPDATE, FOLLOW_REQUEST_UPDATE_LEGACY];
}

/// Inbound frame from server to client.
///
/// Push events carry their body under `payload`; chat frames from the hub
/// are flat objects, in which case the whole object is the body.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(default)]
    pub payload: Option<JsonValue>,
    #[serde(flatten)]
    pub rest: Map<String, JsonValue>,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Body handed to handlers registered for `frame_type`
    pub fn into_body(self) -> JsonValue {
        match self.payload {
            Some(payload) => payload,
            None => {
                let mut data = self.rest;
                data.insert("type".to_string(), JsonValue::String(self.frame_type));
                JsonValue::Object(data)
            }
        }
    }
}

/// Outbound chat frame from client to server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundChatFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub content: String,
    pub recipient_id: Option<String>,
    pub group_id: Option<String>,
    pub sender_id: String,
    pub created_at: DateTime<Utc>,
}

impl OutboundChatFrame {
    pub fn new(
        content: &str,
        recipient_id: Option<String>,
        group_id: Option<String>,
        sender_id: &str,
    ) -> Self {
        Self {
            frame_type: frame_types::MESSAGE.to_string(),
            content: content.to_string(),
            recipient_id,
            group_id,
            sender_id: sender_id.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
