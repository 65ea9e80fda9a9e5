use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Local delivery lifecycle of a cached message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryState {
    /// Written to the socket, no server echo yet
    Pending,
    /// Loaded from history or received over the realtime channel
    #[default]
    Confirmed,
}

/// Chat message as exchanged with the backend (history and realtime echo)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, deserialize_with = "opt_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "id")]
    pub sender_id: String,
    #[serde(default, deserialize_with = "opt_id", skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    #[serde(default, deserialize_with = "opt_id", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub content: String,
    /// The hub stamps pushes with `timestamp`; history rows use `createdAt`
    #[serde(alias = "timestamp", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(skip, default = "Uuid::new_v4")]
    pub local_id: Uuid,
    #[serde(skip)]
    pub delivery: DeliveryState,
}

impl ChatMessage {
    /// Optimistic local copy of an outgoing message
    pub fn pending(
        sender_id: &str,
        recipient_id: Option<String>,
        group_id: Option<String>,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            sender_id: sender_id.to_string(),
            recipient_id,
            group_id,
            content: content.to_string(),
            created_at,
            local_id: Uuid::new_v4(),
            delivery: DeliveryState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.delivery == DeliveryState::Pending
    }
}

/// Ids arrive as strings from the Go backend but as numbers from some
/// fixtures; both are normalised to `String`.
fn id_from_value(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = JsonValue::deserialize(deserializer)?;
    id_from_value(value).ok_or_else(|| serde::de::Error::custom("expected a string or numeric id"))
}

fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.and_then(id_from_value))
}
