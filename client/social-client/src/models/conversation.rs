use serde::{Deserialize, Serialize};
use social_common::UserSummary;
use std::fmt;
use std::str::FromStr;

use super::message::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Private,
    Group,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
        }
    }
}

/// Identity of a conversation: the counterpart user or the group.
///
/// Renders as `private_<userId>` / `group_<groupId>`; the kind prefix keeps
/// the two id spaces apart even when a user and a group share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversationKey {
    Private(String),
    Group(String),
}

impl ConversationKey {
    pub fn private(user_id: impl Into<String>) -> Self {
        Self::Private(user_id.into())
    }

    pub fn group(group_id: impl Into<String>) -> Self {
        Self::Group(group_id.into())
    }

    /// Key a message is filed under, from the point of view of `viewer_id`.
    ///
    /// Group messages go to the group; private messages go to the other
    /// party, which is the recipient when the viewer sent the message.
    pub fn for_message(message: &ChatMessage, viewer_id: &str) -> Self {
        if let Some(group_id) = &message.group_id {
            return Self::Group(group_id.clone());
        }

        let counterpart = if message.sender_id == viewer_id {
            message.recipient_id.clone().unwrap_or_default()
        } else {
            message.sender_id.clone()
        };
        Self::Private(counterpart)
    }

    pub fn kind(&self) -> ConversationKind {
        match self {
            Self::Private(_) => ConversationKind::Private,
            Self::Group(_) => ConversationKind::Group,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Private(id) | Self::Group(id) => id,
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind().as_str(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseConversationKeyError(pub String);

impl fmt::Display for ParseConversationKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid conversation key: {}", self.0)
    }
}

impl std::error::Error for ParseConversationKeyError {}

impl FromStr for ConversationKey {
    type Err = ParseConversationKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix("private_") {
            Ok(Self::Private(id.to_string()))
        } else if let Some(id) = s.strip_prefix("group_") {
            Ok(Self::Group(id.to_string()))
        } else {
            Err(ParseConversationKeyError(s.to_string()))
        }
    }
}

/// Conversation summary shown in the conversation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(rename = "type")]
    pub kind: ConversationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub last_message: String,
    #[serde(default)]
    pub last_message_time: String,
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    pub fn key(&self) -> ConversationKey {
        match self.kind {
            ConversationKind::Private => {
                ConversationKey::Private(self.user_id.clone().unwrap_or_default())
            }
            ConversationKind::Group => {
                ConversationKey::Group(self.group_id.clone().unwrap_or_default())
            }
        }
    }

    /// Local-only private conversation with zeroed metadata
    pub fn placeholder(user: &UserSummary) -> Self {
        Self {
            kind: ConversationKind::Private,
            user_id: Some(user.id.clone()),
            group_id: None,
            name: user.display_name(),
            avatar_path: user.avatar_path.clone(),
            last_message: String::new(),
            last_message_time: String::new(),
            unread_count: 0,
        }
    }
}
