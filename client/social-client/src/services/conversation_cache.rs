//! Conversation cache
//!
//! In-memory mirror of the viewer's conversations and their message lists,
//! keyed by [`ConversationKey`]. History is fetched over REST; new messages
//! arrive through the realtime channel and are appended as they come. No
//! ordering, deduplication or retry is attempted.

use serde::Deserialize;
use social_common::{ApiClient, UserSummary};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::ChatConfig;
use crate::error::CONNECTION_LOST;
use crate::models::{ChatMessage, Conversation, ConversationKey, DeliveryState};
use crate::services::session::SessionStore;
use crate::websocket::{FrameSender, OutboundChatFrame};

pub const FAILED_TO_LOAD_CONVERSATIONS: &str = "Failed to load conversations";
pub const FAILED_TO_LOAD_MESSAGES: &str = "Failed to load messages";
pub const FAILED_TO_SEND_MESSAGE: &str = "Failed to send message";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanMessageResponse {
    #[serde(default)]
    can_message: bool,
}

/// Cache contents. Every mutation happens under one write lock.
#[derive(Debug, Default)]
struct ChatState {
    // key -> summary, with `order` preserving list position
    conversations: HashMap<ConversationKey, Conversation>,
    order: Vec<ConversationKey>,
    messages: HashMap<ConversationKey, Vec<ChatMessage>>,
    active: Option<ConversationKey>,
    error: Option<String>,
}

impl ChatState {
    fn replace_conversations(&mut self, list: Vec<Conversation>) {
        self.conversations.clear();
        self.order.clear();
        for conversation in list {
            let key = conversation.key();
            if self.conversations.insert(key.clone(), conversation).is_none() {
                self.order.push(key);
            }
        }
    }

    fn conversation_list(&self) -> Vec<Conversation> {
        self.order
            .iter()
            .filter_map(|key| self.conversations.get(key).cloned())
            .collect()
    }

    fn push_front(&mut self, conversation: Conversation) {
        let key = conversation.key();
        self.order.insert(0, key.clone());
        self.conversations.insert(key, conversation);
    }

    /// File `message` under its key and refresh the matching summary.
    ///
    /// With `promote_pending`, an echo of one of our own pending sends
    /// confirms the oldest matching entry instead of appending.
    fn append(
        &mut self,
        message: ChatMessage,
        viewer_id: &str,
        promote_pending: bool,
    ) -> ConversationKey {
        let key = ConversationKey::for_message(&message, viewer_id);
        let preview = message.content.clone();
        let time = message.created_at.to_rfc3339();

        let list = self.messages.entry(key.clone()).or_default();
        let pending = if promote_pending {
            list.iter_mut().find(|m| {
                m.is_pending() && m.sender_id == message.sender_id && m.content == message.content
            })
        } else {
            None
        };

        match pending {
            Some(entry) => {
                entry.id = message.id;
                entry.created_at = message.created_at;
                entry.delivery = DeliveryState::Confirmed;
            }
            None => list.push(message),
        }

        match self.conversations.get_mut(&key) {
            Some(conversation) => {
                conversation.last_message = preview;
                conversation.last_message_time = time;
                conversation.unread_count += 1;
            }
            None => debug!(key = %key, "Message for a conversation not in the list"),
        }

        key
    }
}

#[derive(Clone)]
pub struct ConversationCache {
    api: ApiClient,
    session: SessionStore,
    config: ChatConfig,
    state: Arc<RwLock<ChatState>>,
}

impl ConversationCache {
    pub fn new(api: ApiClient, session: SessionStore, config: ChatConfig) -> Self {
        Self {
            api,
            session,
            config,
            state: Arc::new(RwLock::new(ChatState::default())),
        }
    }

    /// Replace the conversation list from `GET /conversations`.
    ///
    /// Does nothing without a session. On failure the list is emptied and
    /// the error recorded; nothing is returned as `Err`.
    pub async fn load_conversations(&self) -> Vec<Conversation> {
        if !self.session.is_authenticated() {
            debug!("Skipping conversation load: not authenticated");
            return self.conversations().await;
        }

        self.clear_error().await;
        let result = self.api.get::<Vec<Conversation>>("/conversations").await;

        let mut state = self.state.write().await;
        match result {
            Ok(list) => {
                let list = list.unwrap_or_default();
                info!(count = list.len(), "Loaded conversations");
                state.replace_conversations(list);
            }
            Err(e) => {
                error!(error = %e, "Error loading conversations");
                state.replace_conversations(Vec::new());
                state.error = Some(FAILED_TO_LOAD_CONVERSATIONS.to_string());
            }
        }
        state.conversation_list()
    }

    /// Replace the message list for `key` with the backend's history.
    ///
    /// Repeated calls overwrite; when calls race, whichever resolves last
    /// wins. A failure leaves the current list in place.
    pub async fn load_messages(&self, key: &ConversationKey) -> Vec<ChatMessage> {
        if key.id().is_empty() {
            return Vec::new();
        }

        self.clear_error().await;
        let path = match key {
            ConversationKey::Private(user_id) => format!("/messages/private/{user_id}"),
            ConversationKey::Group(group_id) => format!("/messages/group/{group_id}"),
        };
        let result = self.api.get::<Vec<ChatMessage>>(&path).await;

        let mut state = self.state.write().await;
        match result {
            Ok(list) => {
                let list = list.unwrap_or_default();
                debug!(key = %key, count = list.len(), "Loaded messages");
                state.messages.insert(key.clone(), list.clone());
                list
            }
            Err(e) => {
                error!(key = %key, error = %e, "Error loading messages");
                state.error = Some(FAILED_TO_LOAD_MESSAGES.to_string());
                state.messages.get(key).cloned().unwrap_or_default()
            }
        }
    }

    /// Write a chat frame for `key` to the realtime channel.
    ///
    /// Returns false, with nothing written, when there is no open channel.
    pub async fn send_message(
        &self,
        channel: Option<&dyn FrameSender>,
        content: &str,
        key: &ConversationKey,
    ) -> bool {
        let channel = match channel {
            Some(channel) if channel.is_open() => channel,
            _ => {
                warn!(key = %key, "Cannot send message: realtime connection is not open");
                self.set_error(CONNECTION_LOST).await;
                return false;
            }
        };
        let Some(sender_id) = self.session.user_id() else {
            warn!("Cannot send message: not authenticated");
            return false;
        };

        let (recipient_id, group_id) = match key {
            ConversationKey::Private(id) => (Some(id.clone()), None),
            ConversationKey::Group(id) => (None, Some(id.clone())),
        };
        let frame = OutboundChatFrame::new(content, recipient_id, group_id, &sender_id);

        let text = match frame.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Error serializing chat frame");
                self.set_error(FAILED_TO_SEND_MESSAGE).await;
                return false;
            }
        };
        // The pending copy must exist before the frame can be echoed back
        let pending_id = if self.config.optimistic_send {
            let pending = ChatMessage::pending(
                &sender_id,
                frame.recipient_id,
                frame.group_id,
                content,
                frame.created_at,
            );
            let local_id = pending.local_id;
            let mut state = self.state.write().await;
            state.messages.entry(key.clone()).or_default().push(pending);
            Some(local_id)
        } else {
            None
        };

        if !channel.send_text(text) {
            error!(key = %key, "Error sending message");
            let mut state = self.state.write().await;
            if let (Some(local_id), Some(list)) = (pending_id, state.messages.get_mut(key)) {
                list.retain(|m| m.local_id != local_id);
            }
            state.error = Some(FAILED_TO_SEND_MESSAGE.to_string());
            return false;
        }

        true
    }

    /// Select the private conversation with `user`, creating a local
    /// placeholder at the top of the list when none exists yet.
    pub async fn start_conversation(&self, user: &UserSummary) -> Conversation {
        let key = ConversationKey::private(user.id.clone());
        let mut state = self.state.write().await;

        let conversation = match state.conversations.get(&key) {
            Some(existing) => existing.clone(),
            None => {
                let placeholder = Conversation::placeholder(user);
                state.push_front(placeholder.clone());
                placeholder
            }
        };
        state.active = Some(key);
        conversation
    }

    /// File a message pushed by the realtime channel
    pub async fn apply_inbound(&self, message: ChatMessage) -> ConversationKey {
        let viewer_id = self.session.user_id().unwrap_or_default();
        let mut state = self.state.write().await;
        state.append(message, &viewer_id, self.config.optimistic_send)
    }

    /// Users matching `query`; empty on a blank query or any failure
    pub async fn search_users(&self, query: &str) -> Vec<UserSummary> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let path = format!("/users/search?q={}", urlencoding::encode(query));
        match self.api.get::<Vec<UserSummary>>(&path).await {
            Ok(users) => users.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Error searching users");
                Vec::new()
            }
        }
    }

    pub async fn can_message(&self, user_id: &str) -> bool {
        let path = format!("/can-message/{user_id}");
        match self.api.get::<CanMessageResponse>(&path).await {
            Ok(response) => response.map(|r| r.can_message).unwrap_or(false),
            Err(e) => {
                warn!(user_id, error = %e, "Error checking message permissions");
                false
            }
        }
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.read().await.conversation_list()
    }

    pub async fn conversation(&self, key: &ConversationKey) -> Option<Conversation> {
        self.state.read().await.conversations.get(key).cloned()
    }

    pub async fn messages(&self, key: &ConversationKey) -> Vec<ChatMessage> {
        self.state
            .read()
            .await
            .messages
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn active(&self) -> Option<Conversation> {
        let state = self.state.read().await;
        let key = state.active.as_ref()?;
        state.conversations.get(key).cloned()
    }

    pub async fn set_active(&self, key: Option<ConversationKey>) {
        self.state.write().await.active = key;
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn set_error(&self, message: &str) {
        self.state.write().await.error = Some(message.to_string());
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    /// Drop everything (logout)
    pub async fn reset(&self) {
        *self.state.write().await = ChatState::default();
    }
}
