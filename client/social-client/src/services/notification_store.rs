use serde_json::Value as JsonValue;
use social_common::{ApiClient, Notification};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::error::ClientResult;
use crate::services::session::SessionStore;

pub const FAILED_TO_LOAD_NOTIFICATIONS: &str = "Failed to load notifications";

#[derive(Debug, Default)]
struct NotificationState {
    // newest first
    notifications: Vec<Notification>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct NotificationStore {
    api: ApiClient,
    session: SessionStore,
    state: Arc<RwLock<NotificationState>>,
}

impl NotificationStore {
    pub fn new(api: ApiClient, session: SessionStore) -> Self {
        Self {
            api,
            session,
            state: Arc::new(RwLock::new(NotificationState::default())),
        }
    }

    /// Reload from `GET /notifications`; failure leaves an empty list
    pub async fn refresh(&self) -> Vec<Notification> {
        if !self.session.is_authenticated() {
            self.clear().await;
            return Vec::new();
        }

        let result = self.api.get::<Vec<Notification>>("/notifications").await;

        let mut state = self.state.write().await;
        match result {
            Ok(list) => {
                state.notifications = list.unwrap_or_default();
                state.error = None;
            }
            Err(e) => {
                error!(error = %e, "Error fetching notifications");
                state.notifications.clear();
                state.error = Some(FAILED_TO_LOAD_NOTIFICATIONS.to_string());
            }
        }
        state.notifications.clone()
    }

    /// Mark read remotely, then locally
    pub async fn mark_as_read(&self, notification_id: &str) -> ClientResult<()> {
        let path = format!("/notifications/{notification_id}/read");
        if let Err(e) = self.api.post_empty::<JsonValue>(&path).await {
            error!(notification_id, error = %e, "Error marking notification as read");
            return Err(e.into());
        }

        let mut state = self.state.write().await;
        for notification in state
            .notifications
            .iter_mut()
            .filter(|n| n.id == notification_id)
        {
            notification.read = true;
        }
        Ok(())
    }

    /// Prepend a notification pushed over the realtime channel
    pub async fn push(&self, notification: Notification) {
        debug!(id = %notification.id, notif_type = %notification.notif_type, "Received notification");
        self.state.write().await.notifications.insert(0, notification);
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.read().await.notifications.clone()
    }

    pub async fn unread_count(&self) -> usize {
        self.state
            .read()
            .await
            .notifications
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn clear(&self) {
        *self.state.write().await = NotificationState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(id: &str, read: bool) -> Notification {
        Notification {
            id: id.to_string(),
            message: format!("notification {id}"),
            actor_id: None,
            notif_type: "follow_request".to_string(),
            read,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_push_prepends_and_counts_unread() {
        let api = ApiClient::new("http://localhost:8080/api/v1").unwrap();
        let store = NotificationStore::new(api.clone(), SessionStore::new(api));

        store.push(notification("n-1", true)).await;
        store.push(notification("n-2", false)).await;

        let list = store.notifications().await;
        assert_eq!(list[0].id, "n-2");
        assert_eq!(store.unread_count().await, 1);
    }

    #[tokio::test]
    async fn test_refresh_without_session_clears() {
        let api = ApiClient::new("http://localhost:8080/api/v1").unwrap();
        let store = NotificationStore::new(api.clone(), SessionStore::new(api));
        store.push(notification("n-1", false)).await;

        assert!(store.refresh().await.is_empty());
        assert!(store.notifications().await.is_empty());
    }
}
