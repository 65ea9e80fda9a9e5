use social_common::{ApiClient, Notification, User};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, CONNECTION_LOST};
use crate::models::{ChatMessage, ConversationKey};
use crate::services::{
    ConversationCache, FollowRequestStore, FollowService, NotificationStore, PostService,
    ProfileService, RequestDirection, SessionStore,
};
use crate::websocket::{frame_types, ConnectionState, FrameSender, HandlerRegistry, RealtimeChannel, SubscriptionId};

/// Realtime connection plus the tasks feeding its frames into the stores
struct RealtimeSession {
    channel: Arc<RealtimeChannel>,
    tasks: Vec<JoinHandle<()>>,
    subscriptions: Vec<(String, SubscriptionId)>,
}

/// Client for one user: REST stores plus the realtime channel of the
/// authenticated session
#[derive(Clone)]
pub struct SocialClient {
    pub config: Arc<ClientConfig>,
    pub api: ApiClient,
    pub session: SessionStore,
    pub chat: ConversationCache,
    pub profiles: ProfileService,
    pub follows: FollowService,
    /// Requests addressed to the viewer
    pub incoming_requests: FollowRequestStore,
    /// Requests the viewer sent
    pub outgoing_requests: FollowRequestStore,
    pub notifications: NotificationStore,
    pub posts: PostService,
    pub registry: HandlerRegistry,
    realtime: Arc<Mutex<Option<RealtimeSession>>>,
}

impl SocialClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let api = ApiClient::with_timeout(&config.api_url, config.http_timeout())?;
        let session = SessionStore::new(api.clone());
        let follows = FollowService::new(api.clone());

        Ok(Self {
            chat: ConversationCache::new(api.clone(), session.clone(), config.chat.clone()),
            profiles: ProfileService::new(api.clone()),
            incoming_requests: FollowRequestStore::new(
                follows.clone(),
                session.clone(),
                RequestDirection::Incoming,
            ),
            outgoing_requests: FollowRequestStore::new(
                follows.clone(),
                session.clone(),
                RequestDirection::Outgoing,
            ),
            notifications: NotificationStore::new(api.clone(), session.clone()),
            posts: PostService::new(api.clone()),
            registry: HandlerRegistry::new(),
            realtime: Arc::new(Mutex::new(None)),
            config: Arc::new(config),
            follows,
            session,
            api,
        })
    }

    /// Restore an existing session and, if there is one, load its data
    pub async fn check_session(&self) -> ClientResult<Option<User>> {
        let user = self.session.check_session().await?;
        if user.is_some() {
            self.refresh_all().await;
        }
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let user = self.session.login(email, password).await?;
        self.refresh_all().await;
        Ok(user)
    }

    /// Close the realtime channel, end the session and drop cached data.
    /// Never fails; the local session is cleared even if the backend call
    /// does not go through.
    pub async fn logout(&self) {
        self.disconnect_realtime().await;
        self.session.logout().await;

        tokio::join!(
            self.chat.reset(),
            self.notifications.clear(),
            self.incoming_requests.clear(),
            self.outgoing_requests.clear(),
        );
    }

    /// Reload everything keyed off the signed-in user
    pub async fn refresh_all(&self) {
        tokio::join!(
            self.chat.load_conversations(),
            self.notifications.refresh(),
            self.incoming_requests.refresh(),
            self.outgoing_requests.refresh(),
        );
    }

    /// Open the realtime channel for the current session.
    ///
    /// Does nothing if one is already open. Requires a signed-in user and
    /// the session cookie; a channel that was lost is not reopened
    /// automatically, only by calling this again.
    pub async fn connect_realtime(&self) -> ClientResult<()> {
        let mut guard = self.realtime.lock().await;
        if let Some(existing) = guard.as_ref() {
            if existing.channel.is_open() {
                debug!("Realtime channel already open");
                return Ok(());
            }
        }
        if let Some(stale) = guard.take() {
            self.shutdown(stale).await;
        }

        if !self.session.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }
        let token = self
            .api
            .cookie(&self.config.session_cookie)
            .ok_or(ClientError::NotAuthenticated)?;

        // Handlers are registered before connecting so no early frame is lost
        let (subscriptions, mut tasks) = self.spawn_routers().await;

        let channel = match RealtimeChannel::connect(
            &self.config.ws_url,
            &token,
            &self.config.session_cookie,
            self.registry.clone(),
        )
        .await
        {
            Ok(channel) => Arc::new(channel),
            Err(e) => {
                self.release(subscriptions, tasks).await;
                self.chat.set_error(CONNECTION_LOST).await;
                return Err(e);
            }
        };

        self.chat.clear_error().await;
        tasks.push(watch_connection(channel.watch_state(), self.chat.clone()));

        *guard = Some(RealtimeSession {
            channel,
            tasks,
            subscriptions,
        });
        Ok(())
    }

    /// Close the realtime channel normally
    pub async fn disconnect_realtime(&self) {
        let session = self.realtime.lock().await.take();
        if let Some(session) = session {
            self.shutdown(session).await;
            info!("Realtime channel disconnected");
        }
    }

    pub async fn realtime_state(&self) -> Option<ConnectionState> {
        self.realtime
            .lock()
            .await
            .as_ref()
            .map(|s| s.channel.state())
    }

    /// Send a chat message over the realtime channel; false when there is
    /// no open connection
    pub async fn send_message(&self, content: &str, key: &ConversationKey) -> bool {
        let channel = self
            .realtime
            .lock()
            .await
            .as_ref()
            .map(|s| s.channel.clone());

        self.chat
            .send_message(channel.as_deref().map(|c| c as &dyn FrameSender), content, key)
            .await
    }

    /// Register an extra handler for a frame type (e.g. `user_list_update`)
    pub async fn subscribe(&self, frame_type: &str) -> (SubscriptionId, UnboundedReceiver<serde_json::Value>) {
        self.registry.subscribe(frame_type).await
    }

    /// Identity transitions
    pub fn watch_session(&self) -> watch::Receiver<Option<User>> {
        self.session.subscribe()
    }

    async fn spawn_routers(&self) -> (Vec<(String, SubscriptionId)>, Vec<JoinHandle<()>>) {
        let mut subscriptions = Vec::new();
        let mut tasks = Vec::new();

        for frame_type in frame_types::CHAT {
            let (id, rx) = self.registry.subscribe(frame_type).await;
            subscriptions.push((frame_type.to_string(), id));
            tasks.push(tokio::spawn(route_chat(rx, self.chat.clone())));
        }

        let (id, rx) = self.registry.subscribe(frame_types::NOTIFICATION).await;
        subscriptions.push((frame_types::NOTIFICATION.to_string(), id));
        tasks.push(tokio::spawn(route_notifications(rx, self.notifications.clone())));

        for frame_type in frame_types::FOLLOW_REQUEST {
            let (id, rx) = self.registry.subscribe(frame_type).await;
            subscriptions.push((frame_type.to_string(), id));
            tasks.push(tokio::spawn(route_follow_updates(
                rx,
                self.incoming_requests.clone(),
                self.outgoing_requests.clone(),
            )));
        }

        (subscriptions, tasks)
    }

    async fn shutdown(&self, session: RealtimeSession) {
        session.channel.close();
        self.release(session.subscriptions, session.tasks).await;
    }

    async fn release(&self, subscriptions: Vec<(String, SubscriptionId)>, tasks: Vec<JoinHandle<()>>) {
        for (frame_type, id) in subscriptions {
            self.registry.unsubscribe(&frame_type, id).await;
        }
        for task in tasks {
            task.abort();
        }
    }
}

async fn route_chat(mut rx: UnboundedReceiver<serde_json::Value>, chat: ConversationCache) {
    while let Some(body) = rx.recv().await {
        match serde_json::from_value::<ChatMessage>(body) {
            Ok(message) => {
                let key = chat.apply_inbound(message).await;
                debug!(key = %key, "Inbound chat message");
            }
            Err(e) => warn!(error = %e, "Dropping malformed chat frame"),
        }
    }
}

async fn route_notifications(mut rx: UnboundedReceiver<serde_json::Value>, store: NotificationStore) {
    while let Some(body) = rx.recv().await {
        match serde_json::from_value::<Notification>(body) {
            Ok(notification) => store.push(notification).await,
            Err(e) => warn!(error = %e, "Dropping malformed notification frame"),
        }
    }
}

async fn route_follow_updates(
    mut rx: UnboundedReceiver<serde_json::Value>,
    incoming: FollowRequestStore,
    outgoing: FollowRequestStore,
) {
    while let Some(body) = rx.recv().await {
        debug!(update = %body, "Follow request update, refreshing");
        tokio::join!(incoming.refresh(), outgoing.refresh());
    }
}

/// Record the connection-lost message once the channel drops abnormally
fn watch_connection(mut state: watch::Receiver<ConnectionState>, chat: ConversationCache) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let current = state.borrow_and_update().clone();
            match current {
                ConnectionState::Closed { abnormal: true, code } => {
                    warn!(?code, "Realtime connection lost");
                    chat.set_error(CONNECTION_LOST).await;
                    break;
                }
                ConnectionState::Closed { .. } => break,
                _ => {}
            }
            if state.changed().await.is_err() {
                break;
            }
        }
    })
}
