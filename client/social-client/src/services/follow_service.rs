use serde_json::Value as JsonValue;
use social_common::models::FollowStatusResponse;
use social_common::{ApiClient, FollowRequest, FollowRequestAction, FollowStatus, ServiceError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::ClientResult;
use crate::services::session::SessionStore;

pub const NO_FOLLOW_REQUESTS: &str = "No follow requests found";

/// Backend text when a request to the same user is still pending
const REQUEST_ALREADY_SENT: &str = "Follow request already sent";

/// REST calls on the follow graph
#[derive(Clone)]
pub struct FollowService {
    api: ApiClient,
}

impl FollowService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Follow `user_id`, or ask to when their profile is private.
    ///
    /// Returns the resulting relationship. A duplicate request is reported
    /// as `RequestSent` rather than an error.
    pub async fn follow_user(&self, user_id: &str, target_is_public: bool) -> ClientResult<FollowStatus> {
        match self.api.post_empty::<JsonValue>(&format!("/follow/{user_id}")).await {
            Ok(_) if target_is_public => {
                info!(user_id, "Now following user");
                Ok(FollowStatus::Following)
            }
            Ok(_) => {
                info!(user_id, "Follow request sent");
                Ok(FollowStatus::RequestSent)
            }
            Err(e) if e.message().contains(REQUEST_ALREADY_SENT) => {
                debug!(user_id, "Follow request was already pending");
                Ok(FollowStatus::RequestSent)
            }
            Err(e) => {
                error!(user_id, error = %e, "Follow action failed");
                Err(e.into())
            }
        }
    }

    pub async fn unfollow_user(&self, user_id: &str) -> ClientResult<()> {
        self.api
            .post_empty::<JsonValue>(&format!("/unfollow/{user_id}"))
            .await?;
        info!(user_id, "Unfollowed user");
        Ok(())
    }

    /// Relationship with `user_id`; any failure reads as `NotFollowing`
    pub async fn follow_status(&self, user_id: &str) -> FollowStatus {
        match self
            .api
            .get::<FollowStatusResponse>(&format!("/follow-status/{user_id}"))
            .await
        {
            Ok(Some(response)) => response.status,
            Ok(None) => FollowStatus::NotFollowing,
            Err(e) => {
                warn!(user_id, error = %e, "Error checking follow status");
                FollowStatus::NotFollowing
            }
        }
    }

    /// Pending requests addressed to the viewer
    pub async fn follow_requests(&self) -> ClientResult<Vec<FollowRequest>> {
        Ok(self
            .api
            .get::<Vec<FollowRequest>>("/follow-requests")
            .await?
            .unwrap_or_default())
    }

    /// Pending requests the viewer has sent
    pub async fn my_follow_requests(&self) -> ClientResult<Vec<FollowRequest>> {
        Ok(self
            .api
            .get::<Vec<FollowRequest>>("/my-follow-requests")
            .await?
            .unwrap_or_default())
    }

    pub async fn respond(&self, request_id: &str, action: FollowRequestAction) -> ClientResult<()> {
        let path = format!("/follow-requests/{}/{}", request_id, action.as_str());
        self.api.post_empty::<JsonValue>(&path).await?;
        info!(request_id, action = action.as_str(), "Follow request handled");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDirection {
    /// Requests others sent to the viewer
    Incoming,
    /// Requests the viewer sent
    Outgoing,
}

#[derive(Debug, Default)]
struct RequestState {
    requests: Vec<FollowRequest>,
    error: Option<String>,
}

/// Read-through mirror of one direction of pending follow requests
#[derive(Clone)]
pub struct FollowRequestStore {
    follows: FollowService,
    session: SessionStore,
    direction: RequestDirection,
    state: Arc<RwLock<RequestState>>,
}

impl FollowRequestStore {
    pub fn new(follows: FollowService, session: SessionStore, direction: RequestDirection) -> Self {
        Self {
            follows,
            session,
            direction,
            state: Arc::new(RwLock::new(RequestState::default())),
        }
    }

    pub fn direction(&self) -> RequestDirection {
        self.direction
    }

    /// Reload from the backend. Failures and empty results both leave an
    /// empty list with `NO_FOLLOW_REQUESTS` recorded.
    pub async fn refresh(&self) -> Vec<FollowRequest> {
        if !self.session.is_authenticated() {
            self.clear().await;
            return Vec::new();
        }

        let result = match self.direction {
            RequestDirection::Incoming => self.follows.follow_requests().await,
            RequestDirection::Outgoing => self.follows.my_follow_requests().await,
        };

        let mut state = self.state.write().await;
        match result {
            Ok(requests) => {
                debug!(direction = ?self.direction, count = requests.len(), "Loaded follow requests");
                state.error = requests.is_empty().then(|| NO_FOLLOW_REQUESTS.to_string());
                state.requests = requests;
            }
            Err(e) => {
                error!(direction = ?self.direction, error = %e, "Error fetching follow requests");
                state.error = Some(NO_FOLLOW_REQUESTS.to_string());
                state.requests.clear();
            }
        }
        state.requests.clone()
    }

    /// Accept, decline or cancel `request_id`.
    ///
    /// The request disappears locally first; the list is reloaded after the
    /// backend answers, which restores it if the action failed.
    pub async fn act(&self, request_id: &str, action: FollowRequestAction) -> ClientResult<()> {
        self.state
            .write()
            .await
            .requests
            .retain(|r| r.id != request_id);

        let result = self.follows.respond(request_id, action).await;
        if let Err(e) = &result {
            error!(request_id, action = action.as_str(), error = %e, "Error handling follow request");
        }

        self.refresh().await;
        result
    }

    /// Cancel the viewer's pending request to `user_id`
    pub async fn cancel_to(&self, user_id: &str) -> ClientResult<()> {
        let request = self.find_by_recipient(user_id).await.ok_or_else(|| {
            ServiceError::NotFound("Follow request not found".to_string())
        })?;
        self.act(&request.id, FollowRequestAction::Cancel).await
    }

    pub async fn find_by_recipient(&self, user_id: &str) -> Option<FollowRequest> {
        self.state
            .read()
            .await
            .requests
            .iter()
            .find(|r| r.recipient.id == user_id)
            .cloned()
    }

    pub async fn requests(&self) -> Vec<FollowRequest> {
        self.state.read().await.requests.clone()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn clear(&self) {
        *self.state.write().await = RequestState::default();
    }
}
