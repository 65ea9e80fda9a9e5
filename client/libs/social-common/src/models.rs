//! Shared wire models for the social network REST API
//!
//! User-facing resources use camelCase JSON; the post endpoints keep the
//! backend's snake_case field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// USERS & PROFILES
// ============================================================================

/// Authenticated identity returned by `/me` and `/login`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_path: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Compact user record used by search results and follow requests
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl UserSummary {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            nickname: user.nickname.clone(),
            avatar_path: user.avatar_path.clone(),
            is_public: false,
        }
    }
}

/// Full profile as rendered on the profile page
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub about_me: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub followers_count: u32,
    #[serde(default)]
    pub following_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub email: String,
    pub password: String,
    pub date_of_birth: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
}

/// Partial profile update; absent fields are left untouched by the backend
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

/// Generic `{ "message": ... }` acknowledgement
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUploadResponse {
    #[serde(default)]
    pub message: String,
    pub avatar_path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyResponse {
    pub is_public: bool,
}

// ============================================================================
// FOLLOW GRAPH
// ============================================================================

/// Relationship between the viewer and another user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowStatus {
    Following,
    RequestSent,
    NotFollowing,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FollowStatusResponse {
    pub status: FollowStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowRequestStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub id: String,
    pub requester: UserSummary,
    pub recipient: UserSummary,
    #[serde(default = "FollowRequest::default_status")]
    pub status: FollowRequestStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl FollowRequest {
    fn default_status() -> FollowRequestStatus {
        FollowRequestStatus::Pending
    }
}

/// Actions a user can take on a pending follow request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowRequestAction {
    Accept,
    Decline,
    Cancel,
}

impl FollowRequestAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::Cancel => "cancel",
        }
    }
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub notif_type: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// ============================================================================
// POSTS
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostPrivacy {
    #[default]
    Public,
    AlmostPrivate,
    Private,
}

/// Feed entry joined with its author's display fields
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub privacy: PostPrivacy,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author_first_name: String,
    #[serde(default)]
    pub author_last_name: String,
    #[serde(default)]
    pub author_nickname: Option<String>,
    #[serde(default)]
    pub author_avatar_url: Option<String>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub dislike_count: i64,
    #[serde(default)]
    pub current_user_like_type: i32,
}

impl Post {
    pub fn author_name(&self) -> String {
        format!("{} {}", self.author_first_name, self.author_last_name)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub privacy: PostPrivacy,
    /// Only meaningful for `PostPrivacy::Private`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_users: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub dislike_count: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Vote on a post; `Clear` removes an existing vote
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LikeType {
    Like,
    Dislike,
    Clear,
}

impl LikeType {
    pub fn value(&self) -> i32 {
        match self {
            Self::Like => 1,
            Self::Dislike => -1,
            Self::Clear => 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LikeRequest {
    pub like_type: i32,
}

impl From<LikeType> for LikeRequest {
    fn from(like: LikeType) -> Self {
        Self {
            like_type: like.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_deserializes_camel_case() {
        let user: User = serde_json::from_value(json!({
            "id": "u-1",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com"
        }))
        .unwrap();

        assert_eq!(user.display_name(), "Ada Lovelace");
        assert!(user.nickname.is_none());
        assert!(user.avatar_path.is_none());
    }

    #[test]
    fn test_follow_status_wire_names() {
        let resp: FollowStatusResponse =
            serde_json::from_value(json!({ "status": "request_sent" })).unwrap();
        assert_eq!(resp.status, FollowStatus::RequestSent);
        assert_eq!(
            serde_json::to_value(FollowStatus::NotFollowing).unwrap(),
            json!("not_following")
        );
    }

    #[test]
    fn test_follow_request_defaults_to_pending() {
        let req: FollowRequest = serde_json::from_value(json!({
            "id": "fr-1",
            "requester": { "id": "u-1", "firstName": "A", "lastName": "B" },
            "recipient": { "id": "u-2" }
        }))
        .unwrap();
        assert_eq!(req.status, FollowRequestStatus::Pending);
        assert_eq!(req.recipient.id, "u-2");
    }

    #[test]
    fn test_update_profile_skips_absent_fields() {
        let body = serde_json::to_value(UpdateProfileRequest {
            about_me: Some("hello".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(body, json!({ "aboutMe": "hello" }));
    }

    #[test]
    fn test_post_privacy_snake_case() {
        let body = serde_json::to_value(CreatePostRequest {
            content: "hi".into(),
            privacy: PostPrivacy::AlmostPrivate,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(body, json!({ "content": "hi", "privacy": "almost_private" }));
    }

    #[test]
    fn test_like_request_values() {
        assert_eq!(LikeRequest::from(LikeType::Dislike).like_type, -1);
        assert_eq!(LikeRequest::from(LikeType::Clear).like_type, 0);
    }
}
