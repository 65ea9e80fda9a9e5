//! Social Network Common Library
//!
//! Shared wire models, the unified error type, and the credentialed REST
//! client used by the social network client SDK.

pub mod error;
pub mod http_client;
pub mod models;

pub use error::{Result, ServiceError};
pub use http_client::ApiClient;

pub use models::{
    FollowRequest, FollowRequestAction, FollowStatus, Notification, Post, Profile, User,
    UserSummary,
};
