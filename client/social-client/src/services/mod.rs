pub mod conversation_cache;
pub mod follow_service;
pub mod notification_store;
pub mod post_service;
pub mod profile_service;
pub mod session;

pub use conversation_cache::ConversationCache;
pub use follow_service::{FollowRequestStore, FollowService, RequestDirection};
pub use notification_store::NotificationStore;
pub use post_service::PostService;
pub use profile_service::ProfileService;
pub use session::SessionStore;
