pub mod conversation;
pub mod message;

pub use conversation::{Conversation, ConversationKey, ConversationKind, ParseConversationKeyError};
pub use message::{ChatMessage, DeliveryState};
