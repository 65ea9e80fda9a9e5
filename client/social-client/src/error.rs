use social_common::ServiceError;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Message shown when the realtime connection is gone
pub const CONNECTION_LOST: &str = "Connection lost. Please refresh the page.";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] ServiceError),

    #[error("{0}")]
    InvalidCredentials(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("realtime connection is not open")]
    NotConnected,

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(e.to_string())
    }
}

impl ClientError {
    /// A 401 while probing the session: the user simply is not signed in
    pub fn is_expected_anonymous(&self) -> bool {
        matches!(self, ClientError::Api(e) if e.is_unauthorized())
            || matches!(self, ClientError::NotAuthenticated)
    }

    /// Text suitable for an inline error message
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api(e) => e.message().to_string(),
            ClientError::NotConnected | ClientError::WebSocket(_) => CONNECTION_LOST.to_string(),
            other => other.to_string(),
        }
    }
}
