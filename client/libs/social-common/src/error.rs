//! Unified error handling for the social network client
//!
//! Provides one error type for every REST call made against the backend

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of the message used when an error response has no body
pub const STATUS_ONLY_PREFIX: &str = "HTTP error! status:";

/// Result type alias for REST calls
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Unified error type for backend communication
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "error_type", content = "details")]
pub enum ServiceError {
    /// Authentication failed (401)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization failed (403)
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (e.g., follow request already exists)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Backend unreachable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Response could not be understood
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ServiceError {
    /// Map a non-success HTTP status and its message onto the taxonomy
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => Self::InvalidRequest(message),
            401 => Self::Authentication(message),
            403 => Self::Authorization(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            422 => Self::Validation(message),
            503 => Self::ServiceUnavailable(message),
            504 => Self::Timeout(message),
            500..=599 => Self::Internal(message),
            _ => Self::InvalidRequest(message),
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Authentication(_) => 401,
            Self::Authorization(_) => 403,
            Self::Validation(_) => 422,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
            Self::ServiceUnavailable(_) => 503,
            Self::Timeout(_) => 504,
            Self::ExternalService(_) => 502,
            Self::InvalidRequest(_) => 400,
        }
    }

    /// The backend-provided message, without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Authentication(m)
            | Self::Authorization(m)
            | Self::Validation(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Internal(m)
            | Self::ServiceUnavailable(m)
            | Self::Timeout(m)
            | Self::ExternalService(m)
            | Self::InvalidRequest(m) => m,
        }
    }

    /// 4xx responses: the backend rejected the request itself
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Swap a status-only message (`HTTP error! status: N`) for `fallback`
    pub fn or_message(self, fallback: &str) -> Self {
        let message = self.message();
        if !message.is_empty() && !message.starts_with(STATUS_ONLY_PREFIX) {
            return self;
        }

        let fallback = fallback.to_string();
        match self {
            Self::Authentication(_) => Self::Authentication(fallback),
            Self::Authorization(_) => Self::Authorization(fallback),
            Self::Validation(_) => Self::Validation(fallback),
            Self::NotFound(_) => Self::NotFound(fallback),
            Self::Conflict(_) => Self::Conflict(fallback),
            Self::Internal(_) => Self::Internal(fallback),
            Self::ServiceUnavailable(_) => Self::ServiceUnavailable(fallback),
            Self::Timeout(_) => Self::Timeout(fallback),
            Self::ExternalService(_) => Self::ExternalService(fallback),
            Self::InvalidRequest(_) => Self::InvalidRequest(fallback),
        }
    }

    /// 401 from the backend; expected whenever no session cookie is held
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout(err.to_string())
        } else if err.is_decode() {
            ServiceError::ExternalService(format!("Parse failed: {}", err))
        } else {
            ServiceError::ServiceUnavailable(format!("Request failed: {}", err))
        }
    }
}
