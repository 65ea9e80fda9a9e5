//! Session store: the authenticated identity and its transitions
//!
//! Identity lives in a `watch` channel so the rest of the client can key
//! data fetches off the anonymous/authenticated transition.

use serde_json::Value as JsonValue;
use social_common::models::{LoginRequest, RegisterRequest};
use social_common::{ApiClient, User};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";

#[derive(Clone)]
pub struct SessionStore {
    api: ApiClient,
    identity: Arc<watch::Sender<Option<User>>>,
    error: Arc<RwLock<Option<String>>>,
}

impl SessionStore {
    pub fn new(api: ApiClient) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            api,
            identity: Arc::new(identity),
            error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.identity.borrow().clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.identity.borrow().as_ref().map(|u| u.id.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.borrow().is_some()
    }

    /// Identity transitions (login, logout, session expiry)
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.identity.subscribe()
    }

    /// Last error from a session operation, if any
    pub async fn error(&self) -> Option<String> {
        self.error.read().await.clone()
    }

    /// Resolve the current identity from `GET /me`.
    ///
    /// A 401 means "not signed in" and resolves to `Ok(None)` without
    /// recording an error.
    pub async fn check_session(&self) -> ClientResult<Option<User>> {
        self.set_error(None).await;

        match self.api.get::<User>("/me").await {
            Ok(user) => {
                if let Some(user) = &user {
                    debug!(user_id = %user.id, "Session is valid");
                }
                self.set_identity(user.clone());
                Ok(user)
            }
            Err(e) if e.is_unauthorized() => {
                debug!("No active session");
                self.set_identity(None);
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Session check failed");
                self.set_identity(None);
                self.set_error(Some(e.message().to_string())).await;
                Err(e.into())
            }
        }
    }

    /// Exchange credentials for a session cookie and the signed-in user
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        self.set_error(None).await;

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let result = match self.api.post::<_, User>("/login", Some(&request)).await {
            Ok(Some(user)) => Ok(user),
            // Some deployments answer with an empty body; the cookie is set
            Ok(None) => match self.api.get::<User>("/me").await {
                Ok(Some(user)) => Ok(user),
                Ok(None) => Err(ClientError::InvalidCredentials(LOGIN_FAILED.to_string())),
                Err(e) => Err(login_error(e)),
            },
            Err(e) => Err(login_error(e)),
        };

        match result {
            Ok(user) => {
                info!(user_id = %user.id, "Logged in");
                self.set_identity(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.set_error(Some(e.user_message())).await;
                Err(e)
            }
        }
    }

    /// Invalidate the remote session; local identity is cleared regardless
    pub async fn logout(&self) {
        if let Err(e) = self.api.post_empty::<JsonValue>("/logout").await {
            warn!(error = %e, "Logout request failed, clearing local session anyway");
        }

        self.set_identity(None);
        self.set_error(None).await;
        info!("Logged out");
    }

    /// Create an account; does not sign in
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<()> {
        match self
            .api
            .post::<_, JsonValue>("/register", Some(request))
            .await
        {
            Ok(_) => {
                info!(email = %request.email, "Registered account");
                Ok(())
            }
            Err(e) => {
                let e = e.or_message(REGISTRATION_FAILED);
                warn!(error = %e, "Registration failed");
                self.set_error(Some(e.message().to_string())).await;
                Err(e.into())
            }
        }
    }

    fn set_identity(&self, user: Option<User>) {
        self.identity.send_if_modified(|current| {
            if *current == user {
                false
            } else {
                *current = user;
                true
            }
        });
    }

    async fn set_error(&self, error: Option<String>) {
        *self.error.write().await = error;
    }
}

fn login_error(e: social_common::ServiceError) -> ClientError {
    let e = e.or_message(LOGIN_FAILED);
    if e.is_client_error() {
        ClientError::InvalidCredentials(e.message().to_string())
    } else {
        ClientError::Api(e)
    }
}
