//! Credentialed HTTP client for the social network REST API
//!
//! Every request carries the cookie jar, so the session cookie set by
//! `/login` is replayed on later calls and can be read back for the
//! realtime handshake.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{Result, ServiceError, STATUS_ONLY_PREFIX};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client bound to one API base URL (e.g. `http://localhost:8080/api/v1`)
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl ApiClient {
    /// Create a new client with the default timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ServiceError::InvalidRequest(format!("invalid base url {}: {}", base_url, e))
        })?;

        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Internal(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            jar,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// GET `path`; `Ok(None)` for an empty or `null` body
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let request = self.client.get(self.endpoint(path));
        self.send(path, request).await
    }

    /// POST `path` with an optional JSON body
    pub async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.endpoint(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(path, request).await
    }

    /// POST `path` without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        self.post::<serde_json::Value, T>(path, None).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.put(self.endpoint(path)).json(body);
        self.send(path, request).await
    }

    /// POST a multipart form (avatar upload)
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<Option<T>> {
        let request = self.client.post(self.endpoint(path)).multipart(form);
        self.send(path, request).await
    }

    /// Read a cookie the backend has set for the API origin
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let header = header.to_str().ok()?;

        header.split(';').map(str::trim).find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<Option<T>> {
        let response = request.send().await.map_err(|e| {
            error!(endpoint = %path, error = %e, "API request failed");
            ServiceError::from(e)
        })?;

        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<Option<T>> {
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        let text = response.text().await.map_err(ServiceError::from)?;

        if !status.is_success() {
            let message = error_message(status, &text);
            if status == StatusCode::UNAUTHORIZED {
                debug!(endpoint = %path, "Suppressing 401 response");
            } else {
                error!(
                    endpoint = %path,
                    status = status.as_u16(),
                    error = %message,
                    "API call failed"
                );
            }
            return Err(ServiceError::from_status(status.as_u16(), message));
        }

        let body = text.trim();
        if body.is_empty() || body == "null" {
            return Ok(None);
        }

        match serde_json::from_str::<T>(body) {
            Ok(value) => Ok(Some(value)),
            Err(e) if is_json => Err(ServiceError::ExternalService(format!(
                "Parse failed: {}",
                e
            ))),
            Err(e) => {
                warn!(endpoint = %path, error = %e, "Failed to parse response as JSON");
                Ok(None)
            }
        }
    }
}

/// Backend error text: the `error` field of a JSON body, else the raw body
fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(serde_json::Value::String(msg)) = map.get("error") {
            return msg.clone();
        }
    }

    if body.is_empty() {
        format!("{} {}", STATUS_ONLY_PREFIX, status.as_u16())
    } else {
        body.to_string()
    }
}
