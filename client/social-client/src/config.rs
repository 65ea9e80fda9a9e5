use dotenvy::dotenv;
use reqwest::Url;
use std::env;
use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";
pub const DEFAULT_SESSION_COOKIE: &str = "social_network_session";

/// Chat behaviour switches
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    /// Record outgoing messages as `Pending` before the server echo arrives
    pub optimistic_send: bool,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base, including the `/api/v1` prefix
    pub api_url: String,
    /// Realtime endpoint (`ws://` or `wss://`)
    pub ws_url: String,
    /// Name of the cookie carrying the session token
    pub session_cookie: String,
    pub http_timeout_secs: u64,
    pub chat: ChatConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: "ws://localhost:8080/api/v1/ws".to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            http_timeout_secs: 30,
            chat: ChatConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Build a config for `api_url`, deriving the realtime URL from it
    pub fn for_api(api_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            ws_url: Self::derive_ws_url(api_url)?,
            ..Self::default()
        })
    }

    /// `http://host/api/v1` -> `ws://host/api/v1/ws`
    pub fn derive_ws_url(api_url: &str) -> Result<String, ClientError> {
        let mut url = Url::parse(api_url)
            .map_err(|e| ClientError::Config(format!("SOCIAL_API_URL invalid: {e}")))?;

        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(ClientError::Config(format!(
                    "SOCIAL_API_URL has unsupported scheme {other}"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::Config("cannot derive websocket scheme".into()))?;

        let path = format!("{}/ws", url.path().trim_end_matches('/'));
        url.set_path(&path);
        Ok(url.to_string())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn from_env() -> Result<Self, ClientError> {
        dotenv().ok();

        let api_url = env::var("SOCIAL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        Url::parse(&api_url)
            .map_err(|e| ClientError::Config(format!("SOCIAL_API_URL invalid: {e}")))?;

        let ws_url = match env::var("SOCIAL_WS_URL") {
            Ok(value) => {
                let url = Url::parse(&value)
                    .map_err(|e| ClientError::Config(format!("SOCIAL_WS_URL invalid: {e}")))?;
                if !matches!(url.scheme(), "ws" | "wss") {
                    return Err(ClientError::Config(
                        "SOCIAL_WS_URL must use ws:// or wss://".into(),
                    ));
                }
                value
            }
            Err(_) => Self::derive_ws_url(&api_url)?,
        };

        let session_cookie =
            env::var("SOCIAL_SESSION_COOKIE").unwrap_or_else(|_| DEFAULT_SESSION_COOKIE.into());
        let http_timeout_secs = env::var("SOCIAL_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let optimistic_send = env::var("SOCIAL_OPTIMISTIC_SEND")
            .ok()
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            ws_url,
            session_cookie,
            http_timeout_secs,
            chat: ChatConfig { optimistic_send },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "SOCIAL_API_URL",
            "SOCIAL_WS_URL",
            "SOCIAL_SESSION_COOKIE",
            "SOCIAL_HTTP_TIMEOUT_SECS",
            "SOCIAL_OPTIMISTIC_SEND",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_derive_ws_url() {
        assert_eq!(
            ClientConfig::derive_ws_url("http://localhost:8080/api/v1").unwrap(),
            "ws://localhost:8080/api/v1/ws"
        );
        assert_eq!(
            ClientConfig::derive_ws_url("https://social.example.com/api/v1/").unwrap(),
            "wss://social.example.com/api/v1/ws"
        );
        assert!(matches!(
            ClientConfig::derive_ws_url("ftp://example.com"),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = ClientConfig::from_env().unwrap();

        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.ws_url, "ws://localhost:8080/api/v1/ws");
        assert_eq!(config.session_cookie, "social_network_session");
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert!(!config.chat.optimistic_send);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("SOCIAL_API_URL", "https://social.example.com/api/v1/");
        env::set_var("SOCIAL_HTTP_TIMEOUT_SECS", "5");
        env::set_var("SOCIAL_OPTIMISTIC_SEND", "true");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.api_url, "https://social.example.com/api/v1");
        assert_eq!(config.ws_url, "wss://social.example.com/api/v1/ws");
        assert_eq!(config.http_timeout_secs, 5);
        assert!(config.chat.optimistic_send);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_http_ws_url() {
        clear_env();
        env::set_var("SOCIAL_WS_URL", "http://localhost:8080/ws");

        let result = ClientConfig::from_env();
        assert!(matches!(result, Err(ClientError::Config(_))));

        clear_env();
    }
}
