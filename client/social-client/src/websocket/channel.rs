//! Realtime channel: one WebSocket connection per authenticated session
//!
//! The channel owns a reader task that demultiplexes inbound frames into a
//! [`HandlerRegistry`] and a writer task fed by an unbounded queue. Sends are
//! fire-and-forget; nothing reconnects after a close.

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::COOKIE, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::message_types::InboundFrame;
use super::HandlerRegistry;
use crate::error::{ClientError, ClientResult};

/// Close code for a normal, user-initiated close
const NORMAL_CLOSURE: u16 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    /// `abnormal` is set for any close other than code 1000, including
    /// transport errors and streams that end without a close frame
    Closed { code: Option<u16>, abnormal: bool },
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    pub fn is_lost(&self) -> bool {
        matches!(self, ConnectionState::Closed { abnormal: true, .. })
    }
}

/// Anything that can carry an outbound text frame
pub trait FrameSender: Send + Sync {
    fn is_open(&self) -> bool;

    /// Queue a frame; false when the connection is not open
    fn send_text(&self, text: String) -> bool;
}

pub struct RealtimeChannel {
    outbound: UnboundedSender<Message>,
    state: Arc<watch::Sender<ConnectionState>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl RealtimeChannel {
    /// Open the connection, authenticating with the session token both as
    /// a `token` query parameter and as the session cookie.
    pub async fn connect(
        ws_url: &str,
        session_token: &str,
        cookie_name: &str,
        registry: HandlerRegistry,
    ) -> ClientResult<Self> {
        let mut url = Url::parse(ws_url)
            .map_err(|e| ClientError::Config(format!("invalid websocket url {ws_url}: {e}")))?;
        url.query_pairs_mut().append_pair("token", session_token);

        let mut request = url.as_str().into_client_request()?;
        let cookie = HeaderValue::from_str(&format!("{cookie_name}={session_token}"))
            .map_err(|e| ClientError::WebSocket(format!("invalid session token: {e}")))?;
        request.headers_mut().insert(COOKIE, cookie);

        let state = Arc::new(watch::channel(ConnectionState::Connecting).0);

        info!(url = %ws_url, "Connecting realtime channel");
        let (stream, _response) = connect_async(request).await.map_err(|e| {
            error!(error = %e, "Realtime connection failed");
            ClientError::from(e)
        })?;
        state.send_replace(ConnectionState::Open);
        info!("Realtime channel connected");

        let (mut sink, mut source) = stream.split();
        let (outbound, mut outbound_rx) = unbounded_channel::<Message>();

        let writer_state = state.clone();
        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    warn!(error = %e, "Realtime write failed");
                    mark_closed(&writer_state, None, true);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader_state = state.clone();
        let reader = tokio::spawn(async move {
            while let Some(next) = source.next().await {
                match next {
                    Ok(Message::Text(text)) => route_frame(&registry, text.as_str()).await,
                    Ok(Message::Close(frame)) => {
                        let code = frame.as_ref().map(|f| u16::from(f.code));
                        let abnormal = code != Some(NORMAL_CLOSURE);
                        if abnormal {
                            warn!(?code, "Realtime channel closed abnormally");
                        } else {
                            info!("Realtime channel closed");
                        }
                        mark_closed(&reader_state, code, abnormal);
                        break;
                    }
                    Ok(Message::Binary(_)) => debug!("Ignoring binary realtime frame"),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Realtime channel error");
                        mark_closed(&reader_state, None, true);
                        break;
                    }
                }
            }
            mark_closed(&reader_state, None, true);
        });

        Ok(Self {
            outbound,
            state,
            reader,
            writer,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Observe state transitions (open -> closed)
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Serialize and queue a frame
    pub fn send_json<T: serde::Serialize>(&self, frame: &T) -> ClientResult<()> {
        let text = serde_json::to_string(frame)?;
        if self.send_text(text) {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    /// Normal close (code 1000); the state flips to closed immediately
    pub fn close(&self) {
        if !self.is_open() {
            return;
        }
        mark_closed(&self.state, Some(NORMAL_CLOSURE), false);
        let _ = self.outbound.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        })));
    }
}

impl FrameSender for RealtimeChannel {
    fn is_open(&self) -> bool {
        self.state.borrow().is_open()
    }

    fn send_text(&self, text: String) -> bool {
        if !self.is_open() {
            return false;
        }
        self.outbound.send(Message::text(text)).is_ok()
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.close();
        self.reader.abort();
        if self.writer.is_finished() {
            debug!("Realtime writer already stopped");
        }
    }
}

/// First close wins; later transitions are ignored
fn mark_closed(state: &watch::Sender<ConnectionState>, code: Option<u16>, abnormal: bool) {
    state.send_if_modified(|current| {
        if matches!(current, ConnectionState::Closed { .. }) {
            false
        } else {
            *current = ConnectionState::Closed { code, abnormal };
            true
        }
    });
}

async fn route_frame(registry: &HandlerRegistry, text: &str) {
    match InboundFrame::parse(text) {
        Ok(frame) => {
            let frame_type = frame.frame_type.clone();
            let delivered = registry.dispatch(&frame_type, frame.into_body()).await;
            if delivered == 0 {
                debug!(frame_type = %frame_type, "No handler registered for realtime frame");
            }
        }
        Err(e) => warn!(error = %e, "Dropping malformed realtime frame"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_closed_first_wins() {
        let (tx, rx) = watch::channel(ConnectionState::Open);

        mark_closed(&tx, Some(NORMAL_CLOSURE), false);
        mark_closed(&tx, None, true);

        assert_eq!(
            *rx.borrow(),
            ConnectionState::Closed {
                code: Some(1000),
                abnormal: false
            }
        );
        assert!(!rx.borrow().is_lost());
    }

    #[test]
    fn test_abnormal_close_is_lost() {
        let state = ConnectionState::Closed {
            code: Some(1006),
            abnormal: true,
        };
        assert!(state.is_lost());
        assert!(!state.is_open());
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped() {
        let registry = HandlerRegistry::new();
        let (_, mut rx) = registry.subscribe("notification").await;

        route_frame(&registry, "{not json").await;
        route_frame(&registry, r#"{"type":"notification","payload":{"id":"n-1"}}"#).await;

        assert_eq!(rx.recv().await.unwrap()["id"], "n-1");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_connect_refused_is_websocket_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = RealtimeChannel::connect(
            &format!("ws://{addr}/api/v1/ws"),
            "tok",
            "social_network_session",
            HandlerRegistry::new(),
        )
        .await;

        assert!(matches!(result, Err(ClientError::WebSocket(_))));
    }
}
