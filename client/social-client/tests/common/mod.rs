#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use social_client::{ChatConfig, ClientConfig, SocialClient};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION_TOKEN: &str = "tok-123";

pub fn viewer() -> Value {
    json!({
        "id": "5",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com"
    })
}

pub fn config_for(server: &MockServer, ws_url: &str, optimistic_send: bool) -> ClientConfig {
    ClientConfig {
        api_url: format!("{}/api/v1", server.uri()),
        ws_url: ws_url.to_string(),
        http_timeout_secs: 5,
        chat: ChatConfig { optimistic_send },
        ..ClientConfig::default()
    }
}

pub fn client_for(server: &MockServer) -> SocialClient {
    SocialClient::new(config_for(server, "ws://127.0.0.1:9/api/v1/ws", false)).unwrap()
}

/// `/login` answers with the viewer and sets the session cookie
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "set-cookie",
                    format!("social_network_session={SESSION_TOKEN}; Path=/").as_str(),
                )
                .set_body_json(viewer()),
        )
        .mount(server)
        .await;
}

pub async fn signed_in(server: &MockServer, client: &SocialClient) {
    mount_login(server).await;
    client.login("ada@example.com", "secret").await.unwrap();
}

/// Poll `check` until it holds, failing the test after two seconds
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

#[derive(Debug, Clone)]
pub struct Handshake {
    pub uri: String,
    pub cookie: Option<String>,
}

/// In-process WebSocket endpoint serving a single connection
pub struct WsServer {
    pub url: String,
    pub handshake: Arc<Mutex<Option<Handshake>>>,
    /// Frames to push to the client; dropping it cuts the connection
    pub push: UnboundedSender<Message>,
    /// Frames the client sent
    pub received: UnboundedReceiver<Message>,
}

impl WsServer {
    pub fn push_json(&self, value: Value) {
        self.push.send(Message::text(value.to_string())).unwrap();
    }

    pub fn handshake(&self) -> Option<Handshake> {
        self.handshake.lock().unwrap().clone()
    }

    pub async fn next_received(&mut self) -> Message {
        tokio::time::timeout(Duration::from_secs(2), self.received.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("server closed")
    }
}

pub async fn spawn_ws_server() -> WsServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (push_tx, mut push_rx) = unbounded_channel::<Message>();
    let (recv_tx, recv_rx) = unbounded_channel::<Message>();
    let handshake = Arc::new(Mutex::new(None));
    let seen = handshake.clone();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            *seen.lock().unwrap() = Some(Handshake {
                uri: req.uri().to_string(),
                cookie: req
                    .headers()
                    .get("cookie")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
            });
            Ok(resp)
        };
        let ws = accept_hdr_async(stream, callback).await.unwrap();
        let (mut sink, mut source) = ws.split();

        loop {
            tokio::select! {
                outgoing = push_rx.recv() => match outgoing {
                    Some(msg) => {
                        let closing = matches!(msg, Message::Close(_));
                        if sink.send(msg).await.is_err() || closing {
                            break;
                        }
                    }
                    None => break,
                },
                incoming = source.next() => match incoming {
                    Some(Ok(msg)) => {
                        let _ = recv_tx.send(msg);
                    }
                    _ => break,
                },
            }
        }
    });

    WsServer {
        url: format!("ws://{addr}/api/v1/ws"),
        handshake,
        push: push_tx,
        received: recv_rx,
    }
}
