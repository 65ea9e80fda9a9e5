//! Sign in, open the realtime channel and log every chat message,
//! notification and presence update until Ctrl-C.
//!
//! Credentials come from `SOCIAL_EMAIL` / `SOCIAL_PASSWORD`; everything
//! else from the usual `SOCIAL_*` variables.

use anyhow::Context;
use social_client::models::ChatMessage;
use social_client::websocket::frame_types;
use social_client::{logging, ClientConfig, SocialClient};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cfg = ClientConfig::from_env()?;

    let email = env::var("SOCIAL_EMAIL").context("SOCIAL_EMAIL must be set")?;
    let password = env::var("SOCIAL_PASSWORD").context("SOCIAL_PASSWORD must be set")?;

    let client = SocialClient::new(cfg)?;
    let user = client.login(&email, &password).await?;
    info!(user_id = %user.id, name = %user.display_name(), "Signed in");

    for conversation in client.chat.conversations().await {
        info!(
            key = %conversation.key(),
            name = %conversation.name,
            unread = conversation.unread_count,
            "Conversation"
        );
    }

    let (_, mut chat_rx) = client.subscribe(frame_types::PRIVATE_MESSAGE).await;
    let (_, mut group_rx) = client.subscribe(frame_types::GROUP_MESSAGE).await;
    let (_, mut notif_rx) = client.subscribe(frame_types::NOTIFICATION).await;
    let (_, mut online_rx) = client.subscribe(frame_types::USER_LIST_UPDATE).await;
    client.connect_realtime().await?;
    info!("Listening, press Ctrl-C to stop");

    let mut health = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            Some(body) = chat_rx.recv() => log_chat(body),
            Some(body) = group_rx.recv() => log_chat(body),
            Some(body) = notif_rx.recv() => {
                info!(message = %body["message"], notif_type = %body["notifType"], "Notification");
            }
            Some(body) = online_rx.recv() => {
                let online = body.as_array().map(Vec::len).unwrap_or(0);
                info!(online, "Online users updated");
            }
            _ = health.tick() => {
                if matches!(client.realtime_state().await, Some(state) if state.is_lost()) {
                    let error = client.chat.error().await;
                    warn!(?error, "Realtime connection lost");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.logout().await;
    info!("Signed out");
    Ok(())
}

fn log_chat(body: serde_json::Value) {
    match serde_json::from_value::<ChatMessage>(body) {
        Ok(msg) => info!(
            from = %msg.sender_id,
            group = msg.group_id.as_deref().unwrap_or("-"),
            content = %msg.content,
            "Message"
        ),
        Err(e) => warn!(error = %e, "Unreadable chat frame"),
    }
}
