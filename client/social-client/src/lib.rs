//! Social network client SDK
//!
//! Session store, conversation cache, realtime channel and the REST-backed
//! stores behind the profile, follow, notification and feed pages.
//! [`SocialClient`] wires them together for one signed-in user.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;
pub mod websocket;

pub use config::{ChatConfig, ClientConfig};
pub use error::{ClientError, ClientResult};
pub use state::SocialClient;
