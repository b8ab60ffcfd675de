pub mod chat;
pub mod config;
pub mod error;
pub mod http;
pub mod hub;
pub mod websocket;

use askama::Template;
use std::sync::Arc;

pub use error::ChatError;
pub type Result<T> = std::result::Result<T, ChatError>;
pub use config::Settings;

pub use chat::{ChatMessage, Codec, Denylist, Identity, Outbound};
pub use hub::{Hub, HubHandle, SessionId};
pub use websocket::{ChatServer, Session};

/// Application state shared by the HTTP workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub hub: HubHandle,
    pub index_page: Arc<str>,
}

/// The chat page, pointed at the websocket listener.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage<'a> {
    pub ws_port: u16,
    pub ws_path: &'a str,
}

impl<'a> IndexPage<'a> {
    pub fn for_settings(config: &'a Settings) -> Self {
        Self {
            ws_port: config.websocket.port,
            ws_path: &config.websocket.path,
        }
    }
}

impl AppState {
    /// Renders the chat page once for the configured websocket endpoint.
    pub fn new(config: Settings, hub: HubHandle) -> Result<Self> {
        let index_page = IndexPage::for_settings(&config).render()?;

        Ok(Self {
            config: Arc::new(config),
            hub,
            index_page: Arc::from(index_page),
        })
    }
}
