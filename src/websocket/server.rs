use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig as ProtocolConfig;
use tokio_tungstenite::WebSocketStream;
use tracing::{error, info, warn};

use crate::chat::{Codec, Identity};
use crate::config::WebSocketConfig;
use crate::error::WebSocketError;
use crate::hub::HubHandle;
use crate::websocket::Session;

/// Accepts websocket upgrades and runs one [`Session`] per connection.
pub struct ChatServer {
    hub: HubHandle,
    codec: Codec,
    settings: WebSocketConfig,
}

impl ChatServer {
    pub fn new(hub: HubHandle, codec: Codec, settings: WebSocketConfig) -> Self {
        Self {
            hub,
            codec,
            settings,
        }
    }

    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        match listener.local_addr() {
            Ok(addr) => info!("Accepting WebSocket connections at ws://{}{}", addr, self.settings.path),
            Err(e) => warn!("WebSocket listener has no local address: {}", e),
        }

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let server = self.clone();
                    tokio::spawn(async move {
                        server.handle_connection(stream, addr).await;
                    });
                }
                Err(e) => {
                    error!("Error accepting TCP connection: {}", e);
                }
            }
        }
    }

    pub async fn handle_connection(self: Arc<Self>, raw_stream: TcpStream, addr: SocketAddr) {
        info!("New WebSocket connection from: {}", addr);

        let ws_stream = match self.upgrade(raw_stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("Rejected WebSocket connection from {}: {}", addr, e);
                return;
            }
        };

        let session = Session::new(Identity::generate(), self.hub.clone(), self.codec.clone());
        info!("Connection {} is session {} ({})", addr, session.id(), session.identity());
        session.run(ws_stream, &self.settings).await;

        info!("Connection {} closed", addr);
    }

    /// Performs the websocket handshake, answering 404 for any path other
    /// than the configured one.
    pub async fn upgrade<S>(&self, stream: S) -> Result<WebSocketStream<S>, WebSocketError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let expected = self.settings.path.clone();
        let check_path = move |request: &Request, response: Response| {
            let path = request.uri().path();
            if path == expected {
                Ok(response)
            } else {
                let mut rejection = ErrorResponse::new(Some(
                    WebSocketError::UnknownPath(path.to_string()).to_string(),
                ));
                *rejection.status_mut() = StatusCode::NOT_FOUND;
                Err(rejection)
            }
        };

        let mut config = ProtocolConfig::default();
        config.max_message_size = Some(self.settings.max_message_size);
        config.max_frame_size = Some(self.settings.max_message_size);

        tokio_tungstenite::accept_hdr_async_with_config(stream, check_path, Some(config))
            .await
            .map_err(|e| WebSocketError::HandshakeError(e.to_string()))
    }
}
