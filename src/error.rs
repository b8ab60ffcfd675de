use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Denylist error: {0}")]
    DenylistError(#[from] DenylistError),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] WebSocketError),

    #[error("Hub error: {0}")]
    HubError(#[from] HubError),

    #[error("Render error: {0}")]
    RenderError(#[from] askama::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

// Implement conversion from config::ConfigError
impl From<config::ConfigError> for ChatError {
    fn from(err: config::ConfigError) -> Self {
        ChatError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::InternalError(err.to_string())
    }
}

// Implement actix_web::ResponseError for ChatError
impl ResponseError for ChatError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = self.to_string();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "message": message
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ChatError::HubError(HubError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            ChatError::WebSocketError(WebSocketError::UnknownPath(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum DenylistError {
    #[error("Failed to read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum WebSocketError {
    #[error("Handshake failed: {0}")]
    HandshakeError(String),

    #[error("No websocket endpoint at {0}")]
    UnknownPath(String),
}

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Hub is no longer running")]
    Closed,
}
