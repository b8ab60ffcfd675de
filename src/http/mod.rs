//! HTTP routes served next to the websocket listener.

use actix_cors::Cors;
use actix_web::{web, HttpResponse};
use tracing::error;

use crate::config::CorsConfig;
use crate::error::ChatError;
use crate::AppState;

/// Serves the chat page.
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(state.index_page.to_string())
}

/// Health check endpoint handler
/// Returns a JSON response with server status, timestamp and live session count
pub async fn health_check(state: web::Data<AppState>) -> Result<HttpResponse, ChatError> {
    let sessions = state.hub.session_count().await.map_err(|e| {
        error!("Health check could not reach hub: {}", e);
        ChatError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "sessions": sessions,
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health_check));
}

pub fn cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        Cors::default()
            .allowed_methods(vec!["GET"])
    };

    cors.max_age(config.max_age as usize)
}
