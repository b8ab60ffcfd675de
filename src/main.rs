use actix_web::{web, App, HttpServer};
use chat_relay::{http, AppState, ChatError, ChatServer, Codec, Denylist, Hub, Settings};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

#[actix_web::main]
async fn main() -> chat_relay::Result<()> {
    // Load environment variables
    dotenv().ok();

    let config = Settings::new()?;
    init_tracing(&config.log.level);
    info!("Configuration loaded successfully ({})", config.environment);

    // The relay must not serve without its denylist
    let denylist = Denylist::load(&config.chat.denylist_path)?;
    let codec = Codec::new(Arc::new(denylist));

    let hub = Hub::new().spawn(config.websocket.command_buffer);
    let state = web::Data::new(AppState::new(config.clone(), hub.clone())?);

    let ws_listener =
        tokio::net::TcpListener::bind((config.websocket.host.as_str(), config.websocket.port)).await?;
    let chat_server = Arc::new(ChatServer::new(hub, codec, config.websocket.clone()));
    tokio::spawn(chat_server.run(ws_listener));

    let listener = std::net::TcpListener::bind((config.server.host.as_str(), config.server.port))?;
    info!("Starting HTTP server at http://{}:{}", config.server.host, config.server.port);

    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(http::cors(&cors_config))
            .app_data(state.clone())
            .configure(http::configure)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| ChatError::InternalError(e.to_string()))?;

    Ok(())
}
