//! WebSocket module for the chat relay
//!
//! This module accepts websocket upgrades and runs one session per
//! connection against the shared hub.

mod server;
mod session;

pub use server::ChatServer;
pub use session::Session;
