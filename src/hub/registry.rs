use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chat::Outbound;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The hub's reference to one session: its id, its display name for logs,
/// and the sending half of its outbound queue.
///
/// The hub holds the only sender, so dropping the handle closes the queue.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    name: String,
    sender: mpsc::Sender<Outbound>,
}

impl SessionHandle {
    pub fn new(id: SessionId, name: impl Into<String>, sender: mpsc::Sender<Outbound>) -> Self {
        Self {
            id,
            name: name.into(),
            sender,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Active session set. Not synchronized itself; see [`Hub::spawn`].
#[derive(Debug, Default)]
pub struct Hub {
    sessions: HashMap<SessionId, SessionHandle>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, session: SessionHandle) {
        info!("Registered session {} ({})", session.id(), session.name());
        // replacing an existing entry drops its old sender
        self.sessions.insert(session.id, session);
    }

    /// Removes the session and closes its outbound queue. Returns `false`
    /// when the session was not registered.
    pub fn unregister(&mut self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some(session) => {
                info!("Unregistered session {} ({})", id, session.name());
                true
            }
            None => {
                debug!("Session {} already unregistered", id);
                false
            }
        }
    }

    /// Offers `message` to every session without waiting. Sessions whose
    /// queue is full or already closed are removed, which closes their
    /// queue. Returns the ids of removed sessions.
    pub fn broadcast(&mut self, message: &Outbound) -> Vec<SessionId> {
        let mut evicted = Vec::new();

        self.sessions.retain(|id, session| match session.sender.try_send(message.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full for session {} ({}), evicting", id, session.name());
                evicted.push(*id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Outbound queue closed for session {}, removing", id);
                evicted.push(*id);
                false
            }
        });

        debug!(
            "Broadcast delivered to {} sessions, {} evicted",
            self.sessions.len(),
            evicted.len()
        );
        evicted
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }
}
