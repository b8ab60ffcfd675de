use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::{Hub, SessionHandle, SessionId};
use crate::chat::Outbound;
use crate::error::HubError;

#[derive(Debug)]
enum Command {
    Register(SessionHandle),
    Unregister(SessionId),
    Broadcast(Outbound),
    Snapshot(oneshot::Sender<Vec<SessionId>>),
}

impl Hub {
    /// Moves the hub onto its own task and returns a handle to it.
    ///
    /// Every command from every handle goes through one queue and is applied
    /// in arrival order, so set mutations never overlap with a broadcast.
    /// The task exits once all handles are dropped.
    pub fn spawn(self, command_capacity: usize) -> HubHandle {
        let (tx, rx) = mpsc::channel(command_capacity);
        tokio::spawn(self.run(rx));
        HubHandle { commands: tx }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!("Hub started");
        while let Some(command) = commands.recv().await {
            match command {
                Command::Register(session) => self.register(session),
                Command::Unregister(id) => {
                    self.unregister(id);
                }
                Command::Broadcast(message) => {
                    self.broadcast(&message);
                }
                Command::Snapshot(reply) => {
                    if reply.send(self.session_ids()).is_err() {
                        debug!("Snapshot requester went away");
                    }
                }
            }
        }
        info!("Hub stopped with {} sessions still registered", self.len());
    }
}

/// Cloneable entry point to a running hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<Command>,
}

impl HubHandle {
    pub async fn register(&self, session: SessionHandle) -> Result<(), HubError> {
        self.send(Command::Register(session)).await
    }

    /// Removing an absent session is not an error.
    pub async fn unregister(&self, id: SessionId) -> Result<(), HubError> {
        self.send(Command::Unregister(id)).await
    }

    pub async fn broadcast(&self, message: Outbound) -> Result<(), HubError> {
        self.send(Command::Broadcast(message)).await
    }

    pub async fn session_ids(&self) -> Result<Vec<SessionId>, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub async fn session_count(&self) -> Result<usize, HubError> {
        Ok(self.session_ids().await?.len())
    }

    async fn send(&self, command: Command) -> Result<(), HubError> {
        self.commands.send(command).await.map_err(|_| HubError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::error::TryRecvError;

    fn session(capacity: usize) -> (SessionHandle, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        let id = SessionId::new();
        (SessionHandle::new(id, id.to_string(), tx), rx)
    }

    #[tokio::test]
    async fn test_commands_apply_in_order() {
        let hub = Hub::new().spawn(16);
        let (a, mut a_rx) = session(4);
        let a_id = a.id();

        hub.register(a).await.unwrap();
        hub.broadcast(Outbound::from("hello")).await.unwrap();
        hub.unregister(a_id).await.unwrap();

        assert_eq!(a_rx.recv().await, Some(Outbound::from("hello")));
        assert_eq!(a_rx.recv().await, None);
        assert_eq!(hub.session_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_three_sessions_with_slow_consumer() {
        let hub = Hub::new().spawn(16);
        let (a, mut a_rx) = session(8);
        let (b, mut b_rx) = session(8);
        // slow-drain stub: room for exactly one message, never read
        let (c, mut c_rx) = session(1);
        let c_id = c.id();
        for s in [a, b, c] {
            hub.register(s).await.unwrap();
        }

        hub.broadcast(Outbound::from("A: hello")).await.unwrap();
        hub.broadcast(Outbound::from("A: world")).await.unwrap();
        let ids = hub.session_ids().await.unwrap();

        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&c_id));

        for rx in [&mut a_rx, &mut b_rx] {
            assert!(rx.recv().await.unwrap().as_str().ends_with("A: hello"));
            assert!(rx.recv().await.unwrap().as_str().ends_with("A: world"));
        }
        assert_eq!(c_rx.recv().await, Some(Outbound::from("A: hello")));
        assert_eq!(c_rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_double_unregister_through_handle() {
        let hub = Hub::new().spawn(16);
        let (a, mut a_rx) = session(4);
        let a_id = a.id();
        hub.register(a).await.unwrap();

        hub.unregister(a_id).await.unwrap();
        hub.unregister(a_id).await.unwrap();

        assert_eq!(a_rx.recv().await, None);
        assert_eq!(hub.session_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_late_registration_misses_earlier_broadcast() {
        let hub = Hub::new().spawn(16);
        hub.broadcast(Outbound::from("before")).await.unwrap();

        let (a, mut a_rx) = session(4);
        hub.register(a).await.unwrap();
        hub.session_count().await.unwrap();

        assert_eq!(a_rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let hub = Hub::new().spawn(4);
        let mut tasks = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..32 {
            let (s, rx) = session(4);
            receivers.push(rx);
            let hub = hub.clone();
            tasks.push(tokio::spawn(async move { hub.register(s).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        hub.broadcast(Outbound::from("all")).await.unwrap();
        assert_eq!(hub.session_count().await.unwrap(), 32);
        for rx in receivers.iter_mut() {
            assert_eq!(rx.recv().await, Some(Outbound::from("all")));
        }
    }
}
