use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::chat::{ChatMessage, Codec, Identity, Outbound};
use crate::config::WebSocketConfig;
use crate::hub::{HubHandle, SessionHandle, SessionId};

/// One connected client: an identity plus the read and write loops that
/// move frames between its socket and the hub.
pub struct Session {
    id: SessionId,
    identity: Identity,
    hub: HubHandle,
    codec: Codec,
}

impl Session {
    pub fn new(identity: Identity, hub: HubHandle, codec: Codec) -> Self {
        Self {
            id: SessionId::new(),
            identity,
            hub,
            codec,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Drives the session until either loop stops.
    ///
    /// When the read loop stops first the session is unregistered, which
    /// closes the outbound queue; the write loop then drains it and sends a
    /// close frame, bounded by `close_timeout`. When the write loop stops
    /// first the read loop is aborted. Either way a leave notice is
    /// broadcast afterwards.
    pub async fn run<S>(self, ws_stream: WebSocketStream<S>, settings: &WebSocketConfig)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (ws_sink, ws_stream) = ws_stream.split();
        let (tx, rx) = mpsc::channel(settings.outbound_buffer);

        if tx.try_send(self.codec.greeting(&self.identity)).is_err() {
            warn!("Could not queue greeting for session {}", self.id);
        }

        // the writer must be draining before the hub can broadcast to us
        let mut send_task = tokio::spawn(write_loop(self.id, ws_sink, rx));

        let handle = SessionHandle::new(self.id, self.identity.name(), tx);
        if let Err(e) = self.hub.register(handle).await {
            error!("Failed to register session {}: {}", self.id, e);
            return;
        }
        self.announce("joined").await;

        let mut receive_task = tokio::spawn(read_loop(
            self.id,
            self.identity.label(),
            ws_stream,
            self.hub.clone(),
            self.codec.clone(),
        ));

        tokio::select! {
            _ = &mut receive_task => {
                info!("Receive task completed for session {}", self.id);
                self.unregister().await;
                if timeout(settings.close_timeout(), &mut send_task).await.is_err() {
                    warn!("Send task for session {} did not drain in time, aborting", self.id);
                    send_task.abort();
                }
            }
            _ = &mut send_task => {
                info!("Send task completed for session {}", self.id);
                receive_task.abort();
                self.unregister().await;
            }
        }

        self.announce("left").await;
        info!("Session {} ({}) closed", self.id, self.identity);
    }

    async fn unregister(&self) {
        if let Err(e) = self.hub.unregister(self.id).await {
            error!("Failed to unregister session {}: {}", self.id, e);
        }
    }

    async fn announce(&self, verb: &str) {
        let notice = match self.codec.system(format!("{} {} the chat", self.identity, verb)) {
            Ok(notice) => notice,
            Err(e) => {
                error!("Failed to format {} notice for session {}: {}", verb, self.id, e);
                return;
            }
        };
        if let Err(e) = self.hub.broadcast(notice).await {
            error!("Failed to announce session {} {}: {}", self.id, verb, e);
        }
    }
}

/// Forwards queued payloads to the socket as text frames. Sends a close
/// frame once the hub drops the queue.
async fn write_loop<Si>(id: SessionId, mut ws_sink: Si, mut rx: mpsc::Receiver<Outbound>)
where
    Si: Sink<Message, Error = WsError> + Unpin,
{
    while let Some(message) = rx.recv().await {
        if let Err(e) = ws_sink.send(Message::Text(message.to_string())).await {
            error!("Error sending WebSocket message to session {}: {}", id, e);
            return;
        }
    }

    debug!("Outbound queue closed for session {}", id);
    if let Err(e) = ws_sink.send(Message::Close(None)).await {
        debug!("Close frame not sent to session {}: {}", id, e);
    }
    if let Err(e) = ws_sink.close().await {
        debug!("Error closing WebSocket for session {}: {}", id, e);
    }
}

/// Encodes every inbound text frame and hands it to the hub.
async fn read_loop<St>(id: SessionId, label: String, mut ws_stream: St, hub: HubHandle, codec: Codec)
where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = ws_stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                debug!("Received {} bytes from session {}", text.len(), id);
                let payload = match codec.encode(&ChatMessage::new(label.as_str(), text)) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Dropping unformattable message from session {}: {}", id, e);
                        continue;
                    }
                };
                if let Err(e) = hub.broadcast(payload).await {
                    error!("Dropping message from session {}: {}", id, e);
                    return;
                }
            }
            Ok(Message::Binary(bin)) => {
                warn!("Ignoring {} byte binary message from session {}", bin.len(), id);
            }
            Ok(Message::Close(reason)) => {
                info!("Session {} closed by client: {:?}", id, reason);
                return;
            }
            Ok(_) => {
                // ping/pong are answered by tungstenite
            }
            Err(e) => {
                error!("Error receiving WebSocket message from session {}: {}", id, e);
                return;
            }
        }
    }
}
