use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot, watch};

use crate::actions::{PlayerId, PlayerResponse, ServerMessage};
use crate::errors::{InteractionError, InteractionResult};

/// How the game talks to one player, independent of the transport behind it.
#[async_trait]
pub trait PlayerPort: Send + Sync {
    fn player_id(&self) -> &PlayerId;

    /// Queues a message for the player. Messages arrive in the order sent.
    fn send(&self, message: ServerMessage) -> InteractionResult<()>;

    /// Sends `message` and waits for the player's reply to it.
    ///
    /// Only one request may be outstanding per player.
    async fn request(&self, message: ServerMessage) -> InteractionResult<PlayerResponse>;

    /// Severs the channel. A pending request fails with `ChannelClosed`.
    fn close(&self);

    fn is_closed(&self) -> bool;

    /// Resolves once the channel is severed from either side.
    async fn closed(&self);
}

/// State shared between a port and its transport end
struct Shared {
    player_id: PlayerId,
    pending: Mutex<Option<oneshot::Sender<String>>>,
    closed: watch::Sender<bool>,
}

impl Shared {
    fn take_pending(&self) -> Option<oneshot::Sender<String>> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn close(&self) {
        let was_closed = self.closed.send_replace(true);
        // Dropping the sender wakes the waiting request.
        self.take_pending();
        if !was_closed {
            log::info!("🔌 Channel to player {} closed", self.player_id);
        }
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

/// Creates a connected port and transport link for one player.
pub fn channel(player_id: impl Into<PlayerId>) -> (ChannelPort, PlayerLink) {
    let (outgoing, incoming) = mpsc::unbounded_channel();
    let (closed, closed_rx) = watch::channel(false);
    let shared = Arc::new(Shared {
        player_id: player_id.into(),
        pending: Mutex::new(None),
        closed,
    });

    let port = ChannelPort {
        shared: shared.clone(),
        outgoing,
    };
    let link = PlayerLink {
        shared,
        incoming,
        closed_rx,
    };
    (port, link)
}

/// The game side of a player channel.
pub struct ChannelPort {
    shared: Arc<Shared>,
    outgoing: mpsc::UnboundedSender<ServerMessage>,
}

impl fmt::Debug for ChannelPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelPort")
            .field("player_id", &self.shared.player_id)
            .field("closed", &self.shared.is_closed())
            .finish()
    }
}

impl ChannelPort {
    fn clear_pending(&self) {
        self.shared.take_pending();
    }
}

#[async_trait]
impl PlayerPort for ChannelPort {
    fn player_id(&self) -> &PlayerId {
        &self.shared.player_id
    }

    fn send(&self, message: ServerMessage) -> InteractionResult<()> {
        if self.shared.is_closed() {
            return Err(InteractionError::channel_closed(self.player_id()));
        }
        self.outgoing
            .send(message)
            .map_err(|_| InteractionError::channel_closed(self.player_id()))
    }

    async fn request(&self, message: ServerMessage) -> InteractionResult<PlayerResponse> {
        let reply = {
            let mut pending = self
                .shared
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            // A sender whose receiver is gone belongs to an abandoned request.
            if pending.as_ref().is_some_and(|tx| !tx.is_closed()) {
                return Err(InteractionError::RequestPending {
                    player_id: self.player_id().clone(),
                });
            }
            let (tx, rx) = oneshot::channel();
            *pending = Some(tx);
            rx
        };

        if let Err(err) = self.send(message) {
            self.clear_pending();
            return Err(err);
        }

        let mut closed = self.shared.closed.subscribe();
        let text = tokio::select! {
            reply = reply => reply.map_err(|_| InteractionError::channel_closed(self.player_id()))?,
            _ = wait_closed(&mut closed) => {
                self.clear_pending();
                return Err(InteractionError::channel_closed(self.player_id()));
            }
        };

        PlayerResponse::decode(&text).map_err(|err| {
            log::debug!("Could not decode reply from {}: {}", self.player_id(), text);
            InteractionError::malformed(self.player_id(), err.to_string())
        })
    }

    fn close(&self) {
        self.shared.close();
    }

    fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    async fn closed(&self) {
        wait_closed(&mut self.shared.closed.subscribe()).await;
    }
}

/// The transport side of a player channel.
///
/// Dropping the link severs the channel.
pub struct PlayerLink {
    shared: Arc<Shared>,
    incoming: mpsc::UnboundedReceiver<ServerMessage>,
    closed_rx: watch::Receiver<bool>,
}

impl PlayerLink {
    pub fn player_id(&self) -> &PlayerId {
        &self.shared.player_id
    }

    /// Next message for the player, or `None` once the channel is severed and
    /// everything queued before that has been delivered.
    pub async fn next_message(&mut self) -> Option<ServerMessage> {
        tokio::select! {
            biased;
            message = self.incoming.recv() => message,
            _ = wait_closed(&mut self.closed_rx) => self.incoming.try_recv().ok(),
        }
    }

    pub fn responder(&self) -> Responder {
        Responder {
            shared: self.shared.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    pub fn close(&self) {
        self.shared.close();
    }
}

impl Drop for PlayerLink {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// Delivers replies for a player. Cheap to clone into a reader task.
#[derive(Clone)]
pub struct Responder {
    shared: Arc<Shared>,
}

impl Responder {
    /// Resolves the pending request with raw reply text.
    ///
    /// Returns false when nothing was waiting for a reply; the text is dropped.
    pub fn respond(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        match self.shared.take_pending() {
            Some(tx) => {
                if tx.send(text).is_err() {
                    log::debug!(
                        "Reply from {} arrived after its request was abandoned",
                        self.shared.player_id
                    );
                    return false;
                }
                true
            }
            None => {
                log::warn!(
                    "Dropping unsolicited reply from {}: {}",
                    self.shared.player_id,
                    text
                );
                false
            }
        }
    }

    pub fn respond_with(&self, response: &PlayerResponse) -> bool {
        self.respond(response.encode())
    }

    pub fn close(&self) {
        self.shared.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::CardKind;

    #[tokio::test]
    async fn test_request_resolves_with_decoded_reply() {
        let (port, mut link) = channel("alice");
        let responder = link.responder();

        let client = tokio::spawn(async move {
            let message = link.next_message().await;
            assert_eq!(message, Some(ServerMessage::TurnStart));
            assert!(responder.respond(r#"{"draw":"worker"}"#));
            link
        });

        let reply = port.request(ServerMessage::TurnStart).await;
        assert_eq!(reply, Ok(PlayerResponse::Draw(CardKind::Worker)));
        drop(client.await.unwrap());
        assert!(port.is_closed());
    }

    #[tokio::test]
    async fn test_second_request_is_rejected_while_pending() {
        let (port, mut link) = channel("alice");
        let port = Arc::new(port);

        let first = {
            let port = port.clone();
            tokio::spawn(async move { port.request(ServerMessage::TurnStart).await })
        };
        assert_eq!(link.next_message().await, Some(ServerMessage::TurnStart));

        let second = port.request(ServerMessage::TurnEnd).await;
        assert_eq!(
            second,
            Err(InteractionError::RequestPending {
                player_id: "alice".to_string()
            })
        );

        link.responder().respond(r#"{"play":[]}"#);
        assert_eq!(first.await.unwrap(), Ok(PlayerResponse::Play(vec![])));
    }

    #[tokio::test]
    async fn test_close_fails_pending_request() {
        let (port, mut link) = channel("bob");
        let port = Arc::new(port);

        let pending = {
            let port = port.clone();
            tokio::spawn(async move { port.request(ServerMessage::TurnStart).await })
        };
        assert!(link.next_message().await.is_some());

        port.close();
        assert_eq!(
            pending.await.unwrap(),
            Err(InteractionError::channel_closed("bob"))
        );
        assert_eq!(link.next_message().await, None);
        assert!(port.send(ServerMessage::TurnEnd).is_err());
    }

    #[tokio::test]
    async fn test_dropping_link_closes_port() {
        let (port, link) = channel("bob");
        drop(link);
        port.closed().await;
        assert_eq!(
            port.request(ServerMessage::TurnStart).await,
            Err(InteractionError::channel_closed("bob"))
        );
    }

    #[tokio::test]
    async fn test_garbage_reply_is_malformed() {
        let (port, mut link) = channel("carol");
        let responder = link.responder();
        let client = tokio::spawn(async move {
            link.next_message().await;
            responder.respond("not json");
            link
        });

        let reply = port.request(ServerMessage::TurnStart).await;
        assert!(matches!(
            reply,
            Err(InteractionError::MalformedResponse { .. })
        ));
        let _link = client.await.unwrap();
    }

    #[tokio::test]
    async fn test_unsolicited_reply_is_dropped() {
        let (port, link) = channel("dave");
        assert!(!link.responder().respond(r#"{"play":[1]}"#));
        assert!(!port.is_closed());
    }

    #[tokio::test]
    async fn test_messages_queued_before_close_are_delivered() {
        let (port, mut link) = channel("erin");
        port.send(ServerMessage::TurnStart).unwrap();
        port.send(ServerMessage::TurnEnd).unwrap();
        port.close();

        assert_eq!(link.next_message().await, Some(ServerMessage::TurnStart));
        assert_eq!(link.next_message().await, Some(ServerMessage::TurnEnd));
        assert_eq!(link.next_message().await, None);
    }
}
