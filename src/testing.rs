//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::actions::{PlayerId, PlayerResponse, ServerMessage};
use crate::errors::{InteractionError, InteractionResult};
use crate::player_system::PlayerPort;

/// A port that answers requests from a fixed script and records everything
/// it is sent. Runs out of script by closing, like a client that hung up.
pub struct ScriptedPort {
    player_id: PlayerId,
    script: Mutex<VecDeque<String>>,
    sent: Mutex<Vec<ServerMessage>>,
    closed: watch::Sender<bool>,
}

impl ScriptedPort {
    pub fn new(player_id: &str, replies: Vec<PlayerResponse>) -> Arc<Self> {
        Self::raw(player_id, replies.iter().map(PlayerResponse::encode).collect())
    }

    /// Scripted with raw reply text, for replies that do not decode.
    pub fn raw(player_id: &str, replies: Vec<String>) -> Arc<Self> {
        let (closed, _) = watch::channel(false);
        Arc::new(ScriptedPort {
            player_id: player_id.to_string(),
            script: Mutex::new(replies.into()),
            sent: Mutex::new(Vec::new()),
            closed,
        })
    }

    /// A player that never has to answer anything.
    pub fn silent(player_id: &str) -> Arc<Self> {
        Self::new(player_id, Vec::new())
    }

    pub fn sent(&self) -> Vec<ServerMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }

    pub fn prompts(&self) -> usize {
        self.sent()
            .iter()
            .filter(|message| matches!(message, ServerMessage::TurnPrompt { .. }))
            .count()
    }

    pub fn errors(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|message| match message {
                ServerMessage::PlayError { reason } => Some(reason),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl PlayerPort for ScriptedPort {
    fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    fn send(&self, message: ServerMessage) -> InteractionResult<()> {
        if self.is_closed() {
            return Err(InteractionError::channel_closed(&self.player_id));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn request(&self, message: ServerMessage) -> InteractionResult<PlayerResponse> {
        self.send(message)?;
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(text) => PlayerResponse::decode(&text)
                .map_err(|err| InteractionError::malformed(&self.player_id, err.to_string())),
            None => {
                self.close();
                Err(InteractionError::channel_closed(&self.player_id))
            }
        }
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    async fn closed(&self) {
        let mut closed = self.closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
    }
}

/// Sugar for scripts.
pub fn play(positions: &[usize]) -> PlayerResponse {
    PlayerResponse::Play(positions.to_vec())
}

pub fn discard(positions: &[usize]) -> PlayerResponse {
    PlayerResponse::Discard(positions.to_vec())
}

pub fn ports(scripted: &[Arc<ScriptedPort>]) -> Vec<Arc<dyn PlayerPort>> {
    scripted
        .iter()
        .map(|port| port.clone() as Arc<dyn PlayerPort>)
        .collect()
}
