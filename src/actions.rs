use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cards::Card;
use crate::enums::{CardKind, PromptPhase};

/// Unique identifier for players
pub type PlayerId = String;

/// Unique identifier for game sessions
pub type SessionId = String;

/// Everything the server tells a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once when the game starts so the client can identify itself.
    GameStart {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },

    TurnStart,

    /// Asks the active player for input. Positions in `hand` are 1-based in replies.
    TurnPrompt { phase: PromptPhase, hand: Vec<Card> },

    StateSync(BoardSnapshot),

    PlayError { reason: String },

    TurnEnd,

    /// `winners` is empty when the game was aborted.
    GameOver {
        winners: Vec<PlayerId>,
        floors: BTreeMap<PlayerId, u32>,
    },
}

/// The public part of the game state, broadcast after visible phases.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub cards_in_play: BTreeMap<PlayerId, Vec<Card>>,
    pub floors: BTreeMap<PlayerId, u32>,
}

/// A decoded reply from a player.
///
/// On the wire: `{"play": [1, 3]}`, `{"discard": [2]}`, `{"draw": "worker"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerResponse {
    /// 1-based positions of the cards to play.
    Play(Vec<usize>),

    /// 1-based positions of the cards to discard.
    Discard(Vec<usize>),

    Draw(CardKind),
}

impl PlayerResponse {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> String {
        // A plain enum of vectors and unit variants always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}
