// Players module - computer players that connect through a player link
//
// A bot sees exactly what a remote client sees: the messages sent to it and
// the prompts it must answer.

use crate::actions::{PlayerResponse, ServerMessage};
use crate::cards::Card;
use crate::enums::PromptPhase;
use crate::player_system::PlayerLink;

pub mod random;

pub use self::random::RandomBot;

/// Decision making for a computer player
pub trait BotPlayer: Send {
    /// Called for every message, prompts included, before any decision.
    fn observe(&mut self, _message: &ServerMessage) {}

    fn decide(&mut self, phase: PromptPhase, hand: &[Card]) -> PlayerResponse;
}

/// What a bot went through during one game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotReport {
    pub turns: u32,
    pub play_errors: u32,
    pub won: bool,
    pub game_over: bool,
}

/// Answers every prompt on `link` with `bot` until the game ends or the
/// channel is severed.
pub async fn drive<B: BotPlayer>(mut link: PlayerLink, mut bot: B) -> BotReport {
    let responder = link.responder();
    let me = link.player_id().clone();
    let mut report = BotReport::default();

    while let Some(message) = link.next_message().await {
        bot.observe(&message);
        match message {
            ServerMessage::TurnPrompt { phase, hand } => {
                let response = bot.decide(phase, &hand);
                responder.respond_with(&response);
            }
            ServerMessage::PlayError { reason } => {
                log::debug!("🤖 {} made a bad play: {}", me, reason);
                report.play_errors += 1;
            }
            ServerMessage::TurnEnd => report.turns += 1,
            ServerMessage::GameOver { winners, .. } => {
                report.won = winners.contains(&me);
                report.game_over = true;
                break;
            }
            _ => {}
        }
    }
    report
}
