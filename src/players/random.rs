use rand::prelude::*;
use rand_xorshift::XorShiftRng;

use super::BotPlayer;
use crate::actions::{PlayerId, PlayerResponse, ServerMessage};
use crate::cards::Card;
use crate::enums::{CardKind, PromptPhase};

/// Plays whatever it believes is legal, holding some cards back at random.
///
/// It cannot see its own accidents, so it learns from play errors: after one
/// it stops playing materials for the rest of the turn.
pub struct RandomBot {
    rng: XorShiftRng,
    me: Option<PlayerId>,
    in_play: Vec<Card>,
    cautious: bool,
    played: usize,
}

impl RandomBot {
    pub fn new(seed: u64) -> Self {
        RandomBot {
            rng: XorShiftRng::seed_from_u64(seed),
            me: None,
            in_play: Vec::new(),
            cautious: false,
            played: 0,
        }
    }

    fn wants(&self, card: &Card) -> bool {
        match card {
            Card::Worker(_) | Card::Accident(_) => true,
            Card::Material(_) => !self.cautious && card.can_play(&self.in_play, &[]),
        }
    }

    fn choose_play(&mut self, hand: &[Card]) -> Vec<usize> {
        let mut positions = Vec::new();
        for (i, card) in hand.iter().enumerate() {
            if self.wants(card) && self.rng.gen_bool(0.8) {
                positions.push(i + 1);
            }
        }
        self.played = positions.len();
        positions
    }

    fn choose_discard(&mut self, hand: &[Card]) -> Vec<usize> {
        let must = self.played == 0;
        if hand.is_empty() || (!must && self.rng.gen_bool(0.7)) {
            return Vec::new();
        }
        vec![self.rng.gen_range(1..=hand.len())]
    }

    fn choose_draw(&mut self) -> CardKind {
        match self.rng.gen_range(0..10) {
            0..=4 => CardKind::Worker,
            5..=7 => CardKind::Material,
            _ => CardKind::Accident,
        }
    }
}

impl BotPlayer for RandomBot {
    fn observe(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::GameStart { player_id } => self.me = Some(player_id.clone()),
            ServerMessage::TurnStart => self.cautious = false,
            ServerMessage::PlayError { .. } => self.cautious = true,
            ServerMessage::StateSync(board) => {
                if let Some(cards) = self.me.as_ref().and_then(|me| board.cards_in_play.get(me)) {
                    self.in_play = cards.clone();
                }
            }
            _ => {}
        }
    }

    fn decide(&mut self, phase: PromptPhase, hand: &[Card]) -> PlayerResponse {
        match phase {
            PromptPhase::Play => PlayerResponse::Play(self.choose_play(hand)),
            PromptPhase::Discard => PlayerResponse::Discard(self.choose_discard(hand)),
            PromptPhase::Draw => PlayerResponse::Draw(self.choose_draw()),
        }
    }
}
