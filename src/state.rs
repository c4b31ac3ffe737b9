use crate::actions::{BoardSnapshot, PlayerId};
use crate::cards::{Accident, Card, CardFactory, CardId};
use crate::hand::Hand;

/// Position of a player in the turn rotation
pub type Seat = usize;

/// The authoritative snapshot of one match.
///
/// Phases take the state by value and hand back a new one, so the turn driver
/// can keep an untouched copy to roll back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    /// Fixed for the lifetime of the match. Defines turn rotation.
    pub players: Vec<PlayerId>,
    pub hands: Vec<Hand>,
    pub in_play: Vec<Vec<Card>>,
    /// Accidents afflicting each player.
    pub accidents: Vec<Vec<Accident>>,
    /// Hotel floors built by each player. Never decreases.
    pub floors: Vec<u32>,
    /// Cards discarded, consumed by construction or expired.
    pub discard: Vec<CardId>,
    pub factory: CardFactory,
    active: Seat,
}

impl GameState {
    pub fn new(players: Vec<PlayerId>, hand_limit: usize, seed: u64) -> Self {
        let count = players.len();
        GameState {
            players,
            hands: vec![Hand::new(hand_limit); count],
            in_play: vec![Vec::new(); count],
            accidents: vec![Vec::new(); count],
            floors: vec![0; count],
            discard: Vec::new(),
            factory: CardFactory::new(seed),
            active: 0,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn active(&self) -> Seat {
        self.active
    }

    pub fn active_player(&self) -> &PlayerId {
        &self.players[self.active]
    }

    /// The seat after `seat` in turn order.
    pub fn next_seat(&self, seat: Seat) -> Seat {
        (seat + 1) % self.players.len()
    }

    /// Hands the turn to the next player.
    pub fn rotate(&mut self) {
        self.active = self.next_seat(self.active);
    }

    pub fn seat_of(&self, player_id: &str) -> Option<Seat> {
        self.players.iter().position(|p| p == player_id)
    }

    pub fn add_floor(&mut self, seat: Seat) {
        self.floors[seat] += 1;
    }

    /// Seats whose floors reached `floors_to_win`, in seat order.
    pub fn winners(&self, floors_to_win: u32) -> Vec<Seat> {
        self.floors
            .iter()
            .enumerate()
            .filter(|(_, &floors)| floors >= floors_to_win)
            .map(|(seat, _)| seat)
            .collect()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            cards_in_play: self
                .players
                .iter()
                .cloned()
                .zip(self.in_play.iter().cloned())
                .collect(),
            floors: self.floors_by_player(),
        }
    }

    pub fn floors_by_player(&self) -> std::collections::BTreeMap<PlayerId, u32> {
        self.players
            .iter()
            .cloned()
            .zip(self.floors.iter().copied())
            .collect()
    }

    /// Every card id currently held anywhere, discard included.
    pub fn card_ids(&self) -> Vec<CardId> {
        let mut ids: Vec<CardId> = self
            .hands
            .iter()
            .flat_map(|hand| hand.cards().iter().map(Card::id))
            .chain(self.in_play.iter().flatten().map(Card::id))
            .chain(self.accidents.iter().flatten().map(|accident| accident.id))
            .chain(self.discard.iter().copied())
            .collect();
        ids.sort();
        ids
    }
}
