use itertools::{Either, Itertools};
use std::collections::BTreeSet;

use crate::cards::Card;

/// The cards a player holds that are not in play.
///
/// A hand never holds more than `limit` cards. Breaking that is a bug in phase
/// logic, so it panics instead of returning an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<Card>,
    limit: usize,
}

impl Hand {
    pub fn new(limit: usize) -> Self {
        Hand {
            cards: Vec::with_capacity(limit),
            limit,
        }
    }

    pub fn with_cards(limit: usize, cards: Vec<Card>) -> Self {
        assert!(
            cards.len() <= limit,
            "a hand of {} cards exceeds the limit of {}",
            cards.len(),
            limit
        );
        Hand { cards, limit }
    }

    pub fn push(&mut self, card: Card) {
        assert!(
            self.cards.len() < self.limit,
            "a player should never hold more than {} cards",
            self.limit
        );
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Cards missing until the hand is full.
    pub fn shortfall(&self) -> usize {
        self.limit - self.cards.len()
    }

    /// Splits the hand into the cards at `positions` (0-based) and the rest,
    /// both in hand order. The hand itself is left untouched.
    pub fn split_positions(&self, positions: &BTreeSet<usize>) -> (Vec<Card>, Vec<Card>) {
        self.cards
            .iter()
            .enumerate()
            .partition_map(|(position, card)| {
                if positions.contains(&position) {
                    Either::Left(*card)
                } else {
                    Either::Right(*card)
                }
            })
    }
}
