use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::cards::{active_workers, Accident, Card, CardId};
use crate::enums::BLOCK_TYPES;
use crate::errors::{ConfigError, ConfigResult};

/// What the active player must commit to during the deal phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DealRequirement {
    /// At least one card played or discarded, in any combination.
    #[default]
    AnyAcrossBoth,

    /// Separate minimums for the play and the discard.
    #[serde(rename_all = "camelCase")]
    Independent {
        min_played: usize,
        min_discarded: usize,
    },
}

impl DealRequirement {
    pub fn satisfied(&self, played: usize, discarded: usize) -> bool {
        match *self {
            DealRequirement::AnyAcrossBoth => played + discarded > 0,
            DealRequirement::Independent {
                min_played,
                min_discarded,
            } => played >= min_played && discarded >= min_discarded,
        }
    }
}

/// How cards in play turn into a hotel floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BuildRecipe {
    /// Enough active workers build a floor. The crew is used up.
    WorkerCrew { workers: usize },

    /// One material of every block type plus at least one active worker. The
    /// materials are used up, the workers stay.
    MaterialSet,
}

impl Default for BuildRecipe {
    fn default() -> Self {
        BuildRecipe::WorkerCrew { workers: 5 }
    }
}

impl BuildRecipe {
    /// Builds at most one floor out of `in_play`.
    ///
    /// Returns the cards consumed when a floor was built, removing them from
    /// `in_play`. Returns `None` and leaves `in_play` alone otherwise.
    pub fn apply(&self, in_play: &mut Vec<Card>, accidents: &[Accident]) -> Option<Vec<Card>> {
        let consumed: BTreeSet<CardId> = match *self {
            BuildRecipe::WorkerCrew { workers } => {
                let crew: BTreeSet<CardId> = active_workers(in_play, accidents)
                    .take(workers)
                    .map(|worker| worker.id)
                    .collect();
                if crew.len() < workers {
                    return None;
                }
                crew
            }
            BuildRecipe::MaterialSet => {
                if active_workers(in_play, accidents).next().is_none() {
                    return None;
                }
                let mut set = BTreeSet::new();
                for block in BLOCK_TYPES {
                    let material = in_play
                        .iter()
                        .filter_map(Card::as_material)
                        .find(|material| material.block == block)?;
                    set.insert(material.id);
                }
                set
            }
        };

        let (used, rest): (Vec<Card>, Vec<Card>) = in_play
            .drain(..)
            .partition(|card| consumed.contains(&card.id()));
        *in_play = rest;
        Some(used)
    }
}

/// Tunable rules for a match. Every field has a default, so a rules file only
/// needs the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleSet {
    pub hand_limit: usize,
    pub starter_workers: usize,
    pub starter_materials: usize,
    pub floors_to_win: u32,
    pub min_players: usize,
    pub recipe: BuildRecipe,
    pub deal_requirement: DealRequirement,
    /// Bad plays tolerated within one turn before the game is aborted.
    pub max_retries: Option<u32>,
    /// Completed turns after which the game ends without a winner.
    pub max_turns: Option<u32>,
    /// Seed for the card factory. A random one is picked when absent.
    pub seed: Option<u64>,
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet {
            hand_limit: 7,
            starter_workers: 2,
            starter_materials: 5,
            floors_to_win: 1,
            min_players: 2,
            recipe: BuildRecipe::default(),
            deal_requirement: DealRequirement::default(),
            max_retries: None,
            max_turns: None,
            seed: None,
        }
    }
}

impl RuleSet {
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let rules: RuleSet = serde_json::from_str(&text)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_players < 2 {
            return Err(ConfigError::invalid("a game needs at least two players"));
        }
        if self.hand_limit == 0 {
            return Err(ConfigError::invalid("hand limit must be positive"));
        }
        if self.starter_workers + self.starter_materials > self.hand_limit {
            return Err(ConfigError::invalid(format!(
                "starter hand of {} cards does not fit a hand limit of {}",
                self.starter_workers + self.starter_materials,
                self.hand_limit
            )));
        }
        if self.floors_to_win == 0 {
            return Err(ConfigError::invalid("floors to win must be positive"));
        }
        if let BuildRecipe::WorkerCrew { workers: 0 } = self.recipe {
            return Err(ConfigError::invalid("a worker crew needs at least one worker"));
        }
        if let DealRequirement::Independent {
            min_played,
            min_discarded,
        } = self.deal_requirement
        {
            if min_played + min_discarded > self.hand_limit {
                return Err(ConfigError::invalid(
                    "deal requirement asks for more cards than a hand holds",
                ));
            }
        }
        Ok(())
    }
}
