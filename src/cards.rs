use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::enums::{AccidentKind, BlockType, CardKind, Skill};

/// Unique identifier for a card within one match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Someone who labors. Workers are always playable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: CardId,
    pub skill: Skill,
}

/// A building block. Needs an active worker with the right skill in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: CardId,
    pub block: BlockType,
}

/// A negative effect that afflicts a player for a limited number of turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accident {
    pub id: CardId,
    pub kind: AccidentKind,
    /// Number of turns this accident has been in effect.
    pub turns: u32,
}

impl Accident {
    pub fn affects_worker(&self, worker: &Worker) -> bool {
        match self.kind {
            AccidentKind::Strike(skill) => skill.covers(worker.skill),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.turns >= self.kind.duration()
    }

    pub fn aged(self) -> Self {
        Accident {
            turns: self.turns + 1,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "playType", rename_all = "camelCase")]
pub enum Card {
    Worker(Worker),
    Material(Material),
    Accident(Accident),
}

impl Card {
    pub fn id(&self) -> CardId {
        match self {
            Card::Worker(worker) => worker.id,
            Card::Material(material) => material.id,
            Card::Accident(accident) => accident.id,
        }
    }

    pub fn kind(&self) -> CardKind {
        match self {
            Card::Worker(_) => CardKind::Worker,
            Card::Material(_) => CardKind::Material,
            Card::Accident(_) => CardKind::Accident,
        }
    }

    pub fn as_worker(&self) -> Option<&Worker> {
        match self {
            Card::Worker(worker) => Some(worker),
            _ => None,
        }
    }

    pub fn as_material(&self) -> Option<&Material> {
        match self {
            Card::Material(material) => Some(material),
            _ => None,
        }
    }

    /// Whether the owner of `in_play`, afflicted by `accidents`, may play this card.
    ///
    /// Always evaluated against the state before anything in the current
    /// selection is committed, so a worker played alongside a material does
    /// not make that material legal.
    pub fn can_play(&self, in_play: &[Card], accidents: &[Accident]) -> bool {
        match self {
            Card::Worker(_) | Card::Accident(_) => true,
            Card::Material(material) => active_workers(in_play, accidents)
                .any(|worker| worker.skill.covers(material.block.skill_needed())),
        }
    }
}

/// Workers in play that are not taken off the job by an accident.
pub fn active_workers<'a>(
    in_play: &'a [Card],
    accidents: &'a [Accident],
) -> impl Iterator<Item = &'a Worker> + 'a {
    in_play
        .iter()
        .filter_map(Card::as_worker)
        .filter(move |worker| !accidents.iter().any(|a| a.affects_worker(worker)))
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Card::Worker(w) => write!(f, "Worker{} ({:?})", w.id, w.skill),
            Card::Material(m) => write!(f, "Material{} ({:?})", m.id, m.block),
            Card::Accident(a) => write!(f, "Accident{} ({:?}, {} turns)", a.id, a.kind, a.turns),
        }
    }
}

/// Randomized, seedable source of new cards.
///
/// Each card's attributes come from an RNG seeded with the factory seed and
/// the card id, so the factory is plain data that clones and compares exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFactory {
    seed: u64,
    next_id: u64,
}

impl CardFactory {
    pub fn new(seed: u64) -> Self {
        CardFactory { seed, next_id: 0 }
    }

    /// Number of cards created so far. Ids run from 0 to this value.
    pub fn created(&self) -> u64 {
        self.next_id
    }

    pub fn draw(&mut self, kind: CardKind) -> Card {
        let id = self.allocate();
        let mut rng = self.rng_for(id);
        match kind {
            CardKind::Worker => Card::Worker(Worker {
                id,
                skill: Skill::random(&mut rng),
            }),
            CardKind::Material => Card::Material(Material {
                id,
                block: BlockType::random(&mut rng),
            }),
            CardKind::Accident => Card::Accident(Accident {
                id,
                kind: AccidentKind::random(&mut rng),
                turns: 0,
            }),
        }
    }

    fn allocate(&mut self) -> CardId {
        let id = CardId(self.next_id);
        self.next_id += 1;
        id
    }

    fn rng_for(&self, id: CardId) -> XorShiftRng {
        XorShiftRng::seed_from_u64(self.seed ^ id.0.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}
