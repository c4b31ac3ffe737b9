use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Skill {
    /// Placeholder that stands in for every skill.
    Any,
    MetalWorker,
    Electrician,
    Painter,
    Foreman,
    Fitter,
}

/// Skills a drawn worker can have. `Any` is never dealt.
pub const SKILLS: [Skill; 5] = [
    Skill::MetalWorker,
    Skill::Electrician,
    Skill::Painter,
    Skill::Foreman,
    Skill::Fitter,
];

impl Skill {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        SKILLS[rng.gen_range(0..SKILLS.len())]
    }

    /// Whether a worker with this skill can do work that needs `needed`.
    pub fn covers(self, needed: Skill) -> bool {
        self == Skill::Any || needed == Skill::Any || self == needed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockType {
    Glass,
    Insulation,
    Metal,
    Wiring,
    Wood,
}

pub const BLOCK_TYPES: [BlockType; 5] = [
    BlockType::Wiring,
    BlockType::Glass,
    BlockType::Wood,
    BlockType::Metal,
    BlockType::Insulation,
];

impl BlockType {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        BLOCK_TYPES[rng.gen_range(0..BLOCK_TYPES.len())]
    }

    /// The skill a worker needs to handle this material.
    pub fn skill_needed(self) -> Skill {
        match self {
            BlockType::Glass | BlockType::Wood | BlockType::Insulation => Skill::Fitter,
            BlockType::Wiring => Skill::Electrician,
            BlockType::Metal => Skill::MetalWorker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccidentKind {
    /// Takes every worker with the given skill off the job.
    Strike(Skill),
}

impl AccidentKind {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        AccidentKind::Strike(Skill::random(rng))
    }

    /// Number of turns this accident stays in effect.
    pub fn duration(self) -> u32 {
        match self {
            AccidentKind::Strike(_) => 3,
        }
    }
}

/// The kinds of cards a player can ask for during the draw phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardKind {
    Worker,
    Material,
    Accident,
}

/// Player facing names for the parts of a turn that need input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PromptPhase {
    Play,
    Discard,
    Draw,
}
