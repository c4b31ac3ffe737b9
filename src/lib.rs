// The Builders Server Library - Core Module Organization
//
// Server-authoritative engine for The Builders, a turn based card game in
// which players race to build a hotel out of workers and materials.

// Cards and the state they live in
pub mod cards;
pub mod enums;
pub mod hand;
pub mod rules;
pub mod state;

// Turn execution
pub mod driver;
pub mod phases;
pub mod session;

// Talking to players
pub mod actions;
pub mod errors;
pub mod player_system;
pub mod players;

// Server implementation
pub mod manager;
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

// Re-export common types for convenient access
pub use crate::actions::{BoardSnapshot, PlayerId, PlayerResponse, ServerMessage, SessionId};
pub use crate::cards::{Card, CardId};
pub use crate::driver::{DriverState, GameOutcome, TurnDriver};
pub use crate::errors::{BuildersError, BuildersResult};
pub use crate::manager::Lobby;
pub use crate::player_system::{channel, ChannelPort, PlayerLink, PlayerPort, Responder};
pub use crate::rules::{BuildRecipe, DealRequirement, RuleSet};
pub use crate::session::{GameSession, SessionHandle, SessionStatus, StateReader};
pub use crate::state::GameState;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
