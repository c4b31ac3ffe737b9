use thiserror::Error;

use crate::actions::{PlayerId, SessionId};

/// Top-level error type for the Builders server
#[derive(Error, Debug)]
pub enum BuildersError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while talking to a single player
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    #[error("Channel closed for player {player_id}")]
    ChannelClosed { player_id: PlayerId },

    #[error("Malformed response from player {player_id}: {details}")]
    MalformedResponse { player_id: PlayerId, details: String },

    #[error("Player {player_id} already has a request outstanding")]
    RequestPending { player_id: PlayerId },
}

/// Failures raised by a phase and interpreted by the turn driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// The player submitted something illegal. The turn is rolled back and retried.
    #[error("Bad play: {reason}")]
    BadPlay { reason: String },

    #[error("Gave up after {attempts} bad plays")]
    RetriesExhausted { attempts: u32 },

    #[error(transparent)]
    Interaction(#[from] InteractionError),
}

/// Game session lifecycle errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Minimum players not met: need {min_players}, got {actual}")]
    MinPlayersNotMet { min_players: usize, actual: usize },

    #[error("Session {session_id} has no players assigned")]
    NotConfigured { session_id: SessionId },

    #[error("Session {session_id} was already configured")]
    AlreadyConfigured { session_id: SessionId },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: PlayerId },

    #[error("Session is gone")]
    SessionGone,

    #[error("Session rules rejected: {0}")]
    Config(#[from] ConfigError),
}

/// Rule set and command line configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse rules file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid rules: {details}")]
    Invalid { details: String },
}

/// Result type aliases for convenience
pub type BuildersResult<T> = Result<T, BuildersError>;
pub type InteractionResult<T> = Result<T, InteractionError>;
pub type TurnResult<T> = Result<T, TurnError>;
pub type SessionResult<T> = Result<T, SessionError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Helper methods for creating common errors
impl InteractionError {
    pub fn channel_closed(player_id: impl Into<PlayerId>) -> Self {
        Self::ChannelClosed {
            player_id: player_id.into(),
        }
    }

    pub fn malformed(player_id: impl Into<PlayerId>, details: impl Into<String>) -> Self {
        Self::MalformedResponse {
            player_id: player_id.into(),
            details: details.into(),
        }
    }
}

impl TurnError {
    pub fn bad_play(reason: impl Into<String>) -> Self {
        Self::BadPlay {
            reason: reason.into(),
        }
    }

    /// Whether the driver should roll back and retry instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TurnError::BadPlay { .. })
    }

    /// What to tell the player about this error.
    pub fn into_reason(self) -> String {
        match self {
            TurnError::BadPlay { reason } => reason,
            other => other.to_string(),
        }
    }
}

impl ConfigError {
    pub fn invalid(details: impl Into<String>) -> Self {
        Self::Invalid {
            details: details.into(),
        }
    }
}
