use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::actions::{BoardSnapshot, PlayerId, SessionId};
use crate::cards::Card;
use crate::driver::{GameOutcome, TurnDriver};
use crate::errors::{SessionError, SessionResult};
use crate::player_system::PlayerPort;
use crate::rules::RuleSet;
use crate::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Configured,
    Running,
    Stopped,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Created => write!(f, "created"),
            SessionStatus::Configured => write!(f, "configured"),
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// No rule set can seat fewer players than this.
const MIN_PLAYERS: usize = 2;

/// A match waiting to be started: the rules plus the players taking part.
pub struct GameSession {
    id: SessionId,
    rules: RuleSet,
    players: Vec<Arc<dyn PlayerPort>>,
    status: SessionStatus,
}

impl GameSession {
    pub fn new(rules: RuleSet) -> Self {
        GameSession {
            id: Uuid::new_v4().to_string(),
            rules,
            players: Vec::new(),
            status: SessionStatus::Created,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Seats the players in turn order.
    pub fn configure(&mut self, players: Vec<Arc<dyn PlayerPort>>) -> SessionResult<()> {
        if self.status != SessionStatus::Created {
            return Err(SessionError::AlreadyConfigured {
                session_id: self.id.clone(),
            });
        }
        let min_players = self.rules.min_players.max(MIN_PLAYERS);
        if players.len() < min_players {
            return Err(SessionError::MinPlayersNotMet {
                min_players,
                actual: players.len(),
            });
        }
        self.rules.validate()?;
        self.players = players;
        self.status = SessionStatus::Configured;
        Ok(())
    }

    /// Deals the opening hands and runs the game on its own task.
    pub fn start(self) -> SessionResult<SessionHandle> {
        if self.status != SessionStatus::Configured {
            return Err(SessionError::NotConfigured {
                session_id: self.id,
            });
        }

        let mut driver = TurnDriver::new(self.players.clone(), self.rules);
        let reader = StateReader::new(driver.subscribe());
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let session_id = self.id.clone();

        log::info!(
            "🚀 Starting session {} with {} players",
            session_id,
            self.players.len()
        );
        tokio::spawn(async move {
            driver.setup();
            let outcome = driver.run().await;
            log::info!("Session {} finished: {:?}", session_id, outcome);
            outcome_tx.send_replace(Some(outcome));
        });

        Ok(SessionHandle {
            id: self.id,
            players: self.players,
            outcome: outcome_rx,
            reader,
        })
    }
}

/// Control over a running match.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    players: Vec<Arc<dyn PlayerPort>>,
    outcome: watch::Receiver<Option<GameOutcome>>,
    reader: StateReader,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        let finished =
            self.outcome.borrow().is_some() || self.outcome.has_changed().is_err();
        if finished {
            SessionStatus::Stopped
        } else {
            SessionStatus::Running
        }
    }

    pub fn players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .map(|port| port.player_id().clone())
            .collect()
    }

    pub fn reader(&self) -> StateReader {
        self.reader.clone()
    }

    /// Hangs up on every player. Any outstanding request fails and the game
    /// aborts. Stopping twice does nothing.
    pub fn stop(&self) {
        if self.players.iter().all(|port| port.is_closed()) {
            return;
        }
        log::info!("🛑 Stopping session {}", self.id);
        for port in &self.players {
            port.close();
        }
    }

    /// Waits for the game to end.
    pub async fn join(&self) -> SessionResult<GameOutcome> {
        let mut outcome = self.outcome.clone();
        let finished = outcome
            .wait_for(Option::is_some)
            .await
            .map(|outcome| outcome.clone());
        match finished {
            Ok(Some(outcome)) => Ok(outcome),
            _ => {
                log::error!("Session {} ended without an outcome", self.id);
                Err(SessionError::SessionGone)
            }
        }
    }
}

/// Read-only view of a session's state for the player side.
///
/// Every read fails with `SessionGone` once the session has been torn down.
#[derive(Clone)]
pub struct StateReader {
    state: watch::Receiver<GameState>,
}

impl StateReader {
    pub fn new(state: watch::Receiver<GameState>) -> Self {
        StateReader { state }
    }

    pub fn is_live(&self) -> bool {
        self.state.has_changed().is_ok()
    }

    fn read<T>(&self, f: impl FnOnce(&GameState) -> SessionResult<T>) -> SessionResult<T> {
        if !self.is_live() {
            return Err(SessionError::SessionGone);
        }
        f(&self.state.borrow())
    }

    pub fn hand(&self, player_id: &str) -> SessionResult<Vec<Card>> {
        self.read(|state| {
            let seat = seat_of(state, player_id)?;
            Ok(state.hands[seat].cards().to_vec())
        })
    }

    pub fn floors(&self, player_id: &str) -> SessionResult<u32> {
        self.read(|state| Ok(state.floors[seat_of(state, player_id)?]))
    }

    pub fn active_player(&self) -> SessionResult<PlayerId> {
        self.read(|state| Ok(state.active_player().clone()))
    }

    pub fn snapshot(&self) -> SessionResult<BoardSnapshot> {
        self.read(|state| Ok(state.snapshot()))
    }
}

fn seat_of(state: &GameState, player_id: &str) -> SessionResult<usize> {
    state
        .seat_of(player_id)
        .ok_or_else(|| SessionError::PlayerNotFound {
            player_id: player_id.to_string(),
        })
}
