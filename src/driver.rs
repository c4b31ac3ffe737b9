use futures::future::{self, FutureExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::actions::{PlayerId, ServerMessage};
use crate::enums::CardKind;
use crate::errors::{InteractionError, TurnError, TurnResult};
use crate::phases::{run_phases, Pipeline, TurnContext};
use crate::player_system::PlayerPort;
use crate::rules::RuleSet;
use crate::state::GameState;

/// How a game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GameOutcome {
    /// Everyone who reached the winning number of floors. Ties are allowed.
    Winners { players: Vec<PlayerId> },
    /// Nobody won within the configured number of turns.
    TurnLimit { turns: u32 },
    /// A player left or misbehaved beyond recovery.
    Aborted { reason: String },
}

impl GameOutcome {
    pub fn winners(&self) -> &[PlayerId] {
        match self {
            GameOutcome::Winners { players } => players,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Finished(GameOutcome),
}

/// Owns the game state of one match and drives it turn by turn.
pub struct TurnDriver {
    players: Vec<Arc<dyn PlayerPort>>,
    rules: RuleSet,
    pipeline: Pipeline,
    state: GameState,
    turns: u32,
    publisher: watch::Sender<GameState>,
}

impl TurnDriver {
    pub fn new(players: Vec<Arc<dyn PlayerPort>>, rules: RuleSet) -> Self {
        let seed = rules.seed.unwrap_or_else(rand::random);
        let ids = players.iter().map(|p| p.player_id().clone()).collect();
        let state = GameState::new(ids, rules.hand_limit, seed);
        Self::with_state(players, rules, state)
    }

    /// Resumes from an existing state, seats matching `players` in order.
    pub fn with_state(players: Vec<Arc<dyn PlayerPort>>, rules: RuleSet, state: GameState) -> Self {
        let (publisher, _) = watch::channel(state.clone());
        TurnDriver {
            players,
            rules,
            pipeline: Pipeline::standard(),
            state,
            turns: 0,
            publisher,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    /// Receives every state the driver settles on. Closes when the driver is dropped.
    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.publisher.subscribe()
    }

    /// Deals the starter hands and greets every player.
    pub fn setup(&mut self) {
        for seat in 0..self.state.player_count() {
            let starter = std::iter::repeat(CardKind::Worker)
                .take(self.rules.starter_workers)
                .chain(std::iter::repeat(CardKind::Material).take(self.rules.starter_materials));
            for kind in starter {
                let card = self.state.factory.draw(kind);
                self.state.hands[seat].push(card);
            }
        }

        for port in &self.players {
            let greeting = ServerMessage::GameStart {
                player_id: port.player_id().clone(),
            };
            if let Err(err) = port.send(greeting) {
                log::warn!("Could not greet player: {}", err);
            }
        }
        self.publish();
        log::info!("🎲 Game started with players {:?}", self.state.players);
    }

    /// Players whose hotels reached the winning height.
    pub fn winners(&self) -> Vec<PlayerId> {
        self.state
            .winners(self.rules.floors_to_win)
            .into_iter()
            .map(|seat| self.state.players[seat].clone())
            .collect()
    }

    /// Checks for winners, then plays one full turn.
    pub async fn next_turn(&mut self) -> DriverState {
        let winners = self.winners();
        if !winners.is_empty() {
            return DriverState::Finished(GameOutcome::Winners { players: winners });
        }
        if let Some(limit) = self.rules.max_turns {
            if self.turns >= limit {
                return DriverState::Finished(GameOutcome::TurnLimit { turns: self.turns });
            }
        }

        let result = {
            let turn = self.play_turn();
            let severed = any_closed(&self.players);
            tokio::select! {
                result = turn => result,
                player_id = severed => Err(InteractionError::channel_closed(player_id).into()),
            }
        };

        match result {
            Ok(mut state) => {
                state.rotate();
                self.state = state;
                self.turns += 1;
                self.publish();
                DriverState::Running
            }
            Err(err) => {
                log::error!("❌ Aborting game: {}", err);
                DriverState::Finished(GameOutcome::Aborted {
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Plays turns until the game is over, then tells everyone and hangs up.
    pub async fn run(mut self) -> GameOutcome {
        let outcome = loop {
            if let DriverState::Finished(outcome) = self.next_turn().await {
                break outcome;
            }
        };
        self.finish(&outcome);
        outcome
    }

    /// Runs the turn once up to the checkpoint, then retries the rest from a
    /// copy of the checkpoint state until it succeeds.
    async fn play_turn(&self) -> TurnResult<GameState> {
        let ctx = TurnContext {
            players: &self.players,
            rules: &self.rules,
        };
        let checkpoint = run_phases(self.pipeline.prefix(), &ctx, self.state.clone()).await?;

        let mut attempts = 0;
        loop {
            match run_phases(self.pipeline.retryable(), &ctx, checkpoint.clone()).await {
                Err(err) if err.is_recoverable() => {
                    attempts += 1;
                    let reason = err.into_reason();
                    log::info!(
                        "↩️ Bad play by {} ({}), rolling back",
                        checkpoint.active_player(),
                        reason
                    );
                    ctx.port(checkpoint.active())
                        .send(ServerMessage::PlayError { reason })?;
                    if self.rules.max_retries.is_some_and(|max| attempts >= max) {
                        return Err(TurnError::RetriesExhausted { attempts });
                    }
                }
                result => return result,
            }
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    fn finish(&self, outcome: &GameOutcome) {
        log::info!("🏁 Game over after {} turns: {:?}", self.turns, outcome);
        let message = ServerMessage::GameOver {
            winners: outcome.winners().to_vec(),
            floors: self.state.floors_by_player(),
        };
        for port in &self.players {
            if !port.is_closed() {
                if let Err(err) = port.send(message.clone()) {
                    log::debug!("Could not deliver game over: {}", err);
                }
            }
            port.close();
        }
    }
}

/// Resolves with the id of the first player whose channel is severed.
async fn any_closed(players: &[Arc<dyn PlayerPort>]) -> PlayerId {
    if players.is_empty() {
        return future::pending().await;
    }
    let watchers = players
        .iter()
        .map(|port| async move {
            port.closed().await;
            port.player_id().clone()
        }
        .boxed());
    let (player_id, _, _) = future::select_all(watchers).await;
    player_id
}
