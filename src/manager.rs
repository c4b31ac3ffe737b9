use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::actions::SessionId;
use crate::errors::BuildersResult;
use crate::player_system::PlayerPort;
use crate::rules::RuleSet;
use crate::session::{GameSession, SessionHandle};

/// Pairs up incoming players and keeps track of the games they are in.
pub struct Lobby {
    rules: RuleSet,
    waiting: Mutex<Option<Arc<dyn PlayerPort>>>,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl Lobby {
    pub fn new(rules: RuleSet) -> Arc<Self> {
        Arc::new(Lobby {
            rules,
            waiting: Mutex::new(None),
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Seats a player. Starts a game once a second player shows up.
    ///
    /// Returns the id of the game started, if any.
    pub async fn join(self: &Arc<Self>, port: Arc<dyn PlayerPort>) -> BuildersResult<Option<SessionId>> {
        let opponent = {
            let mut waiting = self.waiting.lock().await;
            match waiting.take() {
                Some(opponent) if !opponent.is_closed() => opponent,
                stale => {
                    if let Some(stale) = stale {
                        log::info!("➖ {} left the lobby before being paired", stale.player_id());
                    }
                    log::info!("⏳ {} is waiting for an opponent", port.player_id());
                    *waiting = Some(port);
                    return Ok(None);
                }
            }
        };

        let mut session = GameSession::new(self.rules.clone());
        session.configure(vec![opponent, port])?;
        let handle = session.start()?;
        let session_id = handle.id().clone();
        log::info!("🤝 Paired players {:?} in session {}", handle.players(), session_id);

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), handle.clone());
        self.reap_when_finished(handle);
        Ok(Some(session_id))
    }

    fn reap_when_finished(self: &Arc<Self>, handle: SessionHandle) {
        let lobby = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = handle.join().await;
            lobby.sessions.write().await.remove(handle.id());
            log::info!("🧹 Removed session {} ({:?})", handle.id(), outcome);
        });
    }

    pub async fn session(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_waiting(&self) -> bool {
        self.waiting
            .lock()
            .await
            .as_ref()
            .is_some_and(|port| !port.is_closed())
    }

    /// Stops every running game.
    pub async fn shutdown(&self) {
        for handle in self.sessions.read().await.values() {
            handle.stop();
        }
        if let Some(port) = self.waiting.lock().await.take() {
            port.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player_system::channel;
    use crate::session::SessionStatus;

    #[tokio::test]
    async fn test_pairs_two_players_and_reaps_finished_games() {
        let lobby = Lobby::new(RuleSet::default());
        let (alice, alice_link) = channel("alice");
        let (bob, _bob_link) = channel("bob");

        assert_eq!(lobby.join(Arc::new(alice)).await.unwrap(), None);
        assert!(lobby.is_waiting().await);

        let session_id = lobby.join(Arc::new(bob)).await.unwrap().unwrap();
        assert!(!lobby.is_waiting().await);
        let handle = lobby.session(&session_id).await.unwrap();
        assert_eq!(handle.players(), vec!["alice".to_string(), "bob".to_string()]);

        drop(alice_link);
        handle.join().await.unwrap();
        assert_eq!(handle.status(), SessionStatus::Stopped);

        while lobby.session_count().await > 0 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_waiting_player_who_left_is_replaced() {
        let lobby = Lobby::new(RuleSet::default());
        let (alice, alice_link) = channel("alice");
        let (bob, _bob_link) = channel("bob");

        lobby.join(Arc::new(alice)).await.unwrap();
        drop(alice_link);
        assert!(!lobby.is_waiting().await);

        assert_eq!(lobby.join(Arc::new(bob)).await.unwrap(), None);
        assert!(lobby.is_waiting().await);
        assert_eq!(lobby.session_count().await, 0);
    }
}
