use futures::stream::{self, TryStreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::actions::{PlayerResponse, ServerMessage};
use crate::cards::{Accident, Card};
use crate::enums::PromptPhase;
use crate::errors::{InteractionError, TurnError, TurnResult};
use crate::hand::Hand;
use crate::player_system::PlayerPort;
use crate::rules::RuleSet;
use crate::state::{GameState, Seat};

/// One step of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Tells the active player their turn has begun.
    Start,
    /// Clears the active player's expired accidents.
    Count,
    /// The active player plays and discards cards.
    Deal,
    /// Turns cards in play into hotel floors.
    Build,
    /// The active player refills their hand.
    Draw,
    /// Tells the active player their turn is over and ages their accidents.
    End,
}

/// What a phase can see besides the state it transforms.
pub struct TurnContext<'a> {
    pub players: &'a [Arc<dyn PlayerPort>],
    pub rules: &'a RuleSet,
}

impl TurnContext<'_> {
    pub fn port(&self, seat: Seat) -> &dyn PlayerPort {
        self.players[seat].as_ref()
    }

    /// Broadcasts the public part of `state` to every player.
    pub fn sync(&self, state: &GameState) {
        let snapshot = state.snapshot();
        for port in self.players {
            if let Err(err) = port.send(ServerMessage::StateSync(snapshot.clone())) {
                log::warn!("Could not sync state: {}", err);
            }
        }
    }
}

impl Phase {
    /// Whether players see a state sync after this phase.
    pub fn is_visible(self) -> bool {
        matches!(self, Phase::Deal | Phase::Draw)
    }

    pub async fn execute(self, ctx: &TurnContext<'_>, state: GameState) -> TurnResult<GameState> {
        log::debug!("Phase {:?} for {}", self, state.active_player());
        let state = match self {
            Phase::Start => start(ctx, state),
            Phase::Count => count(state),
            Phase::Deal => deal(ctx, state).await?,
            Phase::Build => build(ctx, state),
            Phase::Draw => draw(ctx, state).await?,
            Phase::End => end(ctx, state),
        };
        if self.is_visible() {
            ctx.sync(&state);
        }
        Ok(state)
    }
}

/// Threads `state` through `phases` in order, stopping at the first failure.
pub async fn run_phases(
    phases: &[Phase],
    ctx: &TurnContext<'_>,
    state: GameState,
) -> TurnResult<GameState> {
    stream::iter(phases.iter().copied().map(Ok))
        .try_fold(state, move |state, phase| phase.execute(ctx, state))
        .await
}

/// The ordered phases of a turn and the point retries resume from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    phases: Vec<Phase>,
    checkpoint: usize,
}

impl Pipeline {
    pub fn standard() -> Self {
        Pipeline {
            phases: vec![
                Phase::Start,
                Phase::Count,
                Phase::Deal,
                Phase::Build,
                Phase::Draw,
                Phase::End,
            ],
            checkpoint: 2,
        }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Phases run once per turn, before the checkpoint.
    pub fn prefix(&self) -> &[Phase] {
        &self.phases[..self.checkpoint]
    }

    /// Phases re-run from the checkpoint after a bad play.
    pub fn retryable(&self) -> &[Phase] {
        &self.phases[self.checkpoint..]
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::standard()
    }
}

fn start(ctx: &TurnContext<'_>, state: GameState) -> GameState {
    if let Err(err) = ctx.port(state.active()).send(ServerMessage::TurnStart) {
        log::warn!("Could not announce turn: {}", err);
    }
    state
}

fn count(mut state: GameState) -> GameState {
    let seat = state.active();
    let (expired, active): (Vec<Accident>, Vec<Accident>) =
        std::mem::take(&mut state.accidents[seat])
            .into_iter()
            .partition(Accident::is_expired);
    for accident in &expired {
        log::debug!(
            "{:?} against {} has run its course",
            accident.kind,
            state.players[seat]
        );
    }
    state.discard.extend(expired.iter().map(|accident| accident.id));
    state.accidents[seat] = active;
    state
}

async fn deal(ctx: &TurnContext<'_>, mut state: GameState) -> TurnResult<GameState> {
    let seat = state.active();
    let port = ctx.port(seat);
    let limit = state.hands[seat].limit();

    let reply = port
        .request(ServerMessage::TurnPrompt {
            phase: PromptPhase::Play,
            hand: state.hands[seat].cards().to_vec(),
        })
        .await
        .map_err(misunderstood)?;
    let positions = selection(reply, PromptPhase::Play, state.hands[seat].len())?;
    let (played, kept) = state.hands[seat].split_positions(&positions);

    // Every card is judged against the board as it was before this play.
    if let Some(card) = played
        .iter()
        .find(|card| !card.can_play(&state.in_play[seat], &state.accidents[seat]))
    {
        return Err(TurnError::bad_play(format!("You can't play {card} right now")));
    }

    let remaining = Hand::with_cards(limit, kept);
    let reply = port
        .request(ServerMessage::TurnPrompt {
            phase: PromptPhase::Discard,
            hand: remaining.cards().to_vec(),
        })
        .await
        .map_err(misunderstood)?;
    let positions = selection(reply, PromptPhase::Discard, remaining.len())?;
    let (discarded, kept) = remaining.split_positions(&positions);

    if !ctx
        .rules
        .deal_requirement
        .satisfied(played.len(), discarded.len())
    {
        return Err(TurnError::bad_play("You must do something!"));
    }

    let target = state.next_seat(seat);
    for card in played {
        match card {
            Card::Accident(accident) => {
                log::info!(
                    "💥 {} hits {} with {:?}",
                    state.players[seat],
                    state.players[target],
                    accident.kind
                );
                state.accidents[target].push(accident);
            }
            card => state.in_play[seat].push(card),
        }
    }
    state.discard.extend(discarded.iter().map(Card::id));
    state.hands[seat] = Hand::with_cards(limit, kept);
    Ok(state)
}

fn build(ctx: &TurnContext<'_>, mut state: GameState) -> GameState {
    let seat = state.active();
    if let Some(used) = ctx
        .rules
        .recipe
        .apply(&mut state.in_play[seat], &state.accidents[seat])
    {
        state.discard.extend(used.iter().map(Card::id));
        state.add_floor(seat);
        log::info!(
            "🏨 {} built floor {} using {} cards",
            state.players[seat],
            state.floors[seat],
            used.len()
        );
    }
    state
}

async fn draw(ctx: &TurnContext<'_>, mut state: GameState) -> TurnResult<GameState> {
    let seat = state.active();
    let port = ctx.port(seat);
    while state.hands[seat].shortfall() > 0 {
        let reply = port
            .request(ServerMessage::TurnPrompt {
                phase: PromptPhase::Draw,
                hand: state.hands[seat].cards().to_vec(),
            })
            .await;
        match reply {
            Ok(PlayerResponse::Draw(kind)) => {
                let card = state.factory.draw(kind);
                state.hands[seat].push(card);
            }
            Ok(other) => log::debug!("Expected a draw from {}, got {:?}", port.player_id(), other),
            Err(InteractionError::MalformedResponse { details, .. }) => {
                log::debug!("Unreadable draw from {}: {}", port.player_id(), details)
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(state)
}

fn end(ctx: &TurnContext<'_>, mut state: GameState) -> GameState {
    let seat = state.active();
    if let Err(err) = ctx.port(seat).send(ServerMessage::TurnEnd) {
        log::warn!("Could not end turn: {}", err);
    }
    for accident in state.accidents[seat].iter_mut() {
        *accident = accident.aged();
    }
    state
}

/// A reply the deal phase could not read counts as an illegal move.
fn misunderstood(err: InteractionError) -> TurnError {
    match err {
        InteractionError::MalformedResponse { .. } => {
            TurnError::bad_play("Could not understand your response")
        }
        other => other.into(),
    }
}

/// Turns the 1-based positions of a reply into 0-based hand positions.
///
/// A reply for the wrong prompt selects nothing.
fn selection(
    reply: PlayerResponse,
    expected: PromptPhase,
    hand_len: usize,
) -> TurnResult<BTreeSet<usize>> {
    let positions = match (expected, reply) {
        (PromptPhase::Play, PlayerResponse::Play(positions))
        | (PromptPhase::Discard, PlayerResponse::Discard(positions)) => positions,
        (_, other) => {
            log::debug!("Expected a {:?} reply, got {:?}", expected, other);
            Vec::new()
        }
    };

    positions
        .into_iter()
        .map(|position| {
            if position == 0 || position > hand_len {
                Err(TurnError::bad_play(format!(
                    "There is no card at position {position}"
                )))
            } else {
                Ok(position - 1)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardId, Material, Worker};
    use crate::enums::{AccidentKind, BlockType, CardKind, Skill};
    use crate::testing::{discard, play, ports, ScriptedPort};

    fn worker(id: u64, skill: Skill) -> Card {
        Card::Worker(Worker {
            id: CardId(id),
            skill,
        })
    }

    fn material(id: u64, block: BlockType) -> Card {
        Card::Material(Material {
            id: CardId(id),
            block,
        })
    }

    fn state_with_hand(cards: Vec<Card>) -> GameState {
        let mut state = GameState::new(vec!["alice".to_string(), "bob".to_string()], 7, 3);
        // Leave room in the factory's id space for the hand built by hand.
        for _ in 0..cards.len() {
            state.factory.draw(CardKind::Worker);
        }
        state.hands[0] = Hand::with_cards(7, cards);
        state
    }

    #[tokio::test]
    async fn test_deal_rejects_whole_play_on_illegal_material() {
        let alice = ScriptedPort::new("alice", vec![play(&[1, 2])]);
        let bob = ScriptedPort::silent("bob");
        let players = ports(&[alice.clone(), bob]);
        let rules = RuleSet::default();
        let ctx = TurnContext {
            players: &players,
            rules: &rules,
        };

        // The worker played alongside does not make the wiring legal.
        let state = state_with_hand(vec![
            worker(0, Skill::Electrician),
            material(1, BlockType::Wiring),
        ]);
        let result = Phase::Deal.execute(&ctx, state).await;

        assert!(matches!(result, Err(TurnError::BadPlay { .. })));
        assert_eq!(alice.prompts(), 1);
    }

    #[tokio::test]
    async fn test_deal_moves_cards_and_targets_next_player() {
        let alice = ScriptedPort::new("alice", vec![play(&[1, 3, 3]), discard(&[1])]);
        let bob = ScriptedPort::silent("bob");
        let players = ports(&[alice.clone(), bob.clone()]);
        let rules = RuleSet::default();
        let ctx = TurnContext {
            players: &players,
            rules: &rules,
        };

        let strike = Accident {
            id: CardId(2),
            kind: AccidentKind::Strike(Skill::Painter),
            turns: 0,
        };
        let state = state_with_hand(vec![
            worker(0, Skill::Fitter),
            material(1, BlockType::Wood),
            Card::Accident(strike),
        ]);
        let state = Phase::Deal.execute(&ctx, state).await.unwrap();

        assert_eq!(state.in_play[0], vec![worker(0, Skill::Fitter)]);
        assert_eq!(state.accidents[1], vec![strike]);
        assert_eq!(state.discard, vec![CardId(1)]);
        assert!(state.hands[0].is_empty());
        assert!(matches!(
            bob.sent().last(),
            Some(ServerMessage::StateSync(_))
        ));
    }

    #[tokio::test]
    async fn test_deal_requires_doing_something() {
        let alice = ScriptedPort::new("alice", vec![play(&[]), discard(&[])]);
        let players = ports(&[alice, ScriptedPort::silent("bob")]);
        let rules = RuleSet::default();
        let ctx = TurnContext {
            players: &players,
            rules: &rules,
        };

        let result = Phase::Deal
            .execute(&ctx, state_with_hand(vec![worker(0, Skill::Painter)]))
            .await;
        assert_eq!(result, Err(TurnError::bad_play("You must do something!")));
    }

    #[tokio::test]
    async fn test_deal_treats_bad_replies_as_bad_plays() {
        let rules = RuleSet::default();
        let hand = vec![worker(0, Skill::Painter)];

        let garbled = ScriptedPort::raw("alice", vec!["{\"play\":\"everything\"}".to_string()]);
        let players = ports(&[garbled, ScriptedPort::silent("bob")]);
        let ctx = TurnContext {
            players: &players,
            rules: &rules,
        };
        let result = Phase::Deal.execute(&ctx, state_with_hand(hand.clone())).await;
        assert!(matches!(result, Err(TurnError::BadPlay { .. })));

        let out_of_range = ScriptedPort::new("alice", vec![play(&[2])]);
        let players = ports(&[out_of_range, ScriptedPort::silent("bob")]);
        let ctx = TurnContext {
            players: &players,
            rules: &rules,
        };
        let result = Phase::Deal.execute(&ctx, state_with_hand(hand)).await;
        assert_eq!(
            result,
            Err(TurnError::bad_play("There is no card at position 2"))
        );
    }

    #[tokio::test]
    async fn test_wrong_reply_kind_selects_nothing() {
        let alice = ScriptedPort::new(
            "alice",
            vec![PlayerResponse::Draw(CardKind::Worker), discard(&[1])],
        );
        let players = ports(&[alice, ScriptedPort::silent("bob")]);
        let rules = RuleSet::default();
        let ctx = TurnContext {
            players: &players,
            rules: &rules,
        };

        let state = Phase::Deal
            .execute(&ctx, state_with_hand(vec![worker(0, Skill::Painter)]))
            .await
            .unwrap();
        assert!(state.in_play[0].is_empty());
        assert_eq!(state.discard, vec![CardId(0)]);
    }

    #[tokio::test]
    async fn test_draw_refills_and_skips_unreadable_replies() {
        let alice = ScriptedPort::raw(
            "alice",
            vec![
                r#"{"draw":"worker"}"#.to_string(),
                "gibberish".to_string(),
                r#"{"play":[1]}"#.to_string(),
                r#"{"draw":"material"}"#.to_string(),
            ],
        );
        let players = ports(&[alice.clone(), ScriptedPort::silent("bob")]);
        let rules = RuleSet {
            hand_limit: 2,
            ..RuleSet::default()
        };
        let ctx = TurnContext {
            players: &players,
            rules: &rules,
        };

        let state = GameState::new(vec!["alice".to_string(), "bob".to_string()], 2, 9);
        let state = Phase::Draw.execute(&ctx, state).await.unwrap();

        let kinds: Vec<CardKind> = state.hands[0].cards().iter().map(Card::kind).collect();
        assert_eq!(kinds, vec![CardKind::Worker, CardKind::Material]);
        assert_eq!(alice.prompts(), 4);
        assert_eq!(alice.remaining(), 0);
    }

    #[tokio::test]
    async fn test_draw_fails_when_channel_closes() {
        let alice = ScriptedPort::new("alice", vec![PlayerResponse::Draw(CardKind::Worker)]);
        let players = ports(&[alice, ScriptedPort::silent("bob")]);
        let rules = RuleSet::default();
        let ctx = TurnContext {
            players: &players,
            rules: &rules,
        };

        let state = GameState::new(vec!["alice".to_string(), "bob".to_string()], 7, 9);
        let result = Phase::Draw.execute(&ctx, state).await;
        assert_eq!(
            result,
            Err(TurnError::Interaction(InteractionError::channel_closed(
                "alice"
            )))
        );
    }

    #[tokio::test]
    async fn test_count_and_end_age_accidents() {
        let players = ports(&[ScriptedPort::silent("alice"), ScriptedPort::silent("bob")]);
        let rules = RuleSet::default();
        let ctx = TurnContext {
            players: &players,
            rules: &rules,
        };

        let mut state = GameState::new(vec!["alice".to_string(), "bob".to_string()], 7, 9);
        state.accidents[0].push(Accident {
            id: CardId(0),
            kind: AccidentKind::Strike(Skill::Fitter),
            turns: 0,
        });
        state.accidents[1].push(Accident {
            id: CardId(1),
            kind: AccidentKind::Strike(Skill::Fitter),
            turns: 0,
        });

        let mut turns_survived = 0;
        while !state.accidents[0].is_empty() {
            state = run_phases(&[Phase::Count, Phase::End], &ctx, state)
                .await
                .unwrap();
            if !state.accidents[0].is_empty() {
                turns_survived += 1;
            }
        }
        assert_eq!(turns_survived, 3);
        assert_eq!(state.discard, vec![CardId(0)]);
        // Only the active player's accidents age.
        assert_eq!(state.accidents[1][0].turns, 0);
    }

    #[tokio::test]
    async fn test_phase_composition_is_associative() {
        let rules = RuleSet::default();
        let players = ports(&[ScriptedPort::silent("alice"), ScriptedPort::silent("bob")]);
        let ctx = TurnContext {
            players: &players,
            rules: &rules,
        };

        let mut state = GameState::new(vec!["alice".to_string(), "bob".to_string()], 7, 5);
        for _ in 0..5 {
            let card = state.factory.draw(CardKind::Worker);
            state.in_play[0].push(card);
        }
        state.accidents[0].push(Accident {
            id: CardId(5),
            kind: AccidentKind::Strike(Skill::Foreman),
            turns: 3,
        });
        state.factory.draw(CardKind::Accident);

        let phases = [Phase::Start, Phase::Count, Phase::Build, Phase::End];
        let whole = run_phases(&phases, &ctx, state.clone()).await.unwrap();

        let left = run_phases(&phases[..2], &ctx, state.clone()).await.unwrap();
        let left = run_phases(&phases[2..], &ctx, left).await.unwrap();

        let right = run_phases(&phases[..1], &ctx, state.clone()).await.unwrap();
        let right = run_phases(&phases[1..], &ctx, right).await.unwrap();

        assert_eq!(whole, left);
        assert_eq!(whole, right);
        assert_eq!(whole.floors[0], 1);
        assert_eq!(whole.card_ids(), state.card_ids());
    }

    #[test]
    fn test_standard_pipeline_checkpoint() {
        let pipeline = Pipeline::standard();
        assert_eq!(pipeline.prefix(), &[Phase::Start, Phase::Count]);
        assert_eq!(pipeline.retryable()[0], Phase::Deal);
        assert_eq!(pipeline.phases().len(), 6);
    }
}
