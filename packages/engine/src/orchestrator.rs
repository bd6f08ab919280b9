//! The phase state machine.
//!
//! `Night -> [judge] -> Day(Discussion -> Voting) -> [judge] -> Night ...`
//! until the judge returns a winner. The orchestrator is the only writer of
//! [`GameState`]; decision makers only ever see a [`PlayerView`] snapshot.

mod discussion;
mod night;
mod voting;

pub use discussion::{rank_speakers, SpeakerBid};
pub use night::consensus;
pub use voting::{plurality, validate_vote};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::agent::DecisionMaker;
use crate::config::GameConfig;
use crate::error::{AgentError, GameError};
use crate::models::{
    DecisionKind, DecisionRequest, EliminationCause, GameEvent, GamePhase, GameState, TrialNote,
    Winner,
};
use crate::services::{judge, FanOut};
use crate::telemetry::EventSink;
use crate::view::{view, PlayerView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "winner")]
pub enum GameOutcome {
    Winner(Winner),
    /// Stopped at the configured round cap without a verdict.
    RoundLimit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameReport {
    pub outcome: GameOutcome,
    pub rounds: u32,
    pub state: GameState,
}

impl GameReport {
    pub fn winner(&self) -> Option<Winner> {
        match self.outcome {
            GameOutcome::Winner(winner) => Some(winner),
            GameOutcome::RoundLimit => None,
        }
    }
}

pub struct Orchestrator {
    state: GameState,
    agents: BTreeMap<String, Arc<dyn DecisionMaker>>,
    config: GameConfig,
    fanout: FanOut,
    sink: Arc<dyn EventSink>,
    rng: StdRng,
}

impl Orchestrator {
    pub fn new(
        state: GameState,
        agents: impl IntoIterator<Item = (String, Arc<dyn DecisionMaker>)>,
        config: GameConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, GameError> {
        state.check_invariants()?;
        let agents: BTreeMap<_, _> = agents.into_iter().collect();
        if let Some(missing) = state.players.iter().find(|p| !agents.contains_key(&p.name)) {
            return Err(GameError::MissingAgent(missing.name.clone()));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let fanout = FanOut::new(config.max_concurrency, config.decision_timeout);

        Ok(Self {
            state,
            agents,
            config,
            fanout,
            sink,
            rng,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Plays until a winner is decided or the round cap is hit.
    pub async fn run(mut self) -> Result<GameReport, GameError> {
        info!(
            "game starting with {} players ({} mafia)",
            self.state.players.len(),
            self.state.mafia_members().len()
        );
        self.emit(GameEvent::GameStarted {
            players: self.state.players.iter().map(|p| p.name.clone()).collect(),
        });

        loop {
            if self.state.round_number > self.config.max_rounds {
                warn!("round cap {} reached without a winner", self.config.max_rounds);
                self.emit(GameEvent::RoundLimitReached {
                    round: self.state.round_number,
                });
                self.enter_phase(GamePhase::GameOver);
                return Ok(self.into_report(GameOutcome::RoundLimit));
            }
            if let Some(winner) = self.play_round().await? {
                info!("game over after round {}: {}", self.state.round_number, winner);
                return Ok(self.into_report(GameOutcome::Winner(winner)));
            }
        }
    }

    /// One full night + day cycle. Returns the winner as soon as one exists.
    pub async fn play_round(&mut self) -> Result<Option<Winner>, GameError> {
        if let Some(winner) = self.state.winner() {
            return Ok(Some(winner));
        }

        self.run_night().await?;
        if let Some(winner) = self.check_winner()? {
            return Ok(Some(winner));
        }

        self.enter_phase(GamePhase::DayDiscussion);
        if let Some(winner) = self.check_winner()? {
            return Ok(Some(winner));
        }
        self.emit(GameEvent::DayStarted {
            round: self.state.round_number,
            alive: self.state.alive_players.clone(),
        });
        self.run_discussion().await?;
        self.run_voting().await?;

        if let Some(winner) = self.check_winner()? {
            return Ok(Some(winner));
        }
        self.state.round_number += 1;
        Ok(None)
    }

    fn into_report(self, outcome: GameOutcome) -> GameReport {
        GameReport {
            outcome,
            rounds: self.state.round_number,
            state: self.state,
        }
    }

    fn check_winner(&mut self) -> Result<Option<Winner>, GameError> {
        let Some(winner) = judge(&self.state)? else {
            return Ok(None);
        };
        self.state.set_winner(winner)?;
        self.enter_phase(GamePhase::GameOver);
        self.emit(GameEvent::GameOver {
            round: self.state.round_number,
            winner,
            elimination_order: self.state.eliminated.clone(),
            roles: self
                .state
                .players
                .iter()
                .map(|p| (p.name.clone(), p.role))
                .collect(),
        });
        Ok(Some(winner))
    }

    fn enter_phase(&mut self, phase: GamePhase) {
        let from = self.state.set_phase(phase);
        if from != phase {
            self.emit(GameEvent::PhaseChanged {
                round: self.state.round_number,
                from,
                to: phase,
            });
        }
    }

    fn emit(&self, event: GameEvent) {
        self.sink.emit(&event);
    }

    fn eliminate(&mut self, name: &str, cause: EliminationCause) -> Result<(), GameError> {
        self.state.eliminate(name)?;
        info!("{} eliminated ({:?})", name, cause);
        self.emit(GameEvent::PlayerEliminated {
            round: self.state.round_number,
            player: name.to_string(),
            cause,
        });
        Ok(())
    }

    fn agent(&self, name: &str) -> Result<Arc<dyn DecisionMaker>, GameError> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| GameError::MissingAgent(name.to_string()))
    }

    fn request(
        &self,
        kind: DecisionKind,
        player: &str,
        candidates: Vec<String>,
        trial: Option<TrialNote>,
    ) -> Result<DecisionRequest, GameError> {
        let view: PlayerView =
            view(&self.state, player).ok_or_else(|| GameError::UnknownPlayer(player.to_string()))?;
        Ok(DecisionRequest {
            kind,
            player: player.to_string(),
            candidates,
            trial,
            view,
        })
    }

    /// A failed decision is an abstention for this step.
    fn abstain(&self, player: &str, kind: DecisionKind, error: &AgentError) {
        warn!("{} abstains from {:?}: {}", player, kind, error);
        self.emit(GameEvent::AgentFailed {
            round: self.state.round_number,
            player: player.to_string(),
            kind,
            error: error.to_string(),
        });
    }
}

/// Maps a free-form target onto the candidate list: exact name first, then a
/// case-insensitive match, then the single candidate whose name appears in
/// the text. Anything ambiguous is `None`.
pub fn match_candidate(raw: &str, candidates: &[String]) -> Option<String> {
    let raw = raw.trim();
    if let Some(exact) = candidates.iter().find(|c| c.as_str() == raw) {
        return Some(exact.clone());
    }
    if let Some(same) = candidates.iter().find(|c| c.eq_ignore_ascii_case(raw)) {
        return Some(same.clone());
    }
    let lowered = raw.to_lowercase();
    let mut contained = candidates
        .iter()
        .filter(|c| lowered.contains(&c.to_lowercase()));
    match (contained.next(), contained.next()) {
        (Some(only), None) => Some(only.clone()),
        _ => None,
    }
}
