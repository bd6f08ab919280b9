use chrono::{DateTime, Utc};
use mafia_engine::models::{GameEvent, GamePhase, Role, Winner};
use mafia_engine::GameOutcome;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Running,
    Finished,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSpec {
    pub name: String,
    #[serde(default)]
    pub personality: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartGameRequest {
    pub players: Option<Vec<PlayerSpec>>,
    pub num_mafia: Option<usize>,
    pub max_discussion_rounds: Option<usize>,
    pub seed: Option<u64>,
    /// Play with scripted agents instead of the model.
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartGameResponse {
    pub game_id: String,
    pub players: Vec<String>,
    pub decision_source: String,
}

/// What spectators may see about a game. Roles only appear once it is over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummary {
    pub game_id: String,
    pub status: GameStatus,
    pub started_at: DateTime<Utc>,
    pub decision_source: String,
    pub players: Vec<String>,
    pub round: u32,
    pub phase: GamePhase,
    pub alive: Vec<String>,
    pub eliminated: Vec<String>,
    pub winner: Option<Winner>,
    pub outcome: Option<GameOutcome>,
    pub roles: Option<Vec<(String, Role)>>,
    pub log_dir: Option<String>,
    pub error: Option<String>,
}

impl GameSummary {
    pub fn new(game_id: String, players: Vec<String>, decision_source: String) -> Self {
        Self {
            game_id,
            status: GameStatus::Running,
            started_at: Utc::now(),
            decision_source,
            alive: players.clone(),
            players,
            round: 1,
            phase: GamePhase::Night,
            eliminated: Vec::new(),
            winner: None,
            outcome: None,
            roles: None,
            log_dir: None,
            error: None,
        }
    }

    /// Folds one public event into the summary.
    pub fn apply(&mut self, event: &GameEvent) {
        match event {
            GameEvent::PhaseChanged { round, to, .. } => {
                self.round = *round;
                self.phase = *to;
            }
            GameEvent::DayStarted { round, alive } => {
                self.round = *round;
                self.alive = alive.clone();
            }
            GameEvent::PlayerEliminated { player, .. } => {
                self.alive.retain(|n| n != player);
                if !self.eliminated.contains(player) {
                    self.eliminated.push(player.clone());
                }
            }
            GameEvent::GameOver {
                round,
                winner,
                roles,
                ..
            } => {
                self.round = *round;
                self.winner = Some(*winner);
                self.roles = Some(roles.clone());
            }
            GameEvent::RoundLimitReached { round } => self.round = *round,
            _ => {}
        }
    }

    pub fn finish(&mut self, outcome: GameOutcome) {
        self.status = GameStatus::Finished;
        self.outcome = Some(outcome);
        self.phase = GamePhase::GameOver;
    }

    pub fn fail(&mut self, error: String) {
        self.status = GameStatus::Failed;
        self.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mafia_engine::models::EliminationCause;

    #[test]
    fn summary_tracks_eliminations() {
        let mut summary = GameSummary::new(
            "g".into(),
            vec!["Sam".into(), "Zoe".into(), "Boris".into()],
            "offline".into(),
        );
        summary.apply(&GameEvent::PlayerEliminated {
            round: 1,
            player: "Zoe".into(),
            cause: EliminationCause::Night,
        });
        assert_eq!(summary.alive, vec!["Sam", "Boris"]);
        assert_eq!(summary.eliminated, vec!["Zoe"]);
        assert!(summary.roles.is_none());
    }
}
