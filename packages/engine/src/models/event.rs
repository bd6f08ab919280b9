use serde::{Deserialize, Serialize};

use super::decision::DecisionKind;
use super::game::{GamePhase, Winner};
use super::record::{VoteStage, VotingRecord};
use super::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EliminationCause {
    Night,
    Vote,
}

/// Everything the orchestrator reports to the outside world.
///
/// Public events are safe to show to players. Observer events carry private
/// information (who the mafia picked, who the doctor protected, what the
/// detective learned) and must only reach observer channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum GameEvent {
    GameStarted {
        players: Vec<String>,
    },
    PhaseChanged {
        round: u32,
        from: GamePhase,
        to: GamePhase,
    },
    MafiaProposal {
        round: u32,
        player: String,
        target: String,
        reason: String,
    },
    MafiaConsensus {
        round: u32,
        target: String,
    },
    DoctorProtect {
        round: u32,
        player: String,
        target: String,
        reason: String,
    },
    Investigation {
        round: u32,
        player: String,
        target: String,
        role: Role,
        reason: String,
    },
    NightSave {
        round: u32,
        target: String,
    },
    /// Public night outcome. `eliminated` is `None` both when nobody was
    /// attacked and when the attack was prevented.
    NightResult {
        round: u32,
        eliminated: Option<String>,
    },
    DayStarted {
        round: u32,
        alive: Vec<String>,
    },
    Silence {
        round: u32,
        streak: u8,
    },
    Utterance {
        round: u32,
        speaker: String,
        message: String,
    },
    VoteCast {
        round: u32,
        sub_round: u8,
        stage: VoteStage,
        voter: String,
        target: String,
        reason: String,
    },
    TrialStarted {
        round: u32,
        sub_round: u8,
        subject: String,
        votes: u32,
    },
    VoteTied {
        round: u32,
        sub_round: u8,
        stage: VoteStage,
        candidates: Vec<String>,
        votes: u32,
    },
    Defense {
        round: u32,
        subject: String,
        text: Option<String>,
    },
    PlayerEliminated {
        round: u32,
        player: String,
        cause: EliminationCause,
    },
    VotingRecorded {
        record: VotingRecord,
    },
    AgentFailed {
        round: u32,
        player: String,
        kind: DecisionKind,
        error: String,
    },
    GameOver {
        round: u32,
        winner: Winner,
        elimination_order: Vec<String>,
        roles: Vec<(String, Role)>,
    },
    RoundLimitReached {
        round: u32,
    },
}

impl GameEvent {
    pub fn is_public(&self) -> bool {
        !matches!(
            self,
            GameEvent::MafiaProposal { .. }
                | GameEvent::MafiaConsensus { .. }
                | GameEvent::DoctorProtect { .. }
                | GameEvent::Investigation { .. }
                | GameEvent::NightSave { .. }
                | GameEvent::AgentFailed { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::GameStarted { .. } => "game_started",
            GameEvent::PhaseChanged { .. } => "phase_changed",
            GameEvent::MafiaProposal { .. } => "mafia_proposal",
            GameEvent::MafiaConsensus { .. } => "mafia_consensus",
            GameEvent::DoctorProtect { .. } => "doctor_protect",
            GameEvent::Investigation { .. } => "investigation",
            GameEvent::NightSave { .. } => "night_save",
            GameEvent::NightResult { .. } => "night_result",
            GameEvent::DayStarted { .. } => "day_started",
            GameEvent::Silence { .. } => "silence",
            GameEvent::Utterance { .. } => "utterance",
            GameEvent::VoteCast { .. } => "vote_cast",
            GameEvent::TrialStarted { .. } => "trial_started",
            GameEvent::VoteTied { .. } => "vote_tied",
            GameEvent::Defense { .. } => "defense",
            GameEvent::PlayerEliminated { .. } => "player_eliminated",
            GameEvent::VotingRecorded { .. } => "voting_recorded",
            GameEvent::AgentFailed { .. } => "agent_failed",
            GameEvent::GameOver { .. } => "game_over",
            GameEvent::RoundLimitReached { .. } => "round_limit_reached",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_night_details_are_not_public() {
        let save = GameEvent::NightSave {
            round: 1,
            target: "Ann".to_string(),
        };
        assert!(!save.is_public());

        let result = GameEvent::NightResult {
            round: 1,
            eliminated: None,
        };
        assert!(result.is_public());
    }

    #[test]
    fn events_are_tagged_by_name() {
        let event = GameEvent::Silence { round: 2, streak: 1 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["streak"], 1);
    }
}
