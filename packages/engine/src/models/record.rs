use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::{NightActionKind, Role};

/// One public discussion message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Utterance {
    pub round: u32,
    pub speaker: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A participant's own night action, kept for their later recollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NightActionRecord {
    pub round: u32,
    pub kind: NightActionKind,
    pub target: String,
    pub reason: String,
    /// Only set on investigations.
    pub finding: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestigationFinding {
    pub round: u32,
    pub target: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    NightSave,
    NightSummary,
    Elimination,
    Defense,
}

/// Game-level audit trail. Internal: it may name the saved player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub round: u32,
    pub kind: AuditKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoteStage {
    Initial,
    Final,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteCast {
    pub voter: String,
    pub target: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "result", content = "players")]
pub enum VotingOutcome {
    Eliminated(String),
    /// Initial vote tied; the day moves on to the next sub-round (or ends).
    InitialTie,
    /// Final vote after the defense tied; nobody is eliminated today.
    FinalTie(Vec<String>),
    NoVotes,
}

/// Full record of one voting sub-round. Appended once, never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VotingRecord {
    pub day: u32,
    pub sub_round: u8,
    pub votes: Vec<VoteCast>,
    pub trial: Option<String>,
    pub tied: Vec<String>,
    pub top_votes: u32,
    pub defense: Option<String>,
    pub final_votes: Vec<VoteCast>,
    pub outcome: VotingOutcome,
}

impl VotingRecord {
    pub fn eliminated(&self) -> Option<&str> {
        match &self.outcome {
            VotingOutcome::Eliminated(name) => Some(name),
            _ => None,
        }
    }
}
