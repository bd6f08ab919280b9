use serde::{Deserialize, Serialize};

use super::role::NightActionKind;
use crate::view::PlayerView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "action")]
pub enum DecisionKind {
    NightAction(NightActionKind),
    Discussion,
    Vote,
    FinalVote,
    Defense,
}

/// Extra context handed to final voters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialNote {
    pub subject: String,
    pub defense: Option<String>,
}

/// Everything a decision maker gets to see for one decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub kind: DecisionKind,
    pub player: String,
    /// Valid targets. Empty for discussion and defense.
    pub candidates: Vec<String>,
    pub trial: Option<TrialNote>,
    pub view: PlayerView,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NightDecision {
    pub target: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscussionDecision {
    pub speak: bool,
    pub comment: String,
    /// 1-5, higher wants the floor sooner.
    pub urgency: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteDecision {
    pub target: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefenseDecision {
    pub text: String,
}

impl NightDecision {
    pub fn target(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            reason: reason.into(),
        }
    }

    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            target: None,
            reason: reason.into(),
        }
    }
}

impl DiscussionDecision {
    pub fn speak(comment: impl Into<String>, urgency: u8) -> Self {
        Self {
            speak: true,
            comment: comment.into(),
            urgency,
        }
    }

    pub fn silent() -> Self {
        Self {
            speak: false,
            comment: String::new(),
            urgency: 1,
        }
    }
}

impl VoteDecision {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}
