//! The decision-maker port and a scripted implementation.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::AgentError;
use crate::models::{
    DecisionRequest, DefenseDecision, DiscussionDecision, NightDecision, VoteDecision,
};

/// One participant's decision source. Implementations may be slow or fail;
/// the engine validates everything they return.
#[async_trait]
pub trait DecisionMaker: Send + Sync {
    async fn night_action(&self, request: &DecisionRequest) -> Result<NightDecision, AgentError>;
    async fn discuss(&self, request: &DecisionRequest) -> Result<DiscussionDecision, AgentError>;
    async fn vote(&self, request: &DecisionRequest) -> Result<VoteDecision, AgentError>;
    async fn defend(&self, request: &DecisionRequest) -> Result<DefenseDecision, AgentError>;
}

/// What a [`ScriptedAgent`] does once its queue for a decision kind is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// First candidate, never speaks.
    FirstCandidate,
    /// Random candidate, speaks half the time.
    Random,
}

/// Replays queued decisions, then falls back to a fixed policy. Used by
/// tests and by offline games.
pub struct ScriptedAgent {
    night: Mutex<VecDeque<Result<NightDecision, AgentError>>>,
    discussion: Mutex<VecDeque<Result<DiscussionDecision, AgentError>>>,
    votes: Mutex<VecDeque<Result<VoteDecision, AgentError>>>,
    defenses: Mutex<VecDeque<Result<DefenseDecision, AgentError>>>,
    fallback: Fallback,
    rng: Mutex<StdRng>,
}

impl Default for ScriptedAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::with_fallback(Fallback::FirstCandidate, 0)
    }

    pub fn random(seed: u64) -> Self {
        Self::with_fallback(Fallback::Random, seed)
    }

    fn with_fallback(fallback: Fallback, seed: u64) -> Self {
        Self {
            night: Mutex::new(VecDeque::new()),
            discussion: Mutex::new(VecDeque::new()),
            votes: Mutex::new(VecDeque::new()),
            defenses: Mutex::new(VecDeque::new()),
            fallback,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn night(self, decision: Result<NightDecision, AgentError>) -> Self {
        push(&self.night, decision);
        self
    }

    pub fn discussion(self, decision: Result<DiscussionDecision, AgentError>) -> Self {
        push(&self.discussion, decision);
        self
    }

    pub fn vote(self, decision: Result<VoteDecision, AgentError>) -> Self {
        push(&self.votes, decision);
        self
    }

    /// Queues a plain vote for `target`.
    pub fn votes_for(self, target: &str) -> Self {
        self.vote(Ok(VoteDecision::new(target, "scripted")))
    }

    pub fn defense(self, decision: Result<DefenseDecision, AgentError>) -> Self {
        push(&self.defenses, decision);
        self
    }

    fn pick(&self, candidates: &[String]) -> Option<String> {
        match self.fallback {
            Fallback::FirstCandidate => candidates.first().cloned(),
            Fallback::Random => {
                let mut rng = self.rng.lock().ok()?;
                candidates.choose(&mut *rng).cloned()
            }
        }
    }
}

fn push<T>(queue: &Mutex<VecDeque<T>>, item: T) {
    if let Ok(mut queue) = queue.lock() {
        queue.push_back(item);
    }
}

fn pop<T>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    queue.lock().ok().and_then(|mut q| q.pop_front())
}

#[async_trait]
impl DecisionMaker for ScriptedAgent {
    async fn night_action(&self, request: &DecisionRequest) -> Result<NightDecision, AgentError> {
        if let Some(next) = pop(&self.night) {
            return next;
        }
        Ok(match self.pick(&request.candidates) {
            Some(target) => NightDecision::target(target, "fallback"),
            None => NightDecision::pass("no candidates"),
        })
    }

    async fn discuss(&self, request: &DecisionRequest) -> Result<DiscussionDecision, AgentError> {
        if let Some(next) = pop(&self.discussion) {
            return next;
        }
        match self.fallback {
            Fallback::FirstCandidate => Ok(DiscussionDecision::silent()),
            Fallback::Random => {
                let mut rng = self.rng.lock().map_err(|_| AgentError::Unavailable)?;
                if rng.gen_bool(0.5) {
                    let urgency = rng.gen_range(1..=5);
                    Ok(DiscussionDecision::speak(
                        format!("{} has nothing conclusive yet.", request.player),
                        urgency,
                    ))
                } else {
                    Ok(DiscussionDecision::silent())
                }
            }
        }
    }

    async fn vote(&self, request: &DecisionRequest) -> Result<VoteDecision, AgentError> {
        if let Some(next) = pop(&self.votes) {
            return next;
        }
        self.pick(&request.candidates)
            .map(|target| VoteDecision::new(target, "fallback"))
            .ok_or_else(|| AgentError::Malformed("no candidates".to_string()))
    }

    async fn defend(&self, _request: &DecisionRequest) -> Result<DefenseDecision, AgentError> {
        if let Some(next) = pop(&self.defenses) {
            return next;
        }
        Ok(DefenseDecision {
            text: "I am innocent.".to_string(),
        })
    }
}
