//! Decision makers backed by a chat model, and the providers that seat one
//! per participant.

use async_trait::async_trait;
use mafia_engine::models::{
    DecisionRequest, DefenseDecision, DiscussionDecision, NightDecision, Player, VoteDecision,
};
use mafia_engine::{AgentError, DecisionMaker, ScriptedAgent};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::services::llm_client::{LlmClient, LlmError};
use crate::services::prompt::{render, suggested_urgency};
use crate::services::structured::{
    parse_json_object, Structured, DISCUSSION_SCHEMA, NIGHT_SCHEMA, VOTE_SCHEMA,
};

/// Seats a decision maker for each participant of a new game.
pub trait AgentProvider: Send + Sync {
    fn agent_for(&self, player: &Player, seat: usize) -> Arc<dyn DecisionMaker>;

    fn describe(&self) -> String;
}

pub struct LlmAgentProvider {
    client: LlmClient,
}

impl LlmAgentProvider {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

impl AgentProvider for LlmAgentProvider {
    fn agent_for(&self, _player: &Player, _seat: usize) -> Arc<dyn DecisionMaker> {
        Arc::new(LlmAgent::new(self.client.clone()))
    }

    fn describe(&self) -> String {
        format!("llm:{}", self.client.model())
    }
}

/// Random scripted agents, for games without a model.
pub struct OfflineAgentProvider {
    seed: u64,
}

impl OfflineAgentProvider {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl AgentProvider for OfflineAgentProvider {
    fn agent_for(&self, _player: &Player, seat: usize) -> Arc<dyn DecisionMaker> {
        Arc::new(ScriptedAgent::random(self.seed.wrapping_add(seat as u64)))
    }

    fn describe(&self) -> String {
        "offline".to_string()
    }
}

pub struct LlmAgent {
    client: LlmClient,
}

impl LlmAgent {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    async fn ask(&self, request: &DecisionRequest) -> Result<String, AgentError> {
        let prompt = render(request);
        debug!("{} asks for {:?}", request.player, request.kind);
        self.client.complete(&prompt).await.map_err(agent_error)
    }
}

fn agent_error(e: LlmError) -> AgentError {
    match e {
        LlmError::MissingApiKey => AgentError::Unavailable,
        LlmError::Empty => AgentError::Malformed(e.to_string()),
        other => AgentError::Request(other.to_string()),
    }
}

fn json_text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Night replies are JSON; fall back to the line format if the model
/// ignored that.
pub fn parse_night(reply: &str) -> NightDecision {
    let (target, reason) = match parse_json_object(reply) {
        Some(value) => (json_text(&value, "target"), json_text(&value, "reason")),
        None => {
            let parsed = Structured::parse(reply, NIGHT_SCHEMA);
            (
                parsed.text("target").map(str::to_string),
                parsed.text("reason").map(str::to_string),
            )
        }
    };
    NightDecision {
        target,
        reason: reason.unwrap_or_default(),
    }
}

pub fn parse_discussion(reply: &str, default_urgency: u8) -> DiscussionDecision {
    let parsed = Structured::parse(reply, DISCUSSION_SCHEMA);
    let comment = parsed.text("comment").unwrap_or_default().to_string();
    if !parsed.flag("speak") || comment.is_empty() {
        return DiscussionDecision::silent();
    }
    let urgency = parsed
        .number("urgency")
        .map(|u| u.clamp(1, 5) as u8)
        .unwrap_or(default_urgency);
    DiscussionDecision::speak(comment, urgency)
}

pub fn parse_vote(reply: &str) -> Result<VoteDecision, AgentError> {
    let parsed = Structured::parse(reply, VOTE_SCHEMA);
    let target = parsed
        .text("target")
        .ok_or_else(|| AgentError::Malformed("vote without a target".to_string()))?;
    Ok(VoteDecision::new(
        target,
        parsed.text("reason").unwrap_or_default(),
    ))
}

#[async_trait]
impl DecisionMaker for LlmAgent {
    async fn night_action(&self, request: &DecisionRequest) -> Result<NightDecision, AgentError> {
        let reply = self.ask(request).await?;
        Ok(parse_night(&reply))
    }

    async fn discuss(&self, request: &DecisionRequest) -> Result<DiscussionDecision, AgentError> {
        let reply = self.ask(request).await?;
        Ok(parse_discussion(&reply, suggested_urgency(&request.view)))
    }

    async fn vote(&self, request: &DecisionRequest) -> Result<VoteDecision, AgentError> {
        let reply = self.ask(request).await?;
        parse_vote(&reply)
    }

    async fn defend(&self, request: &DecisionRequest) -> Result<DefenseDecision, AgentError> {
        let text = self.ask(request).await?;
        Ok(DefenseDecision { text })
    }
}
