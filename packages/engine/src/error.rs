use std::time::Duration;

/// Fatal errors. Any of these means the game state can no longer be trusted.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("unknown player: {0}")]
    UnknownPlayer(String),
    #[error("player {0} is already eliminated")]
    AlreadyEliminated(String),
    #[error("winner is already set")]
    WinnerAlreadySet,
    #[error("no decision maker registered for {0}")]
    MissingAgent(String),
    #[error("invalid setup: {0}")]
    InvalidSetup(String),
}

/// Recoverable decision-maker failures. The orchestrator turns these into
/// abstentions.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    #[error("decision timed out after {0:?}")]
    Timeout(Duration),
    #[error("decision request failed: {0}")]
    Request(String),
    #[error("malformed decision: {0}")]
    Malformed(String),
    #[error("decision maker unavailable")]
    Unavailable,
}
