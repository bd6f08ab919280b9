pub mod agent;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod setup;
pub mod telemetry;
pub mod view;

pub use agent::{DecisionMaker, ScriptedAgent};
pub use config::{ConsensusTieBreak, GameConfig};
pub use error::{AgentError, GameError};
pub use orchestrator::{GameOutcome, GameReport, Orchestrator};
pub use telemetry::{EventSink, MemorySink, MultiSink, TracingSink};
pub use view::{view, PlayerView};
