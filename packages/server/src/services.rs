pub mod game_service;
pub mod llm_agent;
pub mod llm_client;
pub mod observer_log;
pub mod prompt;
pub mod structured;
