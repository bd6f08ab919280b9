use axum::extract::ws::Message;
use mafia_engine::models::GameEvent;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{broadcast, Mutex};

use crate::models::config::ServerConfig;
use crate::models::game::GameSummary;
use crate::services::llm_agent::{AgentProvider, OfflineAgentProvider};

/// Live record of one game: its public summary and public event log.
#[derive(Debug)]
pub struct GameSession {
    pub summary: GameSummary,
    pub events: Vec<GameEvent>,
}

pub type SharedSession = Arc<std::sync::Mutex<GameSession>>;

#[derive(Clone)]
pub struct AppState {
    pub games: Arc<Mutex<HashMap<String, SharedSession>>>,
    pub channel: Arc<Mutex<HashMap<String, broadcast::Sender<Message>>>>,
    pub config: Arc<ServerConfig>,
    pub agents: Arc<dyn AgentProvider>,
    pub offline_agents: Arc<dyn AgentProvider>,
}

impl AppState {
    pub fn new(config: ServerConfig, agents: Arc<dyn AgentProvider>) -> Self {
        let seed = config.game.seed.unwrap_or_default();
        AppState {
            games: Arc::new(Mutex::new(HashMap::new())),
            channel: Arc::new(Mutex::new(HashMap::new())),
            config: Arc::new(config),
            agents,
            offline_agents: Arc::new(OfflineAgentProvider::new(seed)),
        }
    }

    /// State whose games are always played by scripted agents.
    pub fn offline(config: ServerConfig) -> Self {
        let seed = config.game.seed.unwrap_or_default();
        Self::new(config, Arc::new(OfflineAgentProvider::new(seed)))
    }

    /// Registers the live feed of a game that is about to start.
    pub async fn insert_game_channel(&self, game_id: &str, tx: broadcast::Sender<Message>) {
        self.channel.lock().await.insert(game_id.to_string(), tx);
    }

    /// The live feed of a running game. Finished games have none.
    pub async fn game_channel(&self, game_id: &str) -> Option<broadcast::Sender<Message>> {
        self.channel.lock().await.get(game_id).cloned()
    }

    /// Drops the registered sender so spectators see the feed close.
    pub async fn remove_game_channel(&self, game_id: &str) {
        self.channel.lock().await.remove(game_id);
    }

    pub async fn session(&self, game_id: &str) -> Option<SharedSession> {
        self.games.lock().await.get(game_id).cloned()
    }
}
