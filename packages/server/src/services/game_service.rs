use axum::extract::ws::Message;
use mafia_engine::models::GameEvent;
use mafia_engine::setup::{assign_roles, default_roster};
use mafia_engine::{
    DecisionMaker, EventSink, GameError, GameReport, MultiSink, Orchestrator, TracingSink,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::config::ServerConfig;
use crate::models::game::{GameSummary, StartGameRequest, StartGameResponse};
use crate::services::llm_agent::AgentProvider;
use crate::services::observer_log::{ObserverLog, ReportMeta};
use crate::state::{AppState, GameSession, SharedSession};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("game {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Mirrors public events into a session and its WebSocket channel.
pub struct SessionSink {
    session: SharedSession,
    tx: broadcast::Sender<Message>,
}

impl SessionSink {
    pub fn new(session: SharedSession, tx: broadcast::Sender<Message>) -> Self {
        Self { session, tx }
    }
}

impl EventSink for SessionSink {
    fn emit(&self, event: &GameEvent) {
        if !event.is_public() {
            return;
        }
        let Ok(mut session) = self.session.lock() else {
            return;
        };
        session.summary.apply(event);
        session.events.push(event.clone());
        // Sent under the session lock so a spectator's backlog and live feed never overlap.
        if let Ok(text) = serde_json::to_string(event) {
            // No subscribers is fine.
            let _ = self.tx.send(Message::Text(text));
        }
    }
}

/// A seated game that has not started playing yet.
pub struct PreparedGame {
    pub orchestrator: Orchestrator,
    pub observer: Option<Arc<ObserverLog>>,
    pub meta: ReportMeta,
    pub players: Vec<String>,
}

impl PreparedGame {
    /// Plays to the end and writes the report files.
    pub async fn play(self) -> Result<GameReport, GameError> {
        let report = self.orchestrator.run().await?;
        if let Some(observer) = &self.observer {
            match observer.write_reports(&report, &self.meta) {
                Ok(()) => info!("game logs written to {}", observer.dir().display()),
                Err(e) => warn!("failed to write game reports: {}", e),
            }
        }
        Ok(report)
    }
}

/// Builds the roster, deals roles and seats one decision maker per player.
pub fn prepare_game(
    config: &ServerConfig,
    request: &StartGameRequest,
    provider: &dyn AgentProvider,
    session_sink: Option<Arc<dyn EventSink>>,
) -> Result<PreparedGame, ServiceError> {
    let mut game_config = config.game.clone();
    if let Some(num_mafia) = request.num_mafia {
        game_config.num_mafia = num_mafia;
    }
    if let Some(rounds) = request.max_discussion_rounds {
        game_config.max_discussion_rounds = rounds;
    }
    if request.seed.is_some() {
        game_config.seed = request.seed;
    }

    let roster = match &request.players {
        Some(players) => players
            .iter()
            .map(|p| (p.name.trim().to_string(), p.personality.clone()))
            .collect(),
        None => default_roster(),
    };
    let mut rng = match game_config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let game_state = assign_roles(&roster, game_config.num_mafia, &mut rng)?;

    let agents: Vec<(String, Arc<dyn DecisionMaker>)> = game_state
        .players
        .iter()
        .enumerate()
        .map(|(seat, player)| (player.name.clone(), provider.agent_for(player, seat)))
        .collect();

    let observer = if config.observer_log {
        match ObserverLog::create(&config.log_dir) {
            Ok(log) => Some(Arc::new(log)),
            Err(e) => {
                warn!("observer log disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let mut sink = MultiSink::new().with(Arc::new(TracingSink));
    if let Some(observer) = &observer {
        sink = sink.with(observer.clone());
    }
    if let Some(session_sink) = session_sink {
        sink = sink.with(session_sink);
    }

    let meta = ReportMeta {
        num_mafia: game_config.num_mafia,
        max_discussion_rounds: game_config.max_discussion_rounds,
        decision_source: provider.describe(),
    };
    let players = roster.into_iter().map(|(name, _)| name).collect();
    let orchestrator = Orchestrator::new(game_state, agents, game_config, Arc::new(sink))?;

    Ok(PreparedGame {
        orchestrator,
        observer,
        meta,
        players,
    })
}

pub async fn start_game(
    state: AppState,
    request: StartGameRequest,
) -> Result<StartGameResponse, ServiceError> {
    let game_id = Uuid::new_v4().to_string();
    let provider = if request.offline {
        state.offline_agents.clone()
    } else {
        state.agents.clone()
    };

    let (tx, _) = broadcast::channel(1000);
    let session: SharedSession = Arc::new(std::sync::Mutex::new(GameSession {
        summary: GameSummary::new(game_id.clone(), Vec::new(), provider.describe()),
        events: Vec::new(),
    }));
    let sink: Arc<dyn EventSink> = Arc::new(SessionSink::new(session.clone(), tx.clone()));

    let prepared = prepare_game(&state.config, &request, provider.as_ref(), Some(sink))?;
    let players = prepared.players.clone();
    if let Ok(mut session) = session.lock() {
        session.summary = GameSummary::new(game_id.clone(), players.clone(), provider.describe());
        session.summary.log_dir = prepared
            .observer
            .as_ref()
            .map(|o| o.dir().display().to_string());
    }
    state.insert_game_channel(&game_id, tx).await;
    state
        .games
        .lock()
        .await
        .insert(game_id.clone(), session.clone());

    info!("starting game {} with {}", game_id, provider.describe());
    let id = game_id.clone();
    tokio::spawn(async move {
        let result = prepared.play().await;
        state.remove_game_channel(&id).await;
        let Ok(mut session) = session.lock() else {
            return;
        };
        match result {
            Ok(report) => {
                info!("game {} finished: {:?}", id, report.outcome);
                session.summary.finish(report.outcome);
            }
            Err(e) => {
                error!("game {} aborted: {}", id, e);
                session.summary.fail(e.to_string());
            }
        }
    });

    Ok(StartGameResponse {
        game_id,
        players,
        decision_source: provider.describe(),
    })
}

pub async fn list_games(state: AppState) -> Vec<GameSummary> {
    let sessions: Vec<SharedSession> = state.games.lock().await.values().cloned().collect();
    let mut summaries: Vec<GameSummary> = sessions
        .iter()
        .filter_map(|s| s.lock().ok().map(|s| s.summary.clone()))
        .collect();
    summaries.sort_by(|a, b| a.started_at.cmp(&b.started_at));
    summaries
}

pub async fn get_game_state(state: AppState, game_id: String) -> Result<GameSummary, ServiceError> {
    let session = state
        .session(&game_id)
        .await
        .ok_or_else(|| ServiceError::NotFound(game_id.clone()))?;
    let summary = session
        .lock()
        .map(|s| s.summary.clone())
        .map_err(|_| ServiceError::NotFound(game_id))?;
    Ok(summary)
}

pub async fn get_game_events(
    state: AppState,
    game_id: String,
) -> Result<Vec<GameEvent>, ServiceError> {
    let session = state
        .session(&game_id)
        .await
        .ok_or_else(|| ServiceError::NotFound(game_id.clone()))?;
    let events = session
        .lock()
        .map(|s| s.events.clone())
        .map_err(|_| ServiceError::NotFound(game_id))?;
    Ok(events)
}
