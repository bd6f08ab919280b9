use anyhow::Context;
use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use structopt::StructOpt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use server::app;
use server::models::config::ServerConfig;
use server::models::game::StartGameRequest;
use server::services::game_service;
use server::services::llm_agent::{AgentProvider, LlmAgentProvider, OfflineAgentProvider};
use server::services::llm_client::LlmClient;
use server::services::observer_log::{self, ReportMeta};
use server::state::AppState;
use server::utils::config::CONFIG;

#[derive(Debug, StructOpt)]
#[structopt(name = "mafia-server", about = "Runs Mafia games between language-model players")]
enum Command {
    /// Serve the HTTP and WebSocket API.
    #[structopt(name = "serve")]
    Serve {
        #[structopt(long)]
        addr: Option<SocketAddr>,
    },
    /// Play one game in the terminal and print the summary.
    #[structopt(name = "play")]
    Play {
        #[structopt(long)]
        num_mafia: Option<usize>,
        #[structopt(long)]
        seed: Option<u64>,
        #[structopt(long)]
        offline: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn agent_provider(config: &ServerConfig) -> Arc<dyn AgentProvider> {
    match LlmClient::from_settings(&config.llm) {
        Ok(client) => Arc::new(LlmAgentProvider::new(
            client.with_timeout(config.game.decision_timeout),
        )),
        Err(e) => {
            warn!("{}; players fall back to scripted agents", e);
            Arc::new(OfflineAgentProvider::new(
                config.game.seed.unwrap_or_default(),
            ))
        }
    }
}

async fn serve(config: ServerConfig, addr: Option<SocketAddr>) -> anyhow::Result<()> {
    let addr = addr.unwrap_or(config.bind_addr);
    let state = AppState::new(config.clone(), agent_provider(&config));

    let origins = ["http://localhost:3000".parse::<HeaderValue>()?];
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);

    let app = app::create_app(state).layer(cors).layer(
        TraceLayer::new_for_http().make_span_with(|request: &http::Request<_>| {
            tracing::info_span!(
                "HTTP request",
                method = %request.method(),
                uri = %request.uri(),
            )
        }),
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn play(
    config: ServerConfig,
    num_mafia: Option<usize>,
    seed: Option<u64>,
    offline: bool,
) -> anyhow::Result<()> {
    let provider: Arc<dyn AgentProvider> = if offline {
        Arc::new(OfflineAgentProvider::new(seed.unwrap_or_default()))
    } else {
        agent_provider(&config)
    };
    let request = StartGameRequest {
        num_mafia,
        seed,
        offline,
        ..Default::default()
    };
    let prepared = game_service::prepare_game(&config, &request, provider.as_ref(), None)?;
    let meta: ReportMeta = prepared.meta.clone();
    let report = prepared.play().await?;
    println!("{}", observer_log::summary(&report, &meta));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenv() {
        eprintln!("Warning: could not load .env: {}", e);
    }
    init_tracing();

    let config = CONFIG.clone();
    match Command::from_args() {
        Command::Serve { addr } => serve(config, addr).await,
        Command::Play {
            num_mafia,
            seed,
            offline,
        } => play(config, num_mafia, seed, offline).await,
    }
}
