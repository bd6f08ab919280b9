use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::models::game::StartGameRequest;
use crate::services::game_service::{self, ServiceError};
use crate::state::AppState;
use crate::utils::websocket;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/start", post(start_game))
        .route("/games", get(list_games))
        .nest(
            "/:gameid",
            Router::new()
                .route("/state", get(get_game_state))
                .route("/events", get(get_game_events))
                .route("/ws", get(websocket::handler)),
        )
        .with_state(state)
}

fn error_response(e: ServiceError) -> Response {
    let status = match e {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Game(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(e.to_string())).into_response()
}

pub async fn start_game(
    State(state): State<AppState>,
    body: Option<Json<StartGameRequest>>,
) -> Response {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    match game_service::start_game(state, request).await {
        Ok(started) => (StatusCode::OK, Json(started)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_games(State(state): State<AppState>) -> impl IntoResponse {
    Json(game_service::list_games(state).await)
}

pub async fn get_game_state(
    Path(game_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match game_service::get_game_state(state, game_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_game_events(
    Path(game_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match game_service::get_game_events(state, game_id).await {
        Ok(events) => (StatusCode::OK, Json(events)).into_response(),
        Err(e) => error_response(e),
    }
}
