use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{sink::SinkExt, stream::StreamExt};
use mafia_engine::models::GameEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::state::{AppState, SharedSession};

/// Streams a game's public events to a spectator as JSON text frames.
pub async fn handler(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let Some(session) = state.session(&game_id).await else {
        return (StatusCode::NOT_FOUND, Json(format!("game {} not found", game_id)))
            .into_response();
    };
    let Some(ws) = ws else {
        return (
            StatusCode::UPGRADE_REQUIRED,
            Json("expected a websocket upgrade".to_string()),
        )
            .into_response();
    };
    let tx = state.game_channel(&game_id).await;
    ws.on_upgrade(move |socket| handle_socket(socket, session, tx, game_id))
}

/// Snapshots the events so far and subscribes to later ones in one step.
/// Events are published under the session lock, so each event lands in
/// exactly one of the two.
pub fn subscribe_with_backlog(
    session: &SharedSession,
    tx: Option<broadcast::Sender<Message>>,
) -> (Vec<GameEvent>, Option<broadcast::Receiver<Message>>) {
    match session.lock() {
        Ok(session) => (session.events.clone(), tx.map(|tx| tx.subscribe())),
        Err(_) => (Vec::new(), None),
    }
}

/// Replays the backlog, then follows the live feed until the game ends.
/// A finished game has no feed, so only the backlog is sent.
pub async fn handle_socket(
    ws: WebSocket,
    session: SharedSession,
    tx: Option<broadcast::Sender<Message>>,
    game_id: String,
) {
    info!("spectator connected to game {}", game_id);
    let (mut sender, mut receiver) = ws.split();

    let (backlog, rx) = subscribe_with_backlog(&session, tx);

    let game_id_for_send = game_id.clone();
    let mut send_task = tokio::spawn(async move {
        for event in backlog {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(text)).await.is_err() {
                return;
            }
        }
        let Some(mut rx) = rx else {
            let _ = sender.send(Message::Close(None)).await;
            return;
        };
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = sender.send(msg).await {
                        warn!("error sending to spectator of {}: {}", game_id_for_send, e);
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("spectator of {} skipped {} events", game_id_for_send, n);
                }
                Err(RecvError::Closed) => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Spectators are read-only; drain the socket until it closes.
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }
    info!("spectator left game {}", game_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game::GameSummary;
    use crate::services::game_service::SessionSink;
    use crate::state::GameSession;
    use mafia_engine::EventSink;
    use std::sync::{Arc, Mutex};
    use tokio::sync::broadcast::error::TryRecvError;

    fn night(round: u32) -> GameEvent {
        GameEvent::NightResult {
            round,
            eliminated: None,
        }
    }

    #[test]
    fn backlog_and_live_feed_do_not_overlap() {
        let session: SharedSession = Arc::new(Mutex::new(GameSession {
            summary: GameSummary::new("g".into(), vec!["Sam".into()], "offline".into()),
            events: Vec::new(),
        }));
        let (tx, _) = broadcast::channel(16);
        let sink = SessionSink::new(session.clone(), tx.clone());

        sink.emit(&night(1));
        let (backlog, rx) = subscribe_with_backlog(&session, Some(tx.clone()));
        let mut rx = rx.unwrap();
        sink.emit(&night(2));

        assert_eq!(backlog.len(), 1);
        assert!(matches!(backlog[0], GameEvent::NightResult { round: 1, .. }));
        match rx.try_recv() {
            Ok(Message::Text(text)) => assert!(text.contains("\"round\":2")),
            other => panic!("unexpected live message {:?}", other),
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn finished_game_has_only_a_backlog() {
        let session: SharedSession = Arc::new(Mutex::new(GameSession {
            summary: GameSummary::new("g".into(), Vec::new(), "offline".into()),
            events: vec![night(1)],
        }));
        let (backlog, rx) = subscribe_with_backlog(&session, None);
        assert_eq!(backlog.len(), 1);
        assert!(rx.is_none());
    }
}
