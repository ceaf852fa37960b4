use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::time::{MissedTickBehavior, interval};

use crate::{
    AppState,
    dto::{ApiResponse, PoolListItem, PoolListResponse},
    errors::ApiError,
};

#[utoipa::path(
    get,
    path = "/live",
    tag = "Pools",
    responses(
        (status = 101, description = "Websocket pushing the leaderboard envelope every feed interval", body = PoolListResponse)
    )
)]
pub async fn live_feed(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push_leaderboard(socket, state))
}

async fn push_leaderboard(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut ticker = interval(state.feed_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::debug!("[LiveFeed] Client connected");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(frame) = leaderboard_frame(&state).await else {
                    break;
                };
                if sender.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    tracing::debug!("[LiveFeed] Client disconnected");
}

/// Same envelope as `GET /v1/pools`; read failures are pushed as error envelopes.
async fn leaderboard_frame(state: &AppState) -> Option<String> {
    let frame = match state.analytics.leaderboard().await {
        Ok(entries) => serde_json::to_string(&ApiResponse::ok(PoolListResponse {
            items: entries.iter().map(PoolListItem::from).collect(),
        })),
        Err(e) => {
            let error = ApiError::from(e);
            tracing::warn!(error = %error, "[LiveFeed] Leaderboard read failed");
            serde_json::to_string(&ApiResponse::<()>::from(&error))
        }
    };
    frame
        .map_err(|e| tracing::error!(error = %e, "[LiveFeed] Failed to encode frame"))
        .ok()
}
