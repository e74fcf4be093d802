use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use chrono::Utc;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::event::GameEvent;
use crate::services::room_service;
use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);
const WRITE_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct SubscribeParams {
    pub player_id: String,
}

#[derive(Debug, Deserialize)]
struct ClientMessage {
    #[serde(rename = "type")]
    message_type: String,
}

// プレイヤーのプッシュチャネルを開く。アップグレード完了前に購読を
// 登録するので、その間のイベントを取りこぼさない
pub async fn subscribe_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(params): Query<SubscribeParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    match room_service::subscribe_player(&state, &room_id, &params.player_id).await {
        Ok(rx) => ws
            .on_upgrade(move |socket| {
                handle_socket(socket, state, room_id, params.player_id, rx)
            })
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    room_id: String,
    player_id: String,
    mut events: mpsc::Receiver<GameEvent>,
) {
    info!(%room_id, %player_id, "event subscription opened");
    let (mut sender, mut receiver) = socket.split();

    // 受信側からの制御フレーム(pong)は送信タスクに合流させ、
    // シンクの所有者を一つにする
    let (control_tx, mut control_rx) = mpsc::channel::<Message>(8);

    let mut send_task = tokio::spawn(async move {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.tick().await;
        loop {
            let message = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => match serde_json::to_string(&event) {
                        Ok(text) => Message::Text(text),
                        Err(e) => {
                            warn!(error = %e, "failed to serialize event");
                            continue;
                        }
                    },
                    // キューが閉じた: ルーム削除か、新しい購読に置き換えられた
                    None => break,
                },
                control = control_rx.recv() => match control {
                    Some(message) => message,
                    None => break,
                },
                _ = ping.tick() => Message::Ping(Vec::new()),
            };

            match tokio::time::timeout(WRITE_DEADLINE, sender.send(message)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(error = %e, "websocket write failed");
                    break;
                }
                Err(_) => {
                    debug!("websocket write deadline exceeded");
                    break;
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    if let Ok(client) = serde_json::from_str::<ClientMessage>(&text) {
                        if client.message_type == "ping" {
                            let pong = json!({
                                "type": "pong",
                                "timestamp": Utc::now().timestamp(),
                            });
                            if control_tx
                                .send(Message::Text(pong.to_string()))
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // どちらかのタスクが落ちてもこの購読だけを閉じる
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    room_service::unsubscribe_player(&state, &room_id, &player_id).await;
    info!(%room_id, %player_id, "event subscription closed");
}
