use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::GameError;
use crate::models::event::{EventBody, EventType, GameEvent, PlayerInfo, Recipient};
use crate::models::phase::{GameState, Phase};
use crate::models::player::Player;
use crate::models::room::{Room, RoleConfig};
use crate::state::{AppState, SharedRoom};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub name: String,
    pub player_count: usize,
    pub max_players: usize,
    pub state: GameState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room_id: String,
    pub name: String,
    pub max_players: usize,
    pub state: GameState,
    pub day_count: u32,
    pub role_config: HashMap<String, usize>,
    pub players: Vec<PlayerInfo>,
}

// ルーム作成
pub async fn create_room(
    state: &AppState,
    name: String,
    max_players: usize,
    role_names: &HashMap<String, usize>,
) -> Result<String, GameError> {
    if !(4..=12).contains(&max_players) {
        return Err(GameError::InvalidRequest(format!(
            "max_players must be between 4 and 12, got {}",
            max_players
        )));
    }
    let role_config = RoleConfig::from_names(role_names)?;
    if role_config.total() != max_players {
        return Err(GameError::InvalidConfig(format!(
            "role counts sum to {}, expected {}",
            role_config.total(),
            max_players
        )));
    }

    let room_id = Uuid::new_v4().to_string();
    let room = Room::new(room_id.clone(), name, max_players, role_config);
    state.insert_room(room).await;

    tracing::info!(room_id = %room_id, "room created");
    Ok(room_id)
}

// ルーム参加
pub async fn join_room(
    state: &AppState,
    room_id: &str,
    player_id: Option<String>,
    player_name: &str,
) -> Result<(String, u32), GameError> {
    if player_name.is_empty() || player_name.chars().count() > 20 {
        return Err(GameError::InvalidRequest(
            "player_name must be 1..20 characters".to_string(),
        ));
    }

    let room = state.room(room_id).await?;
    let result = {
        let mut room = room.write().await;
        if room.is_started() {
            return Err(GameError::GameAlreadyStarted);
        }

        let player_id = player_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        // 既知のIDでの再参加は再接続として扱い、名前だけ更新する
        if let Some(existing) = room.players.get_mut(&player_id) {
            existing.name = player_name.to_string();
            return Ok((player_id, existing.position));
        }

        if room.players.len() >= room.max_players {
            return Err(GameError::RoomFull);
        }

        let position = room
            .players
            .values()
            .map(|p| p.position)
            .max()
            .unwrap_or(0)
            + 1;
        let player = Player::new(player_id.clone(), player_name.to_string(), position);
        let info = PlayerInfo::sanitized(&player);
        room.players.insert(player_id.clone(), player);

        room.broadcast(
            Recipient::All,
            EventBody::new(
                EventType::PlayerJoined,
                format!("{} joined the room", player_name),
            )
            .with_players(vec![info]),
        );

        (player_id, position)
    };
    flush_events(&room).await;

    tracing::info!(room_id, player_id = %result.0, position = result.1, "player joined");
    Ok(result)
}

pub async fn leave_room(state: &AppState, room_id: &str, player_id: &str) -> Result<(), GameError> {
    let room = state.room(room_id).await?;
    let mut room = room.write().await;
    if room.is_started() {
        return Err(GameError::GameAlreadyStarted);
    }
    if room.players.remove(player_id).is_none() {
        return Err(GameError::NotFound(format!(
            "player {} not in room",
            player_id
        )));
    }
    room.unsubscribe(player_id);
    tracing::info!(room_id, player_id, "player left");
    Ok(())
}

// ルーム削除
// コントローラタスクはレジストリから消えたことを検知して終了する
// （ここで完了シグナルを起こす）。購読キューは送信側が落ちると閉じる
pub async fn delete_room(state: &AppState, room_id: &str) -> Result<(), GameError> {
    let room = state
        .remove_room(room_id)
        .await
        .ok_or_else(|| GameError::NotFound(format!("room {} not found", room_id)))?;

    let mut room = room.write().await;
    room.phase = Phase::GameOver;
    room.state = GameState::Finished;
    room.close_subscribers();
    room.signal_phase_complete();
    tracing::info!(room_id, "room deleted");
    Ok(())
}

pub async fn get_rooms(state: &AppState) -> Vec<RoomSummary> {
    let mut summaries = Vec::new();
    for room_id in state.room_ids().await {
        if let Ok(room) = state.room(&room_id).await {
            let room = room.read().await;
            summaries.push(RoomSummary {
                room_id: room.id.clone(),
                name: room.name.clone(),
                player_count: room.players.len(),
                max_players: room.max_players,
                state: room.state,
            });
        }
    }
    summaries
}

pub async fn get_room_info(state: &AppState, room_id: &str) -> Result<RoomInfo, GameError> {
    let room = state.room(room_id).await?;
    let room = room.read().await;
    let mut players: Vec<PlayerInfo> =
        room.players.values().map(PlayerInfo::sanitized).collect();
    players.sort_by_key(|p| p.position);
    Ok(RoomInfo {
        room_id: room.id.clone(),
        name: room.name.clone(),
        max_players: room.max_players,
        state: room.state,
        day_count: room.day_count,
        role_config: room.role_config.to_names(),
        players,
    })
}

// プレイヤーの購読キューを登録する。同じプレイヤーの既存の購読は置き換える
pub async fn subscribe_player(
    state: &AppState,
    room_id: &str,
    player_id: &str,
) -> Result<mpsc::Receiver<GameEvent>, GameError> {
    let room = state.room(room_id).await?;
    let mut room = room.write().await;
    room.player(player_id)?;
    Ok(room.subscribe(player_id))
}

pub async fn unsubscribe_player(state: &AppState, room_id: &str, player_id: &str) {
    if let Ok(room) = state.room(room_id).await {
        room.write().await.unsubscribe(player_id);
    }
}

// イベント配信
// イベント一覧と購読者一覧はルームのロック内でコピーし、キューへの
// 非ブロッキング投入はロック解放後に行う。投入は配信ゲートで直列化し、
// 購読者が seq 順以外でイベントを受け取ることがないようにする。
// 満杯のキューはその購読者の分だけイベントを落とす
pub async fn flush_events(room: &SharedRoom) {
    let gate = room.read().await.delivery_gate();
    let _gate = gate.lock().await;

    let (events, subscribers) = {
        let mut room = room.write().await;
        room.drain_outbox()
    };
    for outbound in events {
        for (player_id, tx) in &subscribers {
            if !outbound.recipient.includes(player_id) {
                continue;
            }
            if tx.try_send(outbound.event.clone()).is_err() {
                tracing::debug!(
                    %player_id,
                    seq = outbound.event.seq,
                    "subscriber queue full, dropping event"
                );
            }
        }
    }
}
