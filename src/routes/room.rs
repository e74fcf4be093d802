use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::services::room_service::{self, RoomInfo, RoomSummary};
use crate::state::AppState;
use crate::utils::websocket;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub max_players: usize,
    pub role_config: HashMap<String, usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    #[serde(default)]
    pub player_id: Option<String>,
    pub player_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub success: bool,
    pub message: String,
    pub player_id: String,
    pub position: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaveRoomRequest {
    pub player_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // ルーム作成
        // curl -X POST -H "Content-Type: application/json" -d '{"name":"...","max_players":6,"role_config":{"werewolf":1,...}}' http://localhost:8080/api/room/create
        .route("/create", post(create_room))
        // ルーム一覧取得
        // curl http://localhost:8080/api/room/rooms
        .route("/rooms", get(get_rooms))
        // 特定のルーム情報取得
        // curl http://localhost:8080/api/room/{roomid}
        .route("/:roomid", get(get_room_info))
        // ルーム参加
        // curl -X POST -H "Content-Type: application/json" -d '{"player_name":"alice"}' http://localhost:8080/api/room/{roomid}/join
        .route("/:roomid/join", post(join_room))
        // ルーム退出
        // curl -X POST -H "Content-Type: application/json" -d '{"player_id":"..."}' http://localhost:8080/api/room/{roomid}/leave
        .route("/:roomid/leave", post(leave_room))
        // ルーム削除
        // curl -X DELETE http://localhost:8080/api/room/{roomid}/delete
        .route("/:roomid/delete", delete(delete_room))
        // ゲームイベント購読 (WebSocket)
        // websocat "ws://localhost:8080/api/room/{roomid}/subscribe?player_id=..."
        .route("/:roomid/subscribe", get(websocket::subscribe_handler))
        .with_state(state)
}

async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, GameError> {
    let room_id =
        room_service::create_room(&state, req.name.clone(), req.max_players, &req.role_config)
            .await?;
    Ok(Json(CreateRoomResponse {
        room_id,
        message: format!("Room {} created", req.name),
    }))
}

async fn get_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(room_service::get_rooms(&state).await)
}

async fn get_room_info(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomInfo>, GameError> {
    let info = room_service::get_room_info(&state, &room_id).await?;
    Ok(Json(info))
}

async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, GameError> {
    let (player_id, position) =
        room_service::join_room(&state, &room_id, req.player_id, &req.player_name).await?;
    Ok(Json(JoinRoomResponse {
        success: true,
        message: "Joined the room".to_string(),
        player_id,
        position,
    }))
}

async fn leave_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<LeaveRoomRequest>,
) -> Result<Json<AckResponse>, GameError> {
    room_service::leave_room(&state, &room_id, &req.player_id).await?;
    Ok(Json(AckResponse {
        success: true,
        message: "Left the room".to_string(),
    }))
}

async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<AckResponse>, GameError> {
    room_service::delete_room(&state, &room_id).await?;
    Ok(Json(AckResponse {
        success: true,
        message: format!("Room {} deleted", room_id),
    }))
}
