use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::models::event::PhaseInfo;
use crate::services::game_service::{self, GameStateResponse};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct StartGameResponse {
    pub success: bool,
    pub message: String,
    pub phase_info: PhaseInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NightActionRequest {
    pub player_id: String,
    #[serde(default)]
    pub target_player_id: Option<String>,
    pub action_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NightActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteRequest {
    pub voter_id: String,
    pub target_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct StateParams {
    pub player_id: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        // roomidで指定されたゲームを開始
        // curl -X POST http://localhost:8080/api/game/{roomid}/start
        .route("/:roomid/start", post(start_game))
        // roomidで指定されたゲームの状態を取得（player_id視点）
        // curl "http://localhost:8080/api/game/{roomid}/state?player_id=..."
        .route("/:roomid/state", get(get_game_state))
        // 夜のアクションを実行
        // curl -X POST -H "Content-Type: application/json" -d '{"player_id":"...","target_player_id":"...","action_type":"kill"}' http://localhost:8080/api/game/{roomid}/action
        .route("/:roomid/action", post(night_action))
        // 投票を実行
        // curl -X POST -H "Content-Type: application/json" -d '{"voter_id":"...","target_id":"..."}' http://localhost:8080/api/game/{roomid}/vote
        .route("/:roomid/vote", post(vote))
        .with_state(state)
}

async fn start_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<StartGameResponse>, GameError> {
    let phase_info = game_service::start_game(&state, &room_id).await?;
    Ok(Json(StartGameResponse {
        success: true,
        message: "The game has started, the first night begins".to_string(),
        phase_info,
    }))
}

async fn get_game_state(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(params): Query<StateParams>,
) -> Result<Json<GameStateResponse>, GameError> {
    let view = game_service::get_game_state(&state, &room_id, &params.player_id).await?;
    Ok(Json(view))
}

async fn night_action(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<NightActionRequest>,
) -> Result<Json<NightActionResponse>, GameError> {
    let result = game_service::submit_night_action(
        &state,
        &room_id,
        &req.player_id,
        req.target_player_id.as_deref(),
        &req.action_type,
    )
    .await?;
    Ok(Json(NightActionResponse {
        success: true,
        message: "Action recorded".to_string(),
        result,
    }))
}

async fn vote(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, GameError> {
    game_service::submit_vote(&state, &room_id, &req.voter_id, &req.target_id).await?;
    Ok(Json(VoteResponse {
        success: true,
        message: "Vote recorded".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::services::room_service;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn full_room(state: &AppState) -> String {
        let mut role_config = HashMap::new();
        role_config.insert("werewolf".to_string(), 1);
        role_config.insert("seer".to_string(), 1);
        role_config.insert("villager".to_string(), 2);
        let room_id = room_service::create_room(state, "game".to_string(), 4, &role_config)
            .await
            .unwrap();
        for name in ["alice", "bob", "carol", "dave"] {
            room_service::join_room(state, &room_id, None, name)
                .await
                .unwrap();
        }
        room_id
    }

    #[tokio::test]
    async fn test_start_game() {
        let state = AppState::new();
        let app = routes(state.clone());
        let room_id = full_room(&state).await;

        let request = Request::builder()
            .method("POST")
            .uri(&format!("/{}/start", room_id))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let started: StartGameResponse = serde_json::from_slice(&body).unwrap();
        assert!(started.success);
        assert_eq!(started.phase_info.time_limit_seconds, 60);
    }

    #[tokio::test]
    async fn test_start_game_twice_fails() {
        let state = AppState::new();
        let app = routes(state.clone());
        let room_id = full_room(&state).await;

        game_service::start_game(&state, &room_id).await.unwrap();

        let request = Request::builder()
            .method("POST")
            .uri(&format!("/{}/start", room_id))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["error"], "game_already_started");
    }

    #[tokio::test]
    async fn test_state_is_filtered_per_viewer() {
        let state = AppState::new();
        let app = routes(state.clone());
        let room_id = full_room(&state).await;
        game_service::start_game(&state, &room_id).await.unwrap();

        let viewer_id = {
            let room = state.room(&room_id).await.unwrap();
            let room = room.read().await;
            room.players.keys().next().unwrap().clone()
        };

        let request = Request::builder()
            .method("GET")
            .uri(&format!("/{}/state?player_id={}", room_id, viewer_id))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 65536).await.unwrap();
        let view: GameStateResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(view.players.len(), 4);
        for player in &view.players {
            if player.player_id == viewer_id {
                assert!(player.role.is_some());
            } else {
                assert!(player.role.is_none());
                assert!(player.camp.is_none());
            }
        }
    }

    #[tokio::test]
    async fn test_vote_outside_voting_phase_fails() {
        let state = AppState::new();
        let app = routes(state.clone());
        let room_id = full_room(&state).await;
        game_service::start_game(&state, &room_id).await.unwrap();

        let (voter, target) = {
            let room = state.room(&room_id).await.unwrap();
            let room = room.read().await;
            let mut ids = room.players.keys().cloned();
            (ids.next().unwrap(), ids.next().unwrap())
        };

        let request = Request::builder()
            .method("POST")
            .uri(&format!("/{}/vote", room_id))
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_string(&VoteRequest {
                    voter_id: voter,
                    target_id: target,
                })
                .unwrap(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["error"], "wrong_phase");
    }
}
