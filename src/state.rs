use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::GameError;
use crate::models::room::Room;

pub type SharedRoom = Arc<RwLock<Room>>;

// ルームレジストリ
// レジストリのロックは挿入・削除・検索の間だけ保持する。呼び出し側は
// ルームのハンドルをクローンして取り出し、ルーム自身のロックを取る前に
// レジストリのロックを手放す
#[derive(Clone)]
pub struct AppState {
    rooms: Arc<RwLock<HashMap<String, SharedRoom>>>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert_room(&self, room: Room) -> SharedRoom {
        let id = room.id.clone();
        let shared = Arc::new(RwLock::new(room));
        self.rooms.write().await.insert(id, shared.clone());
        shared
    }

    pub async fn room(&self, room_id: &str) -> Result<SharedRoom, GameError> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| GameError::NotFound(format!("room {} not found", room_id)))
    }

    pub async fn remove_room(&self, room_id: &str) -> Option<SharedRoom> {
        self.rooms.write().await.remove(room_id)
    }

    pub async fn room_ids(&self) -> Vec<String> {
        self.rooms.read().await.keys().cloned().collect()
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new()
    }
}
