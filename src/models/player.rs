use serde::{Deserialize, Serialize};

use super::role::{Camp, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    // 座席番号。参加順に 1..N
    pub position: u32,
    pub role: Role,
    pub camp: Camp,
    pub is_alive: bool,
    // 現在のフェーズでこのプレイヤーの役職に手番がある間だけ true
    pub can_act: bool,
}

impl Player {
    pub fn new(id: String, name: String, position: u32) -> Self {
        Player {
            id,
            name,
            position,
            role: Role::Unknown,
            camp: Camp::Unknown,
            is_alive: true,
            can_act: false,
        }
    }
}
