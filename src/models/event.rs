use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::phase::Phase;
use super::player::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "EVENT_PLAYER_JOINED")]
    PlayerJoined,
    #[serde(rename = "EVENT_GAME_STARTED")]
    GameStarted,
    #[serde(rename = "EVENT_PHASE_CHANGED")]
    PhaseChanged,
    #[serde(rename = "EVENT_YOUR_TURN")]
    YourTurn,
    #[serde(rename = "EVENT_PLAYER_DIED")]
    PlayerDied,
    #[serde(rename = "EVENT_PEACEFUL")]
    Peaceful,
    #[serde(rename = "EVENT_PRIVATE_RESULT")]
    PrivateResult,
    #[serde(rename = "EVENT_GAME_OVER")]
    GameOver,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseInfo {
    pub current_phase: Phase,
    pub phase_name: String,
    pub time_limit_seconds: u64,
}

// プレイヤーの投影。役職と陣営は本人以外にはゲーム終了まで見せない
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: String,
    pub name: String,
    pub position: u32,
    pub is_alive: bool,
    #[serde(default)]
    pub can_act: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camp: Option<String>,
}

impl PlayerInfo {
    // 公開ビュー: 身元と生死のみ
    pub fn sanitized(player: &Player) -> Self {
        PlayerInfo {
            player_id: player.id.clone(),
            name: player.name.clone(),
            position: player.position,
            is_alive: player.is_alive,
            can_act: player.can_act,
            role: None,
            camp: None,
        }
    }

    // 完全ビュー: 本人の自分用エントリと、ゲーム終了時の全員分
    pub fn revealed(player: &Player) -> Self {
        PlayerInfo {
            role: Some(player.role.name().to_string()),
            camp: Some(player.camp.name().to_string()),
            ..PlayerInfo::sanitized(player)
        }
    }
}

// 購読者へ送るイベント封筒。seq はルームごとに単調増加し、
// 購読者は seq 順に受け取るか、落とすかのどちらか（並べ替えは起きない）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub event_type: EventType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_info: Option<PhaseInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_players: Vec<PlayerInfo>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_data: HashMap<String, String>,
    pub timestamp: i64,
    pub seq: u64,
}

// 連番とタイムスタンプが付く前のイベント本体
#[derive(Debug, Clone)]
pub struct EventBody {
    pub event_type: EventType,
    pub message: String,
    pub phase_info: Option<PhaseInfo>,
    pub affected_players: Vec<PlayerInfo>,
    pub extra_data: HashMap<String, String>,
}

impl EventBody {
    pub fn new(event_type: EventType, message: impl Into<String>) -> Self {
        EventBody {
            event_type,
            message: message.into(),
            phase_info: None,
            affected_players: Vec::new(),
            extra_data: HashMap::new(),
        }
    }

    pub fn with_phase(mut self, info: PhaseInfo) -> Self {
        self.phase_info = Some(info);
        self
    }

    pub fn with_players(mut self, players: Vec<PlayerInfo>) -> Self {
        self.affected_players = players;
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<String>) -> Self {
        self.extra_data.insert(key.to_string(), value.into());
        self
    }
}

// イベントの宛先。私的イベントを共有するグループは人狼のみ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    All,
    Player(String),
    Players(Vec<String>),
}

impl Recipient {
    pub fn includes(&self, player_id: &str) -> bool {
        match self {
            Recipient::All => true,
            Recipient::Player(id) => id == player_id,
            Recipient::Players(ids) => ids.iter().any(|id| id == player_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub recipient: Recipient,
    pub event: GameEvent,
}
