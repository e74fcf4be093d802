use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, Notify};

use crate::error::GameError;
use crate::utils::config::CONFIG;

use super::event::{EventBody, GameEvent, OutboundEvent, PhaseInfo, Recipient};
use super::phase::{GameState, Phase};
use super::player::Player;
use super::role::Role;

// 購読者ごとのイベントキューの深さ
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 100;

// 役職構成。境界でワイヤ上の役職名から組み立てる
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleConfig {
    counts: HashMap<Role, usize>,
}

impl RoleConfig {
    pub fn from_names(names: &HashMap<String, usize>) -> Result<Self, GameError> {
        let mut counts = HashMap::new();
        for (name, count) in names {
            let role = Role::from_name(name)?;
            *counts.entry(role).or_insert(0) += count;
        }
        Ok(RoleConfig { counts })
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn count(&self, role: Role) -> usize {
        self.counts.get(&role).copied().unwrap_or(0)
    }

    // 座席数ぶんの役職リスト（シャッフル前は安定した順序）
    pub fn flatten(&self) -> Vec<Role> {
        let mut roles = Vec::with_capacity(self.total());
        let order = [
            Role::Werewolf,
            Role::Villager,
            Role::Seer,
            Role::Witch,
            Role::Hunter,
            Role::Guard,
        ];
        for role in order {
            roles.extend(std::iter::repeat(role).take(self.count(role)));
        }
        roles
    }

    pub fn to_names(&self) -> HashMap<String, usize> {
        self.counts
            .iter()
            .map(|(role, count)| (role.name().to_string(), *count))
            .collect()
    }
}

// ゲームルール。デフォルトはプロセス設定から取る
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRules {
    pub action_seconds: u64,
    pub discussion_seconds: u64,
    pub last_words_seconds: u64,
    // 騎士が二夜連続で同じプレイヤーを守れるか
    pub allow_repeat_guard: bool,
    // 魔女が初夜以降に自分を救えるか
    pub allow_witch_self_save: bool,
}

impl Default for GameRules {
    fn default() -> Self {
        GameRules {
            action_seconds: CONFIG.action_seconds,
            discussion_seconds: CONFIG.discussion_seconds,
            last_words_seconds: CONFIG.last_words_seconds,
            allow_repeat_guard: false,
            allow_witch_self_save: false,
        }
    }
}

// 夜のアクション記録。夜ごとにリセットする。
// 魔女の薬の使用フラグはゲーム全体で永続するためRoom側に持つ
#[derive(Debug, Clone, Default)]
pub struct NightRecord {
    pub guard_target: Option<String>,
    // 前夜の守護対象。連続守護の禁止チェック用
    pub previous_guard_target: Option<String>,
    pub werewolf_target: Option<String>,
    pub witch_save_target: Option<String>,
    pub witch_poison_target: Option<String>,
    // 現在のフェーズで行動済みのプレイヤー。再送信は上書きになる
    pub acted: HashSet<String>,
}

impl NightRecord {
    pub fn reset_for_new_night(&mut self) {
        self.previous_guard_target = self.guard_target.take();
        self.werewolf_target = None;
        self.witch_save_target = None;
        self.witch_poison_target = None;
        self.acted.clear();
    }

    // 今夜の襲撃対象。騎士に守られている場合はなし
    pub fn unguarded_victim(&self) -> Option<&String> {
        match (&self.werewolf_target, &self.guard_target) {
            (Some(victim), Some(guarded)) if victim == guarded => None,
            (Some(victim), _) => Some(victim),
            (None, _) => None,
        }
    }
}

pub struct Room {
    pub id: String,
    pub name: String,
    pub max_players: usize,
    pub role_config: RoleConfig,
    pub rules: GameRules,
    pub players: HashMap<String, Player>,
    pub state: GameState,
    pub phase: Phase,
    pub day_count: u32,
    pub night: NightRecord,
    pub witch_save_used: bool,
    pub witch_poison_used: bool,
    // voter_id -> target_id。投票フェーズ開始時にクリアする
    pub votes: HashMap<String, String>,
    pub dead_players: HashSet<String>,
    // 直近の夜の死者。昼のアナウンス用
    pub last_night_deaths: Vec<String>,
    subscribers: HashMap<String, mpsc::Sender<GameEvent>>,
    // 現在フェーズの完了シグナル。フェーズ開始ごとに張り直すことで
    // 前フェーズの古いシグナルが漏れないようにする
    phase_signal: Arc<Notify>,
    // 配信の直列化ゲート。ロック解放後の投入どうしが追い越し合って
    // seq 順が崩れるのを防ぐ
    delivery_gate: Arc<Mutex<()>>,
    seq: u64,
    outbox: Vec<OutboundEvent>,
}

impl Room {
    pub fn new(id: String, name: String, max_players: usize, role_config: RoleConfig) -> Self {
        Room {
            id,
            name,
            max_players,
            role_config,
            rules: GameRules::default(),
            players: HashMap::new(),
            state: GameState::Waiting,
            phase: Phase::Waiting,
            day_count: 0,
            night: NightRecord::default(),
            witch_save_used: false,
            witch_poison_used: false,
            votes: HashMap::new(),
            dead_players: HashSet::new(),
            last_night_deaths: Vec::new(),
            subscribers: HashMap::new(),
            phase_signal: Arc::new(Notify::new()),
            delivery_gate: Arc::new(Mutex::new(())),
            seq: 0,
            outbox: Vec::new(),
        }
    }

    pub fn living_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.is_alive)
    }

    pub fn living_with_role(&self, role: Role) -> Vec<&Player> {
        let mut players: Vec<&Player> = self
            .living_players()
            .filter(|p| p.role == role)
            .collect();
        players.sort_by_key(|p| p.position);
        players
    }

    pub fn player(&self, player_id: &str) -> Result<&Player, GameError> {
        self.players
            .get(player_id)
            .ok_or_else(|| GameError::NotFound(format!("player {} not in room", player_id)))
    }

    pub fn mark_dead(&mut self, player_id: &str) {
        if let Some(player) = self.players.get_mut(player_id) {
            player.is_alive = false;
            player.can_act = false;
        }
        self.dead_players.insert(player_id.to_string());
    }

    pub fn phase_info(&self) -> PhaseInfo {
        PhaseInfo {
            current_phase: self.phase,
            phase_name: self.phase.display_name().to_string(),
            time_limit_seconds: self.phase.time_limit(&self.rules),
        }
    }

    // 連番とタイムスタンプを付けて配信待ちに積む。実際の配信はロック外
    pub fn broadcast(&mut self, recipient: Recipient, body: EventBody) {
        self.seq += 1;
        let event = GameEvent {
            event_type: body.event_type,
            message: body.message,
            phase_info: body.phase_info,
            affected_players: body.affected_players,
            extra_data: body.extra_data,
            timestamp: Utc::now().timestamp(),
            seq: self.seq,
        };
        self.outbox.push(OutboundEvent { recipient, event });
    }

    // 配信待ちイベントと購読者一覧を取り出す。呼び出し側はロックを
    // 解放してからキューへ投入する
    pub fn drain_outbox(&mut self) -> (Vec<OutboundEvent>, HashMap<String, mpsc::Sender<GameEvent>>) {
        (std::mem::take(&mut self.outbox), self.subscribers.clone())
    }

    pub fn subscribe(&mut self, player_id: &str) -> mpsc::Receiver<GameEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        self.subscribers.insert(player_id.to_string(), tx);
        rx
    }

    pub fn unsubscribe(&mut self, player_id: &str) {
        self.subscribers.remove(player_id);
    }

    pub fn close_subscribers(&mut self) {
        self.subscribers.clear();
    }

    // 現在フェーズの完了ハンドル。コントローラはフェーズ開始直後に
    // クローンして自分のコピーを待つ
    pub fn phase_signal(&self) -> Arc<Notify> {
        self.phase_signal.clone()
    }

    pub fn delivery_gate(&self) -> Arc<Mutex<()>> {
        self.delivery_gate.clone()
    }

    pub fn arm_phase_signal(&mut self) {
        self.phase_signal = Arc::new(Notify::new());
    }

    pub fn signal_phase_complete(&self) {
        self.phase_signal.notify_one();
    }

    pub fn is_started(&self) -> bool {
        self.state != GameState::Waiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, usize)]) -> RoleConfig {
        let names: HashMap<String, usize> = pairs
            .iter()
            .map(|(name, count)| (name.to_string(), *count))
            .collect();
        RoleConfig::from_names(&names).unwrap()
    }

    #[test]
    fn role_config_flattens_to_total() {
        let cfg = config(&[("werewolf", 2), ("villager", 3), ("seer", 1)]);
        assert_eq!(cfg.total(), 6);
        let flat = cfg.flatten();
        assert_eq!(flat.len(), 6);
        assert_eq!(flat.iter().filter(|r| **r == Role::Werewolf).count(), 2);
    }

    #[test]
    fn night_record_rollover_keeps_guard_history() {
        let mut night = NightRecord::default();
        night.guard_target = Some("p2".to_string());
        night.werewolf_target = Some("p5".to_string());
        night.acted.insert("p1".to_string());

        night.reset_for_new_night();

        assert_eq!(night.previous_guard_target.as_deref(), Some("p2"));
        assert!(night.guard_target.is_none());
        assert!(night.werewolf_target.is_none());
        assert!(night.acted.is_empty());
    }

    #[test]
    fn unguarded_victim_respects_guard() {
        let mut night = NightRecord::default();
        night.werewolf_target = Some("p5".to_string());
        night.guard_target = Some("p5".to_string());
        assert!(night.unguarded_victim().is_none());

        night.guard_target = Some("p6".to_string());
        assert_eq!(night.unguarded_victim().map(String::as_str), Some("p5"));
    }

    #[test]
    fn broadcast_assigns_increasing_sequence() {
        let mut room = Room::new(
            "r1".to_string(),
            "test".to_string(),
            6,
            config(&[("werewolf", 1), ("villager", 5)]),
        );
        room.broadcast(
            Recipient::All,
            EventBody::new(crate::models::event::EventType::Peaceful, "a"),
        );
        room.broadcast(
            Recipient::All,
            EventBody::new(crate::models::event::EventType::Peaceful, "b"),
        );
        let (events, _) = room.drain_outbox();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event.seq, 1);
        assert_eq!(events[1].event.seq, 2);
        let (events, _) = room.drain_outbox();
        assert!(events.is_empty());
    }
}
