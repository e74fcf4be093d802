use std::collections::HashMap;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::models::event::{EventBody, EventType, PhaseInfo, PlayerInfo, Recipient};
use crate::models::phase::{GameState, Phase};
use crate::models::role::{Camp, Role};
use crate::models::room::Room;
use crate::services::{phase_service, room_service};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateResponse {
    pub room_id: String,
    pub state: GameState,
    pub phase_info: PhaseInfo,
    pub players: Vec<PlayerInfo>,
    pub day_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player: Option<PlayerInfo>,
}

// 役職の振り分け
// 設定された役職リストをゲームごとに再シードした乱数でシャッフルし、
// 参加順（座席順）のプレイヤーに割り当てる
pub fn assign_roles(room: &mut Room) -> Result<(), GameError> {
    let player_count = room.players.len();
    if room.role_config.total() != player_count {
        return Err(GameError::InvalidConfig(format!(
            "role counts sum to {}, but {} players joined",
            room.role_config.total(),
            player_count
        )));
    }
    if room.role_config.count(Role::Werewolf) == 0 {
        return Err(GameError::InvalidConfig(
            "at least one werewolf is required".to_string(),
        ));
    }
    if room.role_config.count(Role::Villager) == 0 {
        return Err(GameError::InvalidConfig(
            "at least one villager is required".to_string(),
        ));
    }

    let mut roles = room.role_config.flatten();
    let mut rng = StdRng::from_entropy();
    roles.shuffle(&mut rng);

    let mut seats: Vec<String> = room.players.keys().cloned().collect();
    seats.sort_by_key(|id| room.players[id].position);

    for (player_id, role) in seats.into_iter().zip(roles) {
        let player = room
            .players
            .get_mut(&player_id)
            .expect("seat order built from the player map");
        player.role = role;
        player.camp = role.camp();
    }
    Ok(())
}

// ゲームのライフサイクル管理
pub async fn start_game(state: &AppState, room_id: &str) -> Result<PhaseInfo, GameError> {
    let room = state.room(room_id).await?;
    let phase_info = {
        let mut room = room.write().await;
        if room.is_started() {
            return Err(GameError::GameAlreadyStarted);
        }
        assign_roles(&mut room)?;

        room.day_count = 1;
        room.state = GameState::Night;
        room.phase = Phase::NightGuard;

        let info = room.phase_info();
        room.broadcast(
            Recipient::All,
            EventBody::new(
                EventType::GameStarted,
                "The game has started. Night falls, everyone close your eyes...",
            )
            .with_phase(info.clone()),
        );
        info
    };
    room_service::flush_events(&room).await;

    tracing::info!(room_id, "game started");
    tokio::spawn(phase_service::run(state.clone(), room_id.to_string()));
    Ok(phase_info)
}

// 夜のアクション処理
// 役職とフェーズの組でディスパッチする。占い師の場合のみ私的な結果を返す
pub async fn submit_night_action(
    state: &AppState,
    room_id: &str,
    player_id: &str,
    target_id: Option<&str>,
    action_type: &str,
) -> Result<Option<String>, GameError> {
    let room = state.room(room_id).await?;
    let result = {
        let mut room = room.write().await;
        if room.state != GameState::Night {
            return Err(GameError::WrongPhase);
        }
        let player = room.player(player_id)?;
        if !player.is_alive {
            return Err(GameError::NotAlive);
        }
        let role = player.role;

        match role {
            Role::Guard => {
                submit_guard_action(&mut room, player_id, target_id, action_type)?;
                None
            }
            Role::Werewolf => {
                submit_werewolf_action(&mut room, player_id, target_id, action_type)?;
                None
            }
            Role::Witch => {
                submit_witch_action(&mut room, player_id, target_id, action_type)?;
                None
            }
            Role::Seer => Some(submit_seer_action(&mut room, player_id, target_id, action_type)?),
            _ => return Err(GameError::NotYourTurn),
        }
    };
    room_service::flush_events(&room).await;
    Ok(result)
}

// このフェーズで行動済みのプレイヤーは上書き送信できる。
// それ以外は行動フラグを持っている必要がある
fn ensure_may_act(room: &Room, player_id: &str) -> Result<(), GameError> {
    let player = room.player(player_id)?;
    if player.can_act || room.night.acted.contains(player_id) {
        Ok(())
    } else {
        Err(GameError::NotYourTurn)
    }
}

fn require_living_target<'a>(
    room: &'a Room,
    target_id: Option<&str>,
) -> Result<&'a crate::models::player::Player, GameError> {
    let target_id =
        target_id.ok_or_else(|| GameError::InvalidTarget("a target is required".to_string()))?;
    let target = room
        .players
        .get(target_id)
        .ok_or_else(|| GameError::InvalidTarget(format!("no such player: {}", target_id)))?;
    if !target.is_alive {
        return Err(GameError::InvalidTarget(format!(
            "{} is already dead",
            target.name
        )));
    }
    Ok(target)
}

fn submit_guard_action(
    room: &mut Room,
    player_id: &str,
    target_id: Option<&str>,
    action_type: &str,
) -> Result<(), GameError> {
    if room.phase != Phase::NightGuard {
        return Err(GameError::WrongPhase);
    }
    if action_type != "guard" {
        return Err(GameError::InvalidRequest(format!(
            "unexpected action_type {} for the guard",
            action_type
        )));
    }
    ensure_may_act(room, player_id)?;
    let target_id = require_living_target(room, target_id)?.id.clone();

    if !room.rules.allow_repeat_guard
        && room.night.previous_guard_target.as_deref() == Some(target_id.as_str())
    {
        return Err(GameError::InvalidTarget(
            "the guard cannot protect the same player on two consecutive nights".to_string(),
        ));
    }

    room.night.guard_target = Some(target_id);
    record_actor(room, player_id);
    room.signal_phase_complete();
    Ok(())
}

fn submit_werewolf_action(
    room: &mut Room,
    player_id: &str,
    target_id: Option<&str>,
    action_type: &str,
) -> Result<(), GameError> {
    if room.phase != Phase::NightWerewolf {
        return Err(GameError::WrongPhase);
    }
    if action_type != "kill" {
        return Err(GameError::InvalidRequest(format!(
            "unexpected action_type {} for a werewolf",
            action_type
        )));
    }
    ensure_may_act(room, player_id)?;
    let target_id = require_living_target(room, target_id)?.id.clone();

    // 複数の人狼が送信した場合は最後の上書きが勝つ
    room.night.werewolf_target = Some(target_id);
    record_actor(room, player_id);

    let all_acted = room
        .living_with_role(Role::Werewolf)
        .iter()
        .all(|wolf| room.night.acted.contains(&wolf.id));
    if all_acted {
        room.signal_phase_complete();
    }
    Ok(())
}

fn submit_witch_action(
    room: &mut Room,
    player_id: &str,
    target_id: Option<&str>,
    action_type: &str,
) -> Result<(), GameError> {
    if room.phase != Phase::NightWitch {
        return Err(GameError::WrongPhase);
    }
    ensure_may_act(room, player_id)?;

    match action_type {
        "save" => {
            // 「使用済み」は前の夜までに使った場合のみ。今夜記録した解毒剤は
            // 同一内容の再送信で上書きできる
            if room.witch_save_used && room.night.witch_save_target.is_none() {
                return Err(GameError::PotionExhausted);
            }
            let victim = room
                .night
                .unguarded_victim()
                .cloned()
                .ok_or_else(|| {
                    GameError::InvalidTarget("there is nobody to save tonight".to_string())
                })?;
            let target_id = target_id
                .ok_or_else(|| GameError::InvalidTarget("a target is required".to_string()))?;
            if target_id != victim {
                return Err(GameError::InvalidTarget(
                    "the antidote can only save tonight's victim".to_string(),
                ));
            }
            if target_id == player_id && room.day_count > 1 && !room.rules.allow_witch_self_save {
                return Err(GameError::InvalidTarget(
                    "the witch cannot save herself after the first night".to_string(),
                ));
            }
            room.night.witch_save_target = Some(victim);
            room.witch_save_used = true;
        }
        "poison" => {
            if room.witch_poison_used && room.night.witch_poison_target.is_none() {
                return Err(GameError::PotionExhausted);
            }
            let target_id = require_living_target(room, target_id)?.id.clone();
            room.night.witch_poison_target = Some(target_id);
            room.witch_poison_used = true;
        }
        "skip" => {}
        other => {
            return Err(GameError::InvalidRequest(format!(
                "unexpected action_type {} for the witch",
                other
            )));
        }
    }

    record_actor(room, player_id);
    room.signal_phase_complete();
    Ok(())
}

fn submit_seer_action(
    room: &mut Room,
    player_id: &str,
    target_id: Option<&str>,
    action_type: &str,
) -> Result<String, GameError> {
    if room.phase != Phase::NightSeer {
        return Err(GameError::WrongPhase);
    }
    if action_type != "check" {
        return Err(GameError::InvalidRequest(format!(
            "unexpected action_type {} for the seer",
            action_type
        )));
    }
    ensure_may_act(room, player_id)?;
    let target = require_living_target(room, target_id)?;
    if target.id == player_id {
        return Err(GameError::InvalidTarget(
            "the seer cannot check herself".to_string(),
        ));
    }

    let answer = if target.camp == Camp::WerewolfCamp {
        "werewolf"
    } else {
        "good"
    };
    let target_id = target.id.clone();
    let target_name = target.name.clone();

    room.broadcast(
        Recipient::Player(player_id.to_string()),
        EventBody::new(
            EventType::PrivateResult,
            format!("{} is {}", target_name, answer),
        )
        .with_extra("target_player_id", target_id)
        .with_extra("result", answer),
    );

    record_actor(room, player_id);
    room.signal_phase_complete();
    Ok(answer.to_string())
}

fn record_actor(room: &mut Room, player_id: &str) {
    room.night.acted.insert(player_id.to_string());
    if let Some(player) = room.players.get_mut(player_id) {
        player.can_act = false;
    }
}

// 投票処理
// 同じ投票者の再投票は上書き。生存者全員が投票するとフェーズ完了
pub async fn submit_vote(
    state: &AppState,
    room_id: &str,
    voter_id: &str,
    target_id: &str,
) -> Result<(), GameError> {
    let room = state.room(room_id).await?;
    let mut room = room.write().await;

    if room.phase != Phase::DayVoting {
        return Err(GameError::WrongPhase);
    }
    let voter = room.player(voter_id)?;
    if !voter.is_alive {
        return Err(GameError::NotAlive);
    }
    if voter_id == target_id {
        return Err(GameError::InvalidTarget(
            "you cannot vote for yourself".to_string(),
        ));
    }
    let target_id = require_living_target(&room, Some(target_id))?.id.clone();

    room.votes.insert(voter_id.to_string(), target_id);

    let all_voted = room
        .living_players()
        .all(|p| room.votes.contains_key(&p.id));
    if all_voted {
        room.signal_phase_complete();
    }
    Ok(())
}

// 開票。単独最多のみ追放。最多が並んだ場合はこのラウンドの追放なし
pub fn count_votes(room: &Room) -> Option<String> {
    let mut tally: HashMap<&str, usize> = HashMap::new();
    for target in room.votes.values() {
        *tally.entry(target.as_str()).or_insert(0) += 1;
    }
    let top = tally.values().max().copied()?;
    let mut leaders = tally.iter().filter(|(_, count)| **count == top);
    let leader = leaders.next()?.0.to_string();
    if leaders.next().is_some() {
        return None;
    }
    Some(leader)
}

// 勝利判定
// 人狼全滅なら村人陣営、人狼数 >= その他の生存者数なら人狼陣営の勝利
pub fn check_victory(room: &Room) -> Option<Camp> {
    let werewolves = room
        .living_players()
        .filter(|p| p.camp == Camp::WerewolfCamp)
        .count();
    let others = room.living_players().count() - werewolves;

    if werewolves == 0 {
        Some(Camp::VillagerCamp)
    } else if werewolves >= others {
        Some(Camp::WerewolfCamp)
    } else {
        None
    }
}

// ゲーム状態の取得
// プレイヤー自身の役職のみ見える。ゲーム終了後は全役職を公開する
pub async fn get_game_state(
    state: &AppState,
    room_id: &str,
    viewer_id: &str,
) -> Result<GameStateResponse, GameError> {
    let room = state.room(room_id).await?;
    let room = room.read().await;

    let reveal_all = room.phase == Phase::GameOver;
    let mut players: Vec<PlayerInfo> = room
        .players
        .values()
        .map(|p| {
            if reveal_all || p.id == viewer_id {
                PlayerInfo::revealed(p)
            } else {
                PlayerInfo::sanitized(p)
            }
        })
        .collect();
    players.sort_by_key(|p| p.position);

    let current_player = room
        .players
        .get(viewer_id)
        .map(PlayerInfo::revealed);

    Ok(GameStateResponse {
        room_id: room.id.clone(),
        state: room.state,
        phase_info: room.phase_info(),
        players,
        day_count: room.day_count,
        current_player,
    })
}
