use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::models::event::{EventBody, EventType, PlayerInfo, Recipient};
use crate::models::phase::Phase;
use crate::models::role::{Camp, Role};
use crate::models::room::Room;
use crate::services::{game_service, room_service};
use crate::state::AppState;

enum Step {
    Finished,
    Wait(Arc<Notify>, u64),
}

// ゲーム主ループ
// ルームごとに1タスク。どちらかの陣営が勝つかルームが削除されるまで
// フェーズサイクルを進める
pub async fn run(state: AppState, room_id: String) {
    loop {
        let Ok(room) = state.room(&room_id).await else {
            tracing::info!(%room_id, "room evicted, controller stopping");
            return;
        };

        let step = {
            let mut room = room.write().await;
            if room.phase == Phase::GameOver {
                Step::Finished
            } else if let Some(winner) = game_service::check_victory(&room) {
                finish_game(&mut room, winner);
                Step::Finished
            } else {
                enter_phase(&mut room);
                let limit = room.phase.time_limit(&room.rules);
                Step::Wait(room.phase_signal(), limit)
            }
        };
        room_service::flush_events(&room).await;

        let (signal, limit) = match step {
            Step::Finished => {
                tracing::info!(%room_id, "game finished, controller stopping");
                return;
            }
            Step::Wait(signal, limit) => (signal, limit),
        };

        tokio::select! {
            _ = signal.notified() => {}
            _ = tokio::time::sleep(Duration::from_secs(limit)) => {
                tracing::debug!(%room_id, "phase deadline reached");
            }
        }

        {
            let mut room = room.write().await;
            if room.phase == Phase::GameOver {
                return;
            }
            advance_phase(&mut room);
        }
        room_service::flush_events(&room).await;
    }
}

// フェーズ開始処理
// 完了シグナルを張り直し、行動フラグを配り、手番を通知する。
// 行動できる者がいないフェーズは即座に完了扱い
pub fn enter_phase(room: &mut Room) {
    room.arm_phase_signal();
    room.night.acted.clear();

    match room.phase {
        Phase::NightGuard => enter_single_actor_phase(
            room,
            Role::Guard,
            "Guard, open your eyes and choose someone to protect",
        ),
        Phase::NightWerewolf => enter_werewolf_phase(room),
        Phase::NightWitch => enter_witch_phase(room),
        Phase::NightSeer => enter_single_actor_phase(
            room,
            Role::Seer,
            "Seer, open your eyes and choose someone to check",
        ),
        Phase::DayDiscussion => enter_discussion_phase(room),
        Phase::DayVoting => enter_voting_phase(room),
        Phase::DayLastWords => {
            let info = room.phase_info();
            room.broadcast(
                Recipient::All,
                EventBody::new(EventType::PhaseChanged, "A moment for final words")
                    .with_phase(info),
            );
        }
        Phase::Waiting | Phase::GameOver => {}
    }
}

fn enter_single_actor_phase(room: &mut Room, role: Role, message: &str) {
    let actor_ids: Vec<String> = room
        .living_with_role(role)
        .iter()
        .map(|p| p.id.clone())
        .collect();
    if actor_ids.is_empty() {
        room.signal_phase_complete();
        return;
    }
    for id in &actor_ids {
        if let Some(player) = room.players.get_mut(id) {
            player.can_act = true;
        }
    }
    let info = room.phase_info();
    room.broadcast(
        Recipient::Players(actor_ids),
        EventBody::new(EventType::YourTurn, message).with_phase(info),
    );
}

// 人狼フェーズは唯一のグループ手番。生存する人狼全員に、仲間の一覧と
// ともに通知する
fn enter_werewolf_phase(room: &mut Room) {
    let wolves = room.living_with_role(Role::Werewolf);
    let wolf_ids: Vec<String> = wolves.iter().map(|p| p.id.clone()).collect();
    let roster: Vec<PlayerInfo> = wolves.iter().map(|p| PlayerInfo::sanitized(p)).collect();
    if wolf_ids.is_empty() {
        room.signal_phase_complete();
        return;
    }
    for id in &wolf_ids {
        if let Some(player) = room.players.get_mut(id) {
            player.can_act = true;
        }
    }
    let info = room.phase_info();
    room.broadcast(
        Recipient::Players(wolf_ids),
        EventBody::new(
            EventType::YourTurn,
            "Werewolves, open your eyes and choose your prey",
        )
        .with_phase(info)
        .with_players(roster),
    );
}

fn enter_witch_phase(room: &mut Room) {
    let witch_ids: Vec<String> = room
        .living_with_role(Role::Witch)
        .iter()
        .map(|p| p.id.clone())
        .collect();
    if witch_ids.is_empty() {
        room.signal_phase_complete();
        return;
    }
    for id in &witch_ids {
        if let Some(player) = room.players.get_mut(id) {
            player.can_act = true;
        }
    }

    let victim = room.night.unguarded_victim().cloned();
    let message = match victim
        .as_ref()
        .and_then(|id| room.players.get(id))
    {
        Some(target) => format!(
            "Witch, {} (seat {}) was attacked tonight. Use the antidote?",
            target.name, target.position
        ),
        None => "Witch, the night is quiet so far".to_string(),
    };

    let info = room.phase_info();
    let save_available = !room.witch_save_used;
    let poison_available = !room.witch_poison_used;
    for id in witch_ids {
        let mut body = EventBody::new(EventType::YourTurn, message.clone())
            .with_phase(info.clone())
            .with_extra("save_available", save_available.to_string())
            .with_extra("poison_available", poison_available.to_string());
        if let Some(victim_id) = &victim {
            body = body.with_extra("victim_id", victim_id.clone());
        }
        room.broadcast(Recipient::Player(id), body);
    }
}

fn enter_discussion_phase(room: &mut Room) {
    let dead: Vec<PlayerInfo> = room
        .last_night_deaths
        .iter()
        .filter_map(|id| room.players.get(id))
        .map(PlayerInfo::sanitized)
        .collect();
    let message = if dead.is_empty() {
        "Day breaks. It was a peaceful night".to_string()
    } else {
        let names: Vec<String> = dead
            .iter()
            .map(|p| format!("{} (seat {})", p.name, p.position))
            .collect();
        format!("Day breaks. Last night {} died", names.join(", "))
    };
    let info = room.phase_info();
    room.broadcast(
        Recipient::All,
        EventBody::new(EventType::PhaseChanged, message)
            .with_phase(info)
            .with_players(dead),
    );
}

fn enter_voting_phase(room: &mut Room) {
    room.votes.clear();
    let living_ids: Vec<String> = room.living_players().map(|p| p.id.clone()).collect();
    for id in living_ids {
        if let Some(player) = room.players.get_mut(&id) {
            player.can_act = true;
        }
    }
    let info = room.phase_info();
    room.broadcast(
        Recipient::All,
        EventBody::new(
            EventType::PhaseChanged,
            "Vote for the player you believe is a werewolf",
        )
        .with_phase(info),
    );
}

// フェーズ終了処理と次フェーズへの遷移
// 遺言フェーズを過ぎて一巡したら日数を進めて新しい夜に入る
pub fn advance_phase(room: &mut Room) {
    for player in room.players.values_mut() {
        player.can_act = false;
    }

    match room.phase {
        Phase::NightSeer => resolve_night(room),
        Phase::DayVoting => resolve_votes(room),
        _ => {}
    }

    let (next, wrapped) = room.phase.next();
    if wrapped {
        room.day_count += 1;
        room.night.reset_for_new_night();
    }
    room.phase = next;
    room.state = next.game_state();
}

// 夜の結果の解決
// 固定の優先順で処理する: 人狼の襲撃 → 騎士の守護で無効化 →
// 魔女の解毒剤で無効化 → 魔女の毒。結果は夜の中での送信順に依存しない
fn resolve_night(room: &mut Room) {
    let mut deaths: Vec<String> = Vec::new();

    let mut victim = room.night.werewolf_target.clone();
    if victim.is_some() && victim == room.night.guard_target {
        victim = None;
    }
    if victim.is_some() && victim == room.night.witch_save_target {
        victim = None;
    }
    if let Some(victim) = victim {
        room.mark_dead(&victim);
        deaths.push(victim);
    }

    if let Some(poisoned) = room.night.witch_poison_target.clone() {
        let still_alive = room
            .players
            .get(&poisoned)
            .map(|p| p.is_alive)
            .unwrap_or(false);
        if still_alive {
            room.mark_dead(&poisoned);
            deaths.push(poisoned);
        }
    }

    room.last_night_deaths = deaths.clone();

    if deaths.is_empty() {
        room.broadcast(
            Recipient::All,
            EventBody::new(EventType::Peaceful, "Nobody died last night"),
        );
        return;
    }
    for id in deaths {
        if let Some(player) = room.players.get(&id) {
            let info = PlayerInfo::sanitized(player);
            let message = format!("{} (seat {}) died last night", player.name, player.position);
            room.broadcast(
                Recipient::All,
                EventBody::new(EventType::PlayerDied, message).with_players(vec![info]),
            );
        }
    }
}

fn resolve_votes(room: &mut Room) {
    match game_service::count_votes(room) {
        Some(voted_out) => {
            room.mark_dead(&voted_out);
            if let Some(player) = room.players.get(&voted_out) {
                let info = PlayerInfo::sanitized(player);
                let message = format!("{} (seat {}) was voted out", player.name, player.position);
                room.broadcast(
                    Recipient::All,
                    EventBody::new(EventType::PlayerDied, message).with_players(vec![info]),
                );
            }
        }
        None => {
            room.broadcast(
                Recipient::All,
                EventBody::new(
                    EventType::PhaseChanged,
                    "The vote was inconclusive; nobody was voted out",
                ),
            );
        }
    }
}

// ゲーム終了。全役職を公開し勝利陣営を通知する
pub fn finish_game(room: &mut Room, winner: Camp) {
    room.phase = Phase::GameOver;
    room.state = crate::models::phase::GameState::Finished;
    for player in room.players.values_mut() {
        player.can_act = false;
    }

    let mut revealed: Vec<PlayerInfo> =
        room.players.values().map(PlayerInfo::revealed).collect();
    revealed.sort_by_key(|p| p.position);

    let camp_name = match winner {
        Camp::WerewolfCamp => "werewolf",
        _ => "villager",
    };
    let info = room.phase_info();
    room.broadcast(
        Recipient::All,
        EventBody::new(
            EventType::GameOver,
            format!("Game over! The {} camp wins", camp_name),
        )
        .with_phase(info)
        .with_players(revealed)
        .with_extra("winner", winner.name()),
    );
}
