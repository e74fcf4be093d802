use serde::{Deserialize, Serialize};

use super::room::GameRules;

// フェーズの進行順。遺言の後は日数を進めて騎士の夜に戻る
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "PHASE_WAITING")]
    Waiting,
    #[serde(rename = "PHASE_NIGHT_GUARD")]
    NightGuard,
    #[serde(rename = "PHASE_NIGHT_WEREWOLF")]
    NightWerewolf,
    #[serde(rename = "PHASE_NIGHT_WITCH")]
    NightWitch,
    #[serde(rename = "PHASE_NIGHT_SEER")]
    NightSeer,
    #[serde(rename = "PHASE_DAY_DISCUSSION")]
    DayDiscussion,
    #[serde(rename = "PHASE_DAY_VOTING")]
    DayVoting,
    #[serde(rename = "PHASE_DAY_LAST_WORDS")]
    DayLastWords,
    #[serde(rename = "PHASE_GAME_OVER")]
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    #[serde(rename = "WAITING")]
    Waiting,
    #[serde(rename = "NIGHT")]
    Night,
    #[serde(rename = "DAY")]
    Day,
    #[serde(rename = "FINISHED")]
    Finished,
}

impl Phase {
    // 次のフェーズ。新しい夜に一巡した場合は wrapped = true
    pub fn next(&self) -> (Phase, bool) {
        match self {
            Phase::Waiting => (Phase::NightGuard, false),
            Phase::NightGuard => (Phase::NightWerewolf, false),
            Phase::NightWerewolf => (Phase::NightWitch, false),
            Phase::NightWitch => (Phase::NightSeer, false),
            Phase::NightSeer => (Phase::DayDiscussion, false),
            Phase::DayDiscussion => (Phase::DayVoting, false),
            Phase::DayVoting => (Phase::DayLastWords, false),
            Phase::DayLastWords => (Phase::NightGuard, true),
            Phase::GameOver => (Phase::GameOver, false),
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Phase::Waiting => "PHASE_WAITING",
            Phase::NightGuard => "PHASE_NIGHT_GUARD",
            Phase::NightWerewolf => "PHASE_NIGHT_WEREWOLF",
            Phase::NightWitch => "PHASE_NIGHT_WITCH",
            Phase::NightSeer => "PHASE_NIGHT_SEER",
            Phase::DayDiscussion => "PHASE_DAY_DISCUSSION",
            Phase::DayVoting => "PHASE_DAY_VOTING",
            Phase::DayLastWords => "PHASE_DAY_LAST_WORDS",
            Phase::GameOver => "PHASE_GAME_OVER",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Waiting => "Waiting for players",
            Phase::NightGuard => "Guard's turn",
            Phase::NightWerewolf => "Werewolves' turn",
            Phase::NightWitch => "Witch's turn",
            Phase::NightSeer => "Seer's turn",
            Phase::DayDiscussion => "Day discussion",
            Phase::DayVoting => "Voting",
            Phase::DayLastWords => "Last words",
            Phase::GameOver => "Game over",
        }
    }

    pub fn game_state(&self) -> GameState {
        match self {
            Phase::Waiting => GameState::Waiting,
            Phase::NightGuard
            | Phase::NightWerewolf
            | Phase::NightWitch
            | Phase::NightSeer => GameState::Night,
            Phase::DayDiscussion | Phase::DayVoting | Phase::DayLastWords => GameState::Day,
            Phase::GameOver => GameState::Finished,
        }
    }

    pub fn time_limit(&self, rules: &GameRules) -> u64 {
        match self {
            Phase::DayDiscussion => rules.discussion_seconds,
            Phase::DayLastWords => rules.last_words_seconds,
            _ => rules.action_seconds,
        }
    }

    pub fn is_night_action_phase(&self) -> bool {
        matches!(
            self,
            Phase::NightGuard | Phase::NightWerewolf | Phase::NightWitch | Phase::NightSeer
        )
    }
}
