use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

// ゲームエンジンのエラー。各バリアントはワイヤ上では文字列コードと
// 人間向けメッセージになる。秘匿情報は含めない
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("room is full")]
    RoomFull,

    #[error("game has already started")]
    GameAlreadyStarted,

    #[error("action not allowed in the current phase")]
    WrongPhase,

    #[error("dead players cannot act")]
    NotAlive,

    #[error("it is not your turn to act")]
    NotYourTurn,

    #[error("that potion has already been used")]
    PotionExhausted,

    #[error("{0}")]
    InvalidTarget(String),

    #[error("{0}")]
    InvalidConfig(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidRequest(_) => "invalid_request",
            GameError::NotFound(_) => "not_found",
            GameError::RoomFull => "room_full",
            GameError::GameAlreadyStarted => "game_already_started",
            GameError::WrongPhase => "wrong_phase",
            GameError::NotAlive => "not_alive",
            GameError::NotYourTurn => "not_your_turn",
            GameError::PotionExhausted => "potion_exhausted",
            GameError::InvalidTarget(_) => "invalid_target",
            GameError::InvalidConfig(_) => "invalid_config",
            GameError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_vocabulary() {
        assert_eq!(GameError::WrongPhase.code(), "wrong_phase");
        assert_eq!(GameError::PotionExhausted.code(), "potion_exhausted");
        assert_eq!(
            GameError::InvalidTarget("x".to_string()).code(),
            "invalid_target"
        );
        assert_eq!(
            GameError::NotFound("room".to_string()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
