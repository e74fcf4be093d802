pub mod game_service;
pub mod phase_service;
pub mod room_service;
