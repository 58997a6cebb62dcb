//! Game engine: board model, placement rules, move cache, turn resolution,
//! AI opponent and per-request orchestration

pub mod ai;
pub mod board;
pub mod cache;
pub mod error;
pub mod locks;
pub mod placement;
pub mod resolver;
pub mod service;
pub mod session;

pub use ai::AiPlayer;
pub use board::Board;
pub use error::GameError;
pub use service::{GameService, MoveReport, MoveRequest};
pub use session::{GameSession, GameStatus, GameType, Move, MoveResult};
