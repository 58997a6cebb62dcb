//! Durable storage for games, boards, moves and players

pub mod memory;
pub mod players;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::InMemoryStore;
pub use players::{Player, PlayerStore};

use uuid::Uuid;

use crate::game::{Board, GameSession, Move};

/// Storage errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Uniqueness clash on (game, player, x, y)
    #[error("Move ({x}, {y}) by player {player_id} in game {game_id} is already stored")]
    Duplicate {
        game_id: Uuid,
        player_id: Uuid,
        x: u8,
        y: u8,
    },

    /// Player names are unique
    #[error("Player name '{0}' is already taken")]
    NameTaken(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Durable store consumed by the engine.
///
/// Implementations must reject a second move with the same
/// (game, player, x, y) with [`StoreError::Duplicate`], and a second player
/// with an existing name with [`StoreError::NameTaken`].
pub trait GameStore: Send + Sync {
    fn load_game(&self, game_id: Uuid) -> Result<Option<GameSession>, StoreError>;

    fn save_game(&self, game: &GameSession) -> Result<(), StoreError>;

    /// Every game where the player holds either seat
    fn games_for_player(&self, player_id: Uuid) -> Result<Vec<GameSession>, StoreError>;

    /// Move history of a game, oldest first
    fn load_moves(&self, game_id: Uuid) -> Result<Vec<Move>, StoreError>;

    /// Persist a batch of moves; nothing is written if any of them is a duplicate
    fn save_moves(&self, moves: &[Move]) -> Result<(), StoreError>;

    fn move_exists(&self, game_id: Uuid, player_id: Uuid, x: u8, y: u8)
        -> Result<bool, StoreError>;

    fn load_board(&self, game_id: Uuid, player_id: Uuid) -> Result<Option<Board>, StoreError>;

    fn save_board(&self, game_id: Uuid, player_id: Uuid, board: &Board)
        -> Result<(), StoreError>;

    /// Insert a new player; the name check and the insert are one step
    fn insert_player(&self, player: &Player) -> Result<(), StoreError>;

    fn load_player(&self, player_id: Uuid) -> Result<Option<Player>, StoreError>;

    fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StoreError>;
}
