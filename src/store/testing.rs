//! Store wrapper with switchable faults for tests

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use uuid::Uuid;

use super::{GameStore, InMemoryStore, Player, StoreError};
use crate::game::{Board, GameSession, Move};

#[derive(Default)]
pub(crate) struct FaultyStore {
    pub inner: InMemoryStore,
    /// Every `save_board` fails while set
    pub fail_board_saves: AtomicBool,
    /// Persisted by "another writer" just before the next `save_moves`
    pub write_ahead: Mutex<Option<Move>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_board_saves_failing(&self, failing: bool) {
        self.fail_board_saves.store(failing, Ordering::SeqCst);
    }
}

impl GameStore for FaultyStore {
    fn load_game(&self, game_id: Uuid) -> Result<Option<GameSession>, StoreError> {
        self.inner.load_game(game_id)
    }

    fn save_game(&self, game: &GameSession) -> Result<(), StoreError> {
        self.inner.save_game(game)
    }

    fn games_for_player(&self, player_id: Uuid) -> Result<Vec<GameSession>, StoreError> {
        self.inner.games_for_player(player_id)
    }

    fn load_moves(&self, game_id: Uuid) -> Result<Vec<Move>, StoreError> {
        self.inner.load_moves(game_id)
    }

    fn save_moves(&self, moves: &[Move]) -> Result<(), StoreError> {
        if let Some(mv) = self.write_ahead.lock().take() {
            self.inner.save_moves(std::slice::from_ref(&mv))?;
        }
        self.inner.save_moves(moves)
    }

    fn move_exists(&self, game_id: Uuid, player_id: Uuid, x: u8, y: u8) -> Result<bool, StoreError> {
        self.inner.move_exists(game_id, player_id, x, y)
    }

    fn load_board(&self, game_id: Uuid, player_id: Uuid) -> Result<Option<Board>, StoreError> {
        self.inner.load_board(game_id, player_id)
    }

    fn save_board(&self, game_id: Uuid, player_id: Uuid, board: &Board) -> Result<(), StoreError> {
        if self.fail_board_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("board write refused".to_string()));
        }
        self.inner.save_board(game_id, player_id, board)
    }

    fn insert_player(&self, player: &Player) -> Result<(), StoreError> {
        self.inner.insert_player(player)
    }

    fn load_player(&self, player_id: Uuid) -> Result<Option<Player>, StoreError> {
        self.inner.load_player(player_id)
    }

    fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StoreError> {
        self.inner.find_player_by_name(name)
    }
}
