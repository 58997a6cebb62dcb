//! In-process store backed by concurrent maps

use std::collections::HashSet;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{GameStore, Player, StoreError};
use crate::game::{Board, GameSession, Move};

type MoveKey = (Uuid, Uuid, u8, u8);

/// Moves are kept as one table guarded by a single lock so that a batch
/// insert and its uniqueness check are atomic.
#[derive(Default)]
struct MoveTable {
    rows: Vec<Move>,
    keys: HashSet<MoveKey>,
}

/// Durable store held in memory. Boards are kept in their string encoding.
#[derive(Default)]
pub struct InMemoryStore {
    games: DashMap<Uuid, GameSession>,
    boards: DashMap<(Uuid, Uuid), String>,
    moves: Mutex<MoveTable>,
    players: DashMap<Uuid, Player>,
    /// Unique name index; its entry lock makes name claims atomic
    player_names: DashMap<String, Uuid>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for InMemoryStore {
    fn load_game(&self, game_id: Uuid) -> Result<Option<GameSession>, StoreError> {
        Ok(self.games.get(&game_id).map(|g| g.value().clone()))
    }

    fn save_game(&self, game: &GameSession) -> Result<(), StoreError> {
        self.games.insert(game.id, game.clone());
        Ok(())
    }

    fn games_for_player(&self, player_id: Uuid) -> Result<Vec<GameSession>, StoreError> {
        let mut games: Vec<GameSession> = self
            .games
            .iter()
            .filter(|entry| entry.value().has_player(player_id))
            .map(|entry| entry.value().clone())
            .collect();
        games.sort_by_key(|g| g.created_at);
        Ok(games)
    }

    fn load_moves(&self, game_id: Uuid) -> Result<Vec<Move>, StoreError> {
        let table = self.moves.lock();
        let mut moves: Vec<Move> = table
            .rows
            .iter()
            .filter(|m| m.game_id == game_id)
            .cloned()
            .collect();
        // stable, so insertion order breaks timestamp ties
        moves.sort_by_key(|m| m.created_at);
        Ok(moves)
    }

    fn save_moves(&self, moves: &[Move]) -> Result<(), StoreError> {
        let mut table = self.moves.lock();

        let mut batch = HashSet::with_capacity(moves.len());
        for m in moves {
            if table.keys.contains(&m.key()) || !batch.insert(m.key()) {
                return Err(StoreError::Duplicate {
                    game_id: m.game_id,
                    player_id: m.player_id,
                    x: m.x,
                    y: m.y,
                });
            }
        }

        table.keys.extend(batch);
        table.rows.extend_from_slice(moves);
        Ok(())
    }

    fn move_exists(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        x: u8,
        y: u8,
    ) -> Result<bool, StoreError> {
        Ok(self.moves.lock().keys.contains(&(game_id, player_id, x, y)))
    }

    fn load_board(&self, game_id: Uuid, player_id: Uuid) -> Result<Option<Board>, StoreError> {
        match self.boards.get(&(game_id, player_id)) {
            Some(encoded) => Board::decode(encoded.value())
                .map(Some)
                .map_err(|e| StoreError::Backend(e.to_string())),
            None => Ok(None),
        }
    }

    fn save_board(&self, game_id: Uuid, player_id: Uuid, board: &Board) -> Result<(), StoreError> {
        self.boards.insert((game_id, player_id), board.encode());
        Ok(())
    }

    fn insert_player(&self, player: &Player) -> Result<(), StoreError> {
        match self.player_names.entry(player.name.clone()) {
            Entry::Occupied(_) => Err(StoreError::NameTaken(player.name.clone())),
            Entry::Vacant(slot) => {
                // record first so the claim is never visible without its player
                self.players.insert(player.id, player.clone());
                slot.insert(player.id);
                Ok(())
            }
        }
    }

    fn load_player(&self, player_id: Uuid) -> Result<Option<Player>, StoreError> {
        Ok(self.players.get(&player_id).map(|p| p.value().clone()))
    }

    fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StoreError> {
        let Some(id) = self.player_names.get(name).map(|id| *id.value()) else {
            return Ok(None);
        };
        self.load_player(id)
    }
}
