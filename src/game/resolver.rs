//! Turn order and shot resolution
//!
//! Turn state is derived from the move cache alone: nobody has fired yet
//! means player 1 is up, a `HIT`/`SUNK` keeps the turn with the shooter and
//! anything else hands it to the other seat.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::board::{in_bounds, Cell};
use super::cache::MoveCache;
use super::error::GameError;
use super::locks::GameLocks;
use super::session::{GameSession, GameType, Move, MoveResult};
use crate::store::GameStore;

/// Validates and applies shots. Every resolution for a game runs under that
/// game's lock, from the first check through the completion flush.
pub struct MoveResolver {
    store: Arc<dyn GameStore>,
    cache: Arc<MoveCache>,
    locks: Arc<GameLocks>,
}

impl MoveResolver {
    pub fn new(store: Arc<dyn GameStore>, cache: Arc<MoveCache>, locks: Arc<GameLocks>) -> Self {
        Self {
            store,
            cache,
            locks,
        }
    }

    pub fn cache(&self) -> &MoveCache {
        &self.cache
    }

    pub fn load_game(&self, game_id: Uuid) -> Result<GameSession, GameError> {
        self.store
            .load_game(game_id)?
            .ok_or(GameError::GameNotFound(game_id))
    }

    /// Lock of a game that exists and is not finished. Unknown and finished
    /// games never get an entry in the lock registry.
    pub fn live_lock(&self, game_id: Uuid) -> Result<Arc<Mutex<()>>, GameError> {
        let game = self.load_game(game_id)?;
        if game.is_finished() {
            return Err(GameError::GameFinished(game_id));
        }
        Ok(self.locks.get(game_id))
    }

    /// Reload the game once its lock is held. If it finished in the
    /// meantime, the entry recreated by `live_lock` is dropped again.
    pub fn load_live_game(&self, game_id: Uuid) -> Result<GameSession, GameError> {
        let game = self.load_game(game_id)?;
        if game.is_finished() {
            self.locks.release_unused(game_id);
            return Err(GameError::GameFinished(game_id));
        }
        Ok(game)
    }

    /// Whose turn it is, from the cached history
    pub fn current_player(&self, game: &GameSession) -> Uuid {
        match self.cache.last(game.id) {
            None => game.player1,
            Some(last) if last.result.keeps_turn() => last.player_id,
            Some(last) => game.opponent_of(last.player_id).unwrap_or(game.player1),
        }
    }

    /// Fire at (x, y) on the opponent's board.
    ///
    /// Failures leave the cache, boards and game untouched.
    pub fn resolve_move(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        x: i32,
        y: i32,
    ) -> Result<MoveResult, GameError> {
        let lock = self.live_lock(game_id)?;
        let _guard = lock.lock();

        let mut game = self.load_live_game(game_id)?;
        // no-op unless the entry was lost, e.g. after a restart
        self.cache.initialize(game_id)?;

        if !in_bounds(x, y) {
            return Err(GameError::OutOfRange { x, y });
        }
        let (x, y) = (x as u8, y as u8);

        let opponent = match game.player2 {
            None => return Err(GameError::GameNotStarted(game_id)),
            Some(_) => game
                .opponent_of(player_id)
                .ok_or(GameError::NotParticipant { game_id, player_id })?,
        };

        // the shooter must have a fleet of their own
        if self.store.load_board(game_id, player_id)?.is_none() {
            return Err(GameError::BoardNotFound { game_id, player_id });
        }

        if game.game_type == GameType::PvP && self.current_player(&game) != player_id {
            return Err(GameError::NotPlayersTurn(player_id));
        }

        if self.cache.contains_shot(game_id, player_id, x, y) {
            return Err(GameError::CellAlreadyAttacked { x, y });
        }

        let mut board = self
            .store
            .load_board(game_id, opponent)?
            .ok_or(GameError::BoardNotFound {
                game_id,
                player_id: opponent,
            })?;

        let (cx, cy) = (x as usize, y as usize);
        let hit = board.get(cx, cy)? == Cell::Ship;
        let mut result = MoveResult::Miss;
        if hit {
            board.mark_hit(cx, cy)?;
            result = if board.is_sunk(cx, cy)? {
                MoveResult::Sunk
            } else {
                MoveResult::Hit
            };
        }

        // persisted before the move is cached
        if hit {
            self.store.save_board(game_id, opponent, &board)?;
        }
        self.cache
            .append(game_id, Move::new(game_id, player_id, x, y, result));

        if hit && board.all_ships_sunk() {
            self.finish_game(&mut game, player_id)?;
        }

        info!(game_id = %game_id, player_id = %player_id, x, y, result = ?result, "Move resolved");
        Ok(result)
    }

    /// Terminal transition: persist the winner, flush the cached log, drop it.
    /// Runs under the game lock held by `resolve_move`.
    fn finish_game(&self, game: &mut GameSession, winner: Uuid) -> Result<(), GameError> {
        game.finish(winner);
        self.store.save_game(game)?;

        match self.cache.flush(game.id) {
            Ok(written) => {
                self.cache.invalidate(game.id);
                info!(game_id = %game.id, winner = %winner, written, "Game finished, moves persisted");
            }
            Err(e) => {
                // keep the entry so the log is not lost; the game itself is final
                error!(game_id = %game.id, error = %e, "Failed to persist moves of finished game");
            }
        }

        self.locks.release(game.id);
        debug!(game_id = %game.id, "Game lock released");
        Ok(())
    }
}
