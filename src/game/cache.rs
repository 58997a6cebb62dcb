//! Write-back move cache
//!
//! While a game is active its cache entry is the only source of truth for
//! which cells were attacked and whose turn it is. The durable store is read
//! once when the entry is created and written once when the game finishes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::session::Move;
use crate::store::{GameStore, StoreError};

/// Moves of one game and when the entry was last used
struct Entry {
    moves: Vec<Move>,
    touched: Instant,
}

impl Entry {
    fn new(moves: Vec<Move>) -> Self {
        Self {
            moves,
            touched: Instant::now(),
        }
    }
}

/// Ordered move log per active game
pub struct MoveCache {
    entries: DashMap<Uuid, Entry>,
    store: Arc<dyn GameStore>,
}

impl MoveCache {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self {
            entries: DashMap::new(),
            store,
        }
    }

    /// Append a move. The nil id is the unset sentinel: logged and ignored.
    pub fn append(&self, game_id: Uuid, mv: Move) {
        if game_id.is_nil() {
            warn!(x = mv.x, y = mv.y, "Move for unset game id dropped");
            return;
        }

        debug!(game_id = %game_id, player_id = %mv.player_id, x = mv.x, y = mv.y, result = ?mv.result, "Caching move");
        let mut entry = self
            .entries
            .entry(game_id)
            .or_insert_with(|| Entry::new(Vec::new()));
        entry.moves.push(mv);
        entry.touched = Instant::now();
    }

    /// Full in-memory history, empty if nothing is cached yet
    pub fn read_all(&self, game_id: Uuid) -> Vec<Move> {
        self.entries
            .get(&game_id)
            .map(|entry| entry.moves.clone())
            .unwrap_or_default()
    }

    /// Most recent move of a game
    pub fn last(&self, game_id: Uuid) -> Option<Move> {
        self.entries
            .get(&game_id)
            .and_then(|entry| entry.moves.last().cloned())
    }

    /// Whether `player_id` already fired at (x, y) in this game
    pub fn contains_shot(&self, game_id: Uuid, player_id: Uuid, x: u8, y: u8) -> bool {
        self.entries
            .get(&game_id)
            .is_some_and(|entry| entry.moves.iter().any(|m| m.targets(player_id, x, y)))
    }

    /// Seed the entry from the durable store unless one already exists.
    /// An existing entry is never replaced, so in-flight moves survive.
    pub fn initialize(&self, game_id: Uuid) -> Result<(), StoreError> {
        if game_id.is_nil() {
            warn!("Cache initialisation for unset game id skipped");
            return Ok(());
        }
        if let Some(mut entry) = self.entries.get_mut(&game_id) {
            entry.touched = Instant::now();
            return Ok(());
        }

        let stored = self.store.load_moves(game_id)?;
        let loaded = stored.len();
        // a concurrent initialise may have won the race; keep its entry
        self.entries.entry(game_id).or_insert(Entry::new(stored));

        info!(game_id = %game_id, loaded, "Move cache initialised");
        Ok(())
    }

    /// Games whose entry has not been used for at least `max_idle`
    pub fn idle_games(&self, max_idle: Duration) -> Vec<Uuid> {
        self.entries
            .iter()
            .filter(|entry| entry.touched.elapsed() >= max_idle)
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn is_idle(&self, game_id: Uuid, max_idle: Duration) -> bool {
        self.entries
            .get(&game_id)
            .is_some_and(|entry| entry.touched.elapsed() >= max_idle)
    }

    /// Drop the entry; only after a successful flush
    pub fn invalidate(&self, game_id: Uuid) {
        if self.entries.remove(&game_id).is_some() {
            debug!(game_id = %game_id, "Move cache invalidated");
        }
    }

    /// Write the cached moves not yet in the durable store.
    /// Returns how many were written.
    pub fn flush(&self, game_id: Uuid) -> Result<usize, StoreError> {
        let cached = self.read_all(game_id);

        let mut fresh = Vec::with_capacity(cached.len());
        for mv in cached {
            if !self.store.move_exists(mv.game_id, mv.player_id, mv.x, mv.y)? {
                fresh.push(mv);
            }
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        match self.store.save_moves(&fresh) {
            Ok(()) => Ok(fresh.len()),
            Err(StoreError::Duplicate { .. }) => {
                // someone else persisted part of the batch; fall back to one by one
                let mut written = 0;
                for mv in fresh {
                    match self.store.save_moves(std::slice::from_ref(&mv)) {
                        Ok(()) => written += 1,
                        Err(StoreError::Duplicate { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(written)
            }
            Err(e) => Err(e),
        }
    }

    /// Number of games with a live entry
    pub fn active_games(&self) -> usize {
        self.entries.len()
    }
}
