//! Per-game mutual exclusion

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

/// Registry of one lock per game. Games never share a lock.
#[derive(Default)]
pub struct GameLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl GameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for a game, created on first use. Callers hold
    /// `lock.lock()` for the duration of their critical section.
    pub fn get(&self, game_id: Uuid) -> Arc<Mutex<()>> {
        self.locks.entry(game_id).or_default().value().clone()
    }

    /// Forget a finished game's lock. Safe once the finished status is
    /// persisted: later holders only observe the terminal state.
    pub fn release(&self, game_id: Uuid) {
        self.locks.remove(&game_id);
    }

    /// Drop the entry unless a holder other than the caller still has a
    /// clone. The caller must hold exactly one clone of the lock.
    pub fn release_unused(&self, game_id: Uuid) -> bool {
        // the map's own reference plus the caller's
        self.locks
            .remove_if(&game_id, |_, lock| Arc::strong_count(lock) <= 2)
            .is_some()
    }

    #[cfg(test)]
    pub fn tracked_games(&self) -> usize {
        self.locks.len()
    }
}
