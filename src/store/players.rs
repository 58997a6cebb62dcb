//! Player directory

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{GameStore, StoreError};
use crate::game::GameError;

/// Player record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Player store operations
#[derive(Clone)]
pub struct PlayerStore {
    store: Arc<dyn GameStore>,
}

impl PlayerStore {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }

    /// Get a player by ID
    pub fn get_player(&self, player_id: Uuid) -> Result<Player, GameError> {
        self.store
            .load_player(player_id)?
            .ok_or(GameError::PlayerNotFound(player_id))
    }

    /// Register a new player; names are unique
    pub fn create_player(&self, name: &str) -> Result<Player, GameError> {
        if self.store.find_player_by_name(name)?.is_some() {
            return Err(GameError::PlayerNameTaken(name.to_string()));
        }

        let player = Player {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_player(&player).map_err(|e| match e {
            StoreError::NameTaken(name) => GameError::PlayerNameTaken(name),
            other => GameError::Store(other),
        })?;

        info!(player_id = %player.id, name = %player.name, "Player created");
        Ok(player)
    }

    /// Get or create player by name (ensures the record exists)
    pub fn ensure_player(&self, name: &str) -> Result<Player, GameError> {
        if let Some(player) = self.store.find_player_by_name(name)? {
            return Ok(player);
        }
        match self.create_player(name) {
            // lost a race against another creator
            Err(GameError::PlayerNameTaken(_)) => self
                .store
                .find_player_by_name(name)?
                .ok_or(GameError::PlayerNameTaken(name.to_string())),
            result => result,
        }
    }
}
