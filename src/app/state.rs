//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{AiPlayer, GameError, GameService};
use crate::store::{GameStore, InMemoryStore, PlayerStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub games: Arc<GameService>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, GameError> {
        let store: Arc<dyn GameStore> = Arc::new(InMemoryStore::new());
        Self::with_store(config, store)
    }

    /// Build the state over an existing store; seeds the AI player record
    pub fn with_store(config: Config, store: Arc<dyn GameStore>) -> Result<Self, GameError> {
        let config = Arc::new(config);

        // The AI plays under a regular player record
        let ai_player = PlayerStore::new(store.clone()).ensure_player(&config.ai_player_name)?;

        let seed = config.ai_seed.unwrap_or_else(rand::random);
        let ai = AiPlayer::new(seed, config.ai_placement_attempts);

        let games = Arc::new(GameService::new(store, ai, ai_player.id));

        Ok(Self { config, games })
    }
}
