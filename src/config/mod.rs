//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, comma separated; `*` allows any
    pub client_origin: String,

    /// Name of the player record the AI plays as
    pub ai_player_name: String,
    /// Random placement attempts per ship before the first-fit fallback
    pub ai_placement_attempts: usize,
    /// Fixed AI seed for reproducible games
    pub ai_seed: Option<u64>,

    /// Unfinished games untouched this long are written back and evicted
    pub cache_idle: Duration,
    /// How often the idle sweep runs
    pub cache_sweep_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // PORT wins over SERVER_ADDR, as on most PaaS hosts
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let ai_placement_attempts = match env::var("AI_PLACEMENT_ATTEMPTS") {
            Ok(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid("AI_PLACEMENT_ATTEMPTS"))?,
            Err(_) => 200,
        };

        let ai_seed = match env::var("AI_SEED") {
            Ok(v) => Some(v.parse().map_err(|_| ConfigError::Invalid("AI_SEED"))?),
            Err(_) => None,
        };

        let cache_idle = secs_var("CACHE_IDLE_SECS", 5 * 60 * 60)?;
        let cache_sweep_interval = secs_var("CACHE_SWEEP_SECS", 5 * 60)?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            ai_player_name: env::var("AI_PLAYER_NAME").unwrap_or_else(|_| "AI Player".to_string()),
            ai_placement_attempts,
            ai_seed,

            cache_idle,
            cache_sweep_interval,
        })
    }
}

fn secs_var(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(v) => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::Invalid(name)),
        },
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
