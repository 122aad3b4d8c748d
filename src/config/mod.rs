//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::game::liveness::DEFAULT_PLAYER_TIMEOUT_MS;
use crate::game::pickups::DEFAULT_MAX_PICKUPS;

/// Default bot population per team
pub const DEFAULT_BOTS_PER_TEAM: usize = 10;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origin for CORS ("*" for any, comma-separated list otherwise)
    pub client_origin: String,
    /// Directory the client bundle is served from
    pub static_dir: String,

    /// Bot population per team (slots are always full)
    pub bots_per_team: usize,
    /// Inactivity window before a player is flagged frozen
    pub player_timeout_ms: u64,
    /// Health pickup pool capacity
    pub max_health_pickups: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string()),

            bots_per_team: parse_or("BOTS_PER_TEAM", DEFAULT_BOTS_PER_TEAM)?,
            player_timeout_ms: parse_or("PLAYER_TIMEOUT_MS", DEFAULT_PLAYER_TIMEOUT_MS)?,
            max_health_pickups: parse_or("MAX_HEALTH_PICKUPS", DEFAULT_MAX_PICKUPS)?,
        })
    }
}

/// Parse an optional numeric env var, falling back to a default
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
