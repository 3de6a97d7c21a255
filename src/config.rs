//! Environment configuration with validation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::staking::engine::{EngineSettings, DEFAULT_EMERGENCY_PENALTY_RATE};
use crate::staking::pools::default_pool_configs;
use crate::staking::types::{PoolConfig, PoolType};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Ledger configuration
    pub staking: StakingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct StakingConfig {
    pub emergency_penalty_rate: f64,
    pub rng_seed: Option<u64>,
    pub pools_file: Option<PathBuf>,
    pub pool_overrides: HashMap<PoolType, PoolOverride>,
}

/// Per-pool overrides read from the TOML pools file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolOverride {
    pub base_apy: Option<f64>,
    pub min_stake: Option<f64>,
    pub allowed_lock_days: Option<Vec<u32>>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PoolsFile {
    #[serde(default)]
    pools: HashMap<String, PoolOverride>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            cors_origins: vec!["*".to_string()],
            log_level: "info".to_string(),
        }
    }
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            emergency_penalty_rate: DEFAULT_EMERGENCY_PENALTY_RATE,
            rng_seed: None,
            pools_file: None,
            pool_overrides: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let pools_file = env::var("STAKING_POOLS_FILE").ok().map(PathBuf::from);
        let pool_overrides = match &pools_file {
            Some(path) => load_pool_overrides(path)?,
            None => HashMap::new(),
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8081".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidPort)?,
                cors_origins: env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },

            staking: StakingConfig {
                emergency_penalty_rate: match env::var("EMERGENCY_PENALTY_RATE") {
                    Ok(raw) => raw.parse().map_err(|_| {
                        ConfigError::InvalidConfig(format!("EMERGENCY_PENALTY_RATE is not a number: {}", raw))
                    })?,
                    Err(_) => DEFAULT_EMERGENCY_PENALTY_RATE,
                },
                rng_seed: match env::var("STAKING_RNG_SEED") {
                    Ok(raw) => Some(raw.parse().map_err(|_| {
                        ConfigError::InvalidConfig(format!("STAKING_RNG_SEED is not a u64: {}", raw))
                    })?),
                    Err(_) => None,
                },
                pools_file,
                pool_overrides,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let rate = self.staking.emergency_penalty_rate;
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::InvalidConfig(format!(
                "emergency penalty rate must be within [0, 1], got {}",
                rate
            )));
        }

        for (pool_type, overlay) in &self.staking.pool_overrides {
            if let Some(apy) = overlay.base_apy {
                if !apy.is_finite() || !(0.0..1.0).contains(&apy) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "{}: base_apy must be within [0, 1), got {}",
                        pool_type, apy
                    )));
                }
            }
            if let Some(min_stake) = overlay.min_stake {
                if !min_stake.is_finite() || min_stake < 0.0 {
                    return Err(ConfigError::InvalidConfig(format!(
                        "{}: min_stake must be non-negative, got {}",
                        pool_type, min_stake
                    )));
                }
            }
            if let Some(days) = &overlay.allowed_lock_days {
                if days.is_empty() || days.contains(&0) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "{}: allowed_lock_days must be a non-empty list of positive day counts",
                        pool_type
                    )));
                }
            }
        }

        Ok(())
    }
}

impl StakingConfig {
    /// Default pool table with the configured overrides applied
    pub fn pool_table(&self) -> Vec<PoolConfig> {
        default_pool_configs()
            .into_iter()
            .map(|mut pool| {
                if let Some(overlay) = self.pool_overrides.get(&pool.pool_type) {
                    if let Some(apy) = overlay.base_apy {
                        pool.base_apy = apy;
                    }
                    if let Some(min_stake) = overlay.min_stake {
                        pool.min_stake = min_stake;
                    }
                    if let Some(days) = &overlay.allowed_lock_days {
                        pool.allowed_lock_days = days.clone();
                    }
                    if let Some(description) = &overlay.description {
                        pool.description = description.clone();
                    }
                }
                pool
            })
            .collect()
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            emergency_penalty_rate: self.emergency_penalty_rate,
            rng_seed: self.rng_seed,
        }
    }
}

/// Read pool overrides from a TOML file keyed by pool type
pub fn load_pool_overrides(path: &Path) -> Result<HashMap<PoolType, PoolOverride>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::PoolsFile {
        path: path.display().to_string(),
        source,
    })?;
    parse_pool_overrides(&content)
}

pub fn parse_pool_overrides(content: &str) -> Result<HashMap<PoolType, PoolOverride>, ConfigError> {
    let file: PoolsFile = toml::from_str(content)?;

    file.pools
        .into_iter()
        .map(|(key, overlay)| {
            key.parse::<PoolType>()
                .map(|pool_type| (pool_type, overlay))
                .map_err(|_| ConfigError::InvalidConfig(format!("unknown pool '{}' in pools file", key)))
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot read pools file {path}: {source}")]
    PoolsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pools file: {0}")]
    PoolsParse(#[from] toml::de::Error),
}

/// Create example .env file
pub fn create_env_example() -> String {
    r#"# Server Configuration
SERVER_HOST=127.0.0.1
SERVER_PORT=8081
CORS_ORIGINS=http://localhost:3000,http://localhost:8080
LOG_LEVEL=info

# Ledger Configuration
EMERGENCY_PENALTY_RATE=0.1
# STAKING_RNG_SEED=42
# STAKING_POOLS_FILE=config/pools.toml
"#
    .to_string()
}
