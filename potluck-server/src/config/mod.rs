//! Configuration module for potluck-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables, and converts it into the validated runtime
//! structs the core expects.

pub mod file;

use crate::config::file::{
    ActionsConfig as FileActionsConfig, CompetitionConfig as FileCompetitionConfig, FileConfig,
};
use potluck_core::config::{CompetitionConfig, LedgerConfig};
use solana_sdk::pubkey::Pubkey;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable holding the indexer API key.
pub const INDEXER_API_KEY_VAR: &str = "INDEXER_API_KEY";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("INDEXER_API_KEY environment variable not set")]
    MissingIndexerApiKey,
}

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// Presentation settings for actions.
#[derive(Debug, Clone)]
pub struct ActionsConfig {
    pub icon: String,
    pub public_base_url: Url,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub competition: CompetitionConfig,
    pub actions: ActionsConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Read the indexer API key from the environment
    /// 4. Validate and build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        build_loaded_config(file_config, get_indexer_api_key()?)
    }
}

/// Validate a parsed file and combine it with the indexer API key.
pub fn build_loaded_config(
    file_config: FileConfig,
    indexer_api_key: String,
) -> Result<LoadedConfig, ConfigError> {
    Ok(LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        ledger: LedgerConfig {
            rpc_url: file_config.ledger.rpc_url,
            indexer_url: file_config.ledger.indexer_url,
            indexer_api_key,
        },
        competition: convert_competition(file_config.competition)?,
        actions: convert_actions(file_config.actions)?,
    })
}

fn convert_competition(c: FileCompetitionConfig) -> Result<CompetitionConfig, ConfigError> {
    let fee_collector = Pubkey::from_str(&c.fee_collector).map_err(|e| {
        ConfigError::ValidationError(format!("invalid fee_collector {}: {}", c.fee_collector, e))
    })?;

    let mut config = CompetitionConfig::new(fee_collector);
    if let Some(secs) = c.poll_interval_secs {
        if secs == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_secs must be positive".to_string(),
            ));
        }
        config.poll_interval = Duration::from_secs(secs);
    }
    if let Some(page_size) = c.page_size {
        if page_size == 0 {
            return Err(ConfigError::ValidationError(
                "page_size must be positive".to_string(),
            ));
        }
        config.page_size = page_size;
    }
    if let Some(concurrency) = c.lookup_concurrency {
        if concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "lookup_concurrency must be positive".to_string(),
            ));
        }
        config.lookup_concurrency = concurrency;
    }
    if let Some(fee) = c.priority_fee_micro_lamports {
        config.priority_fee_micro_lamports = fee;
    }
    if let Some(limit) = c.payout_compute_unit_limit {
        config.payout_compute_unit_limit = limit;
    }
    if let Some(lamports) = c.escrow_funding_lamports {
        config.escrow_funding_lamports = lamports;
    }
    if let Some(limit) = c.max_reserved_placeholders {
        if limit == 0 {
            return Err(ConfigError::ValidationError(
                "max_reserved_placeholders must be positive".to_string(),
            ));
        }
        config.max_reserved_placeholders = limit;
    }
    Ok(config)
}

fn convert_actions(a: FileActionsConfig) -> Result<ActionsConfig, ConfigError> {
    if a.icon.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "actions.icon must not be empty".to_string(),
        ));
    }
    Ok(ActionsConfig {
        icon: a.icon,
        public_base_url: a.public_base_url,
    })
}

/// Get the indexer API key from the environment.
pub fn get_indexer_api_key() -> Result<String, ConfigError> {
    std::env::var(INDEXER_API_KEY_VAR).map_err(|_| ConfigError::MissingIndexerApiKey)
}
