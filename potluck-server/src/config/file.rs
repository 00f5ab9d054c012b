//! TOML file configuration structures.
//!
//! These structs directly map to the `potluck-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub competition: CompetitionConfig,
    pub actions: ActionsConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Ledger endpoints. The indexer API key is read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: Url,
    /// Base URL of the enhanced-transaction indexer, e.g.
    /// `https://api.helius.xyz/`.
    pub indexer_url: Url,
}

/// Competition settings. Everything but the fee collector has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionConfig {
    /// Base58 wallet receiving the platform's share of entry fees.
    pub fee_collector: String,
    pub poll_interval_secs: Option<u64>,
    pub page_size: Option<usize>,
    pub lookup_concurrency: Option<usize>,
    pub priority_fee_micro_lamports: Option<u64>,
    pub payout_compute_unit_limit: Option<u32>,
    pub escrow_funding_lamports: Option<u64>,
    pub max_reserved_placeholders: Option<usize>,
}

/// How actions are presented to blink clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Icon URL shown on every action.
    pub icon: String,
    /// Public URL this server is reachable at, used in links shared with
    /// participants.
    pub public_base_url: Url,
}
