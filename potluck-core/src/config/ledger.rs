//! Ledger and indexer endpoints.

use url::Url;

/// Where to reach the Solana JSON-RPC node and the transaction indexer.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Base URL of the enhanced-transaction indexer.
    pub indexer_url: Url,
    /// API key for the indexer.
    pub indexer_api_key: String,
}
