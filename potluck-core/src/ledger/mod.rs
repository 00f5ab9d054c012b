//! Access to the Solana ledger.
//!
//! The rest of the crate only talks to the ledger through [`LedgerGateway`],
//! so the lifecycle logic can run against an in-memory ledger in tests.
//! [`SolanaGateway`] is the production implementation backed by JSON-RPC and
//! an enhanced-transaction indexer.

mod indexer;
mod solana;

pub use solana::SolanaGateway;

use crate::entities::ParsedTransaction;
use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_client::client_error::ClientError;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use thiserror::Error;

/// Errors that can occur while talking to the ledger or the indexer.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// JSON-RPC error
    #[error("RPC error: {0}")]
    Rpc(Box<ClientError>),

    /// Indexer request error
    #[error("indexer request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Indexer returned a non-success status
    #[error("indexer error {status}: {body}")]
    Indexer { status: u16, body: String },

    /// Response parsing error
    #[error("response parsing error: {0}")]
    Parse(String),
}

impl From<ClientError> for LedgerError {
    fn from(err: ClientError) -> Self {
        LedgerError::Rpc(Box::new(err))
    }
}

/// Balance of a token account in raw base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenBalance {
    pub amount: u64,
    pub decimals: u8,
}

impl TokenBalance {
    /// The balance in whole units.
    pub fn ui_amount(&self) -> Decimal {
        Decimal::try_from_i128_with_scale(i128::from(self.amount), u32::from(self.decimals))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Read and submit operations the competition lifecycle needs from the ledger.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Signatures touching `address`, newest first, starting strictly before
    /// the `before` signature when given.
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, LedgerError>;

    /// Indexer description of a transaction. `None` if the indexer does not
    /// know the signature.
    async fn parsed_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ParsedTransaction>, LedgerError>;

    async fn token_balance(&self, token_account: &Pubkey) -> Result<TokenBalance, LedgerError>;

    async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8, LedgerError>;

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError>;

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, LedgerError>;
}
