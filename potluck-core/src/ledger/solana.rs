use super::indexer::EnhancedTransaction;
use super::{LedgerError, LedgerGateway, TokenBalance};
use crate::config::LedgerConfig;
use crate::entities::ParsedTransaction;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::str::FromStr;
use tracing::{debug, trace};
use url::Url;

/// Ledger gateway backed by a Solana JSON-RPC node and an
/// enhanced-transaction indexer.
pub struct SolanaGateway {
    rpc: RpcClient,
    http_client: reqwest::Client,
    indexer_url: Url,
    indexer_api_key: String,
}

impl SolanaGateway {
    const INDEXER_TRANSACTIONS_PATH: &str = "v0/transactions/";

    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(
                config.rpc_url.to_string(),
                CommitmentConfig::confirmed(),
            ),
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            indexer_url: config.indexer_url.clone(),
            indexer_api_key: config.indexer_api_key.clone(),
        }
    }

    /// Post a signature batch to the indexer.
    async fn fetch_enhanced(
        &self,
        signatures: &[&str],
    ) -> Result<Vec<EnhancedTransaction>, LedgerError> {
        let url = self
            .indexer_url
            .join(Self::INDEXER_TRANSACTIONS_PATH)
            .map_err(|e| LedgerError::Parse(format!("Invalid indexer URL: {}", e)))?;

        let response = self
            .http_client
            .post(url)
            .query(&[("api-key", self.indexer_api_key.as_str())])
            .json(&serde_json::json!({ "transactions": signatures }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Indexer {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LedgerGateway for SolanaGateway {
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, LedgerError> {
        let before = before
            .map(Signature::from_str)
            .transpose()
            .map_err(|e| LedgerError::Parse(format!("Invalid signature cursor: {}", e)))?;

        let config = GetConfirmedSignaturesForAddress2Config {
            before,
            limit: Some(limit),
            ..Default::default()
        };

        let statuses = self
            .rpc
            .get_signatures_for_address_with_config(address, config)
            .await?;

        trace!(%address, count = statuses.len(), "Fetched signature page");

        Ok(statuses.into_iter().map(|s| s.signature).collect())
    }

    async fn parsed_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ParsedTransaction>, LedgerError> {
        let transactions = self.fetch_enhanced(&[signature]).await?;
        transactions
            .into_iter()
            .find(|tx| tx.signature == signature)
            .map(ParsedTransaction::try_from)
            .transpose()
    }

    async fn token_balance(&self, token_account: &Pubkey) -> Result<TokenBalance, LedgerError> {
        let balance = self.rpc.get_token_account_balance(token_account).await?;
        let amount = balance
            .amount
            .parse()
            .map_err(|e| LedgerError::Parse(format!("Invalid token amount: {}", e)))?;
        Ok(TokenBalance {
            amount,
            decimals: balance.decimals,
        })
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8, LedgerError> {
        let supply = self.rpc.get_token_supply(mint).await?;
        Ok(supply.decimals)
    }

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        Ok(self.rpc.get_latest_blockhash().await?)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, LedgerError> {
        let signature = self.rpc.send_transaction(transaction).await?;
        debug!(%signature, "Submitted transaction");
        Ok(signature)
    }
}
