//! TransactionScanner.
//!
//! Walks the full signature history of an address, newest first, and
//! resolves every signature into a [`ParsedTransaction`] through the
//! indexer. Deciding which transactions count as entries is left to the
//! caller.

use crate::entities::ParsedTransaction;
use crate::ledger::{LedgerError, LedgerGateway};
use futures_util::{StreamExt, future, stream};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct TransactionScanner {
    gateway: Arc<dyn LedgerGateway>,
    page_size: usize,
    lookup_concurrency: usize,
}

impl TransactionScanner {
    pub fn new(gateway: Arc<dyn LedgerGateway>, page_size: usize, lookup_concurrency: usize) -> Self {
        Self {
            gateway,
            page_size: page_size.max(1),
            lookup_concurrency: lookup_concurrency.max(1),
        }
    }

    /// Fetch and resolve the whole history of `address`.
    ///
    /// Pages are requested backward from the most recent signature until a
    /// page comes back shorter than the page size. A signature the indexer
    /// fails to resolve is skipped; only a failure to list signatures is
    /// returned as an error.
    pub async fn scan(&self, address: &Pubkey) -> Result<Vec<ParsedTransaction>, LedgerError> {
        let mut transactions = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .gateway
                .signatures_for_address(address, cursor.as_deref(), self.page_size)
                .await?;

            transactions.extend(self.resolve_page(address, &page).await);

            if page.len() < self.page_size {
                break;
            }
            cursor = page.last().cloned();
        }

        debug!(
            %address,
            transactions = transactions.len(),
            "Scanned transaction history"
        );

        Ok(transactions)
    }

    /// Resolve one page of signatures, keeping page order.
    async fn resolve_page(&self, address: &Pubkey, signatures: &[String]) -> Vec<ParsedTransaction> {
        // Owned items keep the per-signature futures `Send` for the spawned engine.
        stream::iter(signatures.iter().cloned())
            .map(|signature| async move {
                match self.gateway.parsed_transaction(&signature).await {
                    Ok(Some(tx)) => Some(tx),
                    Ok(None) => {
                        debug!(%address, %signature, "Indexer has no record of transaction");
                        None
                    }
                    Err(e) => {
                        warn!(
                            %address,
                            %signature,
                            error = %e,
                            "Failed to resolve transaction, skipping"
                        );
                        None
                    }
                }
            })
            .buffered(self.lookup_concurrency)
            .filter_map(future::ready)
            .collect()
            .await
    }
}
