//! In-memory ledger and clock for tests.

use crate::entities::{CompetitionTerms, ParsedTransaction, TokenTransfer, TransactionKind};
use crate::ledger::{LedgerError, LedgerGateway, TokenBalance};
use crate::utils::clock::Clock;
use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use time::{Duration, OffsetDateTime};

/// A qualifying-shaped deposit of `amount` into `escrow`, paid by a fresh
/// wallet.
pub(crate) fn deposit(
    signature: &str,
    terms: &CompetitionTerms,
    escrow: &Pubkey,
    amount: Decimal,
) -> ParsedTransaction {
    deposit_from(signature, terms, escrow, amount, &Pubkey::new_unique())
}

pub(crate) fn deposit_from(
    signature: &str,
    terms: &CompetitionTerms,
    escrow: &Pubkey,
    amount: Decimal,
    payer: &Pubkey,
) -> ParsedTransaction {
    ParsedTransaction {
        signature: signature.to_string(),
        kind: TransactionKind::Transfer,
        fee_payer: payer.to_string(),
        token_transfers: vec![TokenTransfer {
            mint: terms.purchase_asset.to_string(),
            from_user_account: Some(payer.to_string()),
            to_user_account: Some(escrow.to_string()),
            amount,
        }],
        error: None,
    }
}

#[derive(Default)]
pub(crate) struct MockGateway {
    /// Signature history per address, newest first.
    history: Mutex<HashMap<Pubkey, Vec<String>>>,
    parsed: Mutex<HashMap<String, ParsedTransaction>>,
    failing_lookups: Mutex<HashSet<String>>,
    failing_history: AtomicBool,
    balances: Mutex<HashMap<Pubkey, TokenBalance>>,
    decimals: Mutex<HashMap<Pubkey, u8>>,
    sent: Mutex<Vec<Transaction>>,
    failing_send: AtomicBool,
    pub(crate) page_requests: AtomicUsize,
    pub(crate) lookups: AtomicUsize,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record `tx` as the newest transaction touching `address`.
    pub(crate) fn push_transaction(&self, address: &Pubkey, tx: ParsedTransaction) {
        self.history
            .lock()
            .unwrap()
            .entry(*address)
            .or_default()
            .insert(0, tx.signature.clone());
        self.parsed.lock().unwrap().insert(tx.signature.clone(), tx);
    }

    pub(crate) fn fail_lookup(&self, signature: &str) {
        self.failing_lookups
            .lock()
            .unwrap()
            .insert(signature.to_string());
    }

    pub(crate) fn fail_history(&self, failing: bool) {
        self.failing_history.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn fail_send(&self, failing: bool) {
        self.failing_send.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_balance(&self, token_account: Pubkey, balance: TokenBalance) {
        self.balances.lock().unwrap().insert(token_account, balance);
    }

    pub(crate) fn set_decimals(&self, mint: Pubkey, decimals: u8) {
        self.decimals.lock().unwrap().insert(mint, decimals);
    }

    /// Every transaction passed to `send_transaction`, including failed ones.
    pub(crate) fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, LedgerError> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        if self.failing_history.load(Ordering::SeqCst) {
            return Err(LedgerError::Parse("history unavailable".to_string()));
        }
        let history = self
            .history
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default();
        let start = match before {
            Some(cursor) => history
                .iter()
                .position(|s| s == cursor)
                .map(|i| i + 1)
                .unwrap_or(history.len()),
            None => 0,
        };
        Ok(history.into_iter().skip(start).take(limit).collect())
    }

    async fn parsed_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ParsedTransaction>, LedgerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing_lookups.lock().unwrap().contains(signature) {
            return Err(LedgerError::Indexer {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.parsed.lock().unwrap().get(signature).cloned())
    }

    async fn token_balance(&self, token_account: &Pubkey) -> Result<TokenBalance, LedgerError> {
        self.balances
            .lock()
            .unwrap()
            .get(token_account)
            .copied()
            .ok_or_else(|| LedgerError::Parse("could not find account".to_string()))
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8, LedgerError> {
        Ok(self.decimals.lock().unwrap().get(mint).copied().unwrap_or(6))
    }

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, LedgerError> {
        self.sent.lock().unwrap().push(transaction.clone());
        if self.failing_send.load(Ordering::SeqCst) {
            return Err(LedgerError::Parse("blockhash not found".to_string()));
        }
        Ok(Signature::default())
    }
}

/// A clock that only moves when told to.
pub(crate) struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub(crate) fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap()
    }
}
