//! PayoutEngine.
//!
//! Draws one winner uniformly from the qualifying entries of an expired
//! competition and sends them the escrow's whole award balance. A payout is
//! attempted exactly once; a failed submission is logged and dropped.

use crate::entities::{CompetitionTerms, ParsedTransaction};
use crate::ledger::{LedgerError, LedgerGateway};
use crate::utils::token::associated_token_address;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{error, info, warn};

/// Result of settling one competition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutOutcome {
    /// No qualifying entry was ever made.
    NoEntrants,
    /// The payout transaction was accepted by the node. `amount` is zero
    /// when the award balance was empty or could not be read.
    Paid {
        winner: Pubkey,
        amount: u64,
        signature: Signature,
    },
    /// Building or submitting the payout failed. Never retried.
    Failed { winner: String, reason: String },
}

#[derive(Debug, Error)]
enum BuildError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("instruction error: {0}")]
    Instruction(String),

    #[error("signing error: {0}")]
    Signing(String),
}

pub struct PayoutEngine {
    gateway: Arc<dyn LedgerGateway>,
    rng: Mutex<StdRng>,
    compute_unit_limit: u32,
}

impl PayoutEngine {
    /// Payout engine drawing from an OS-seeded generator.
    pub fn new(gateway: Arc<dyn LedgerGateway>, compute_unit_limit: u32) -> Self {
        Self::with_rng(gateway, compute_unit_limit, StdRng::from_os_rng())
    }

    pub fn with_rng(gateway: Arc<dyn LedgerGateway>, compute_unit_limit: u32, rng: StdRng) -> Self {
        Self {
            gateway,
            rng: Mutex::new(rng),
            compute_unit_limit,
        }
    }

    /// Pick one entry uniformly at random. `None` when there are no entries.
    pub fn select_winner<'a>(
        &self,
        qualifying: &[&'a ParsedTransaction],
    ) -> Option<&'a ParsedTransaction> {
        if qualifying.is_empty() {
            return None;
        }
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let index = rng.random_range(0..qualifying.len());
        Some(qualifying[index])
    }

    /// Settle competition `id`, whose escrow and terms are given, among the
    /// `qualifying` entries.
    pub async fn payout(
        &self,
        id: &str,
        escrow: &Keypair,
        terms: &CompetitionTerms,
        qualifying: &[&ParsedTransaction],
    ) -> PayoutOutcome {
        let Some(entry) = self.select_winner(qualifying) else {
            info!(competition = %id, "Competition expired without entrants");
            return PayoutOutcome::NoEntrants;
        };

        let winner = match Pubkey::from_str(&entry.fee_payer) {
            Ok(winner) => winner,
            Err(e) => {
                error!(
                    competition = %id,
                    winner = %entry.fee_payer,
                    error = %e,
                    "Winning entry has an invalid fee payer"
                );
                return PayoutOutcome::Failed {
                    winner: entry.fee_payer.clone(),
                    reason: e.to_string(),
                };
            }
        };

        let source = associated_token_address(&escrow.pubkey(), &terms.award_asset);
        let amount = match self.gateway.token_balance(&source).await {
            Ok(balance) => balance.amount,
            Err(e) => {
                warn!(
                    competition = %id,
                    account = %source,
                    error = %e,
                    "Failed to read award balance, treating as empty"
                );
                0
            }
        };

        let result = match self.build(escrow, terms, &winner, amount).await {
            Ok(transaction) => self
                .gateway
                .send_transaction(&transaction)
                .await
                .map_err(BuildError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(signature) => {
                info!(
                    competition = %id,
                    %winner,
                    amount,
                    %signature,
                    "Submitted payout"
                );
                PayoutOutcome::Paid {
                    winner,
                    amount,
                    signature,
                }
            }
            Err(e) => {
                error!(
                    competition = %id,
                    %winner,
                    amount,
                    error = %e,
                    "Payout failed"
                );
                PayoutOutcome::Failed {
                    winner: winner.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Payout transaction moving `amount` of the award asset from the escrow
    /// to the winner, creating the winner's token account if needed. The
    /// escrow pays fees and rent.
    async fn build(
        &self,
        escrow: &Keypair,
        terms: &CompetitionTerms,
        winner: &Pubkey,
        amount: u64,
    ) -> Result<Transaction, BuildError> {
        let escrow_address = escrow.pubkey();
        let mint = terms.award_asset;
        let source = associated_token_address(&escrow_address, &mint);
        let destination = associated_token_address(winner, &mint);

        let instructions = vec![
            ComputeBudgetInstruction::set_compute_unit_limit(self.compute_unit_limit),
            create_associated_token_account_idempotent(
                &escrow_address,
                winner,
                &mint,
                &spl_token::id(),
            ),
            spl_token::instruction::transfer(
                &spl_token::id(),
                &source,
                &destination,
                &escrow_address,
                &[],
                amount,
            )
            .map_err(|e| BuildError::Instruction(e.to_string()))?,
        ];

        let blockhash = self.gateway.latest_blockhash().await?;
        let mut transaction = Transaction::new_with_payer(&instructions, Some(&escrow_address));
        transaction
            .try_sign(&[escrow], blockhash)
            .map_err(|e| BuildError::Signing(e.to_string()))?;
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TokenBalance;
    use crate::testing::{MockGateway, deposit_from};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn terms() -> CompetitionTerms {
        CompetitionTerms {
            entry_amount: dec!(10),
            purchase_asset: Pubkey::new_unique(),
            award_asset: Pubkey::new_unique(),
        }
    }

    fn entries(terms: &CompetitionTerms, escrow: &Pubkey, payers: &[Pubkey]) -> Vec<ParsedTransaction> {
        payers
            .iter()
            .enumerate()
            .map(|(i, payer)| deposit_from(&format!("sig{i}"), terms, escrow, dec!(10), payer))
            .collect()
    }

    fn engine(gateway: Arc<MockGateway>) -> PayoutEngine {
        PayoutEngine::with_rng(gateway, 1_000_000, StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_winner_selection_is_uniform() {
        let engine = engine(Arc::new(MockGateway::new()));
        let terms = terms();
        let escrow = Pubkey::new_unique();
        let payers: Vec<_> = (0..4).map(|_| Pubkey::new_unique()).collect();
        let history = entries(&terms, &escrow, &payers);
        let qualifying: Vec<_> = history.iter().collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..10_000 {
            let winner = engine.select_winner(&qualifying).unwrap();
            *counts.entry(winner.fee_payer.clone()).or_default() += 1;
        }

        assert_eq!(counts.len(), 4);
        for count in counts.values() {
            assert!((2_200..=2_800).contains(count), "skewed draw: {count}");
        }
    }

    #[test]
    fn test_no_winner_without_entries() {
        let engine = engine(Arc::new(MockGateway::new()));
        assert!(engine.select_winner(&[]).is_none());
    }

    #[tokio::test]
    async fn test_no_entrants_submits_nothing() {
        let gateway = Arc::new(MockGateway::new());
        let engine = engine(gateway.clone());
        let escrow = Keypair::new();

        let outcome = engine.payout("a", &escrow, &terms(), &[]).await;
        assert_eq!(outcome, PayoutOutcome::NoEntrants);
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_pays_whole_balance_to_an_entrant() {
        let gateway = Arc::new(MockGateway::new());
        let engine = engine(gateway.clone());
        let escrow = Keypair::new();
        let terms = terms();
        let payers: Vec<_> = (0..3).map(|_| Pubkey::new_unique()).collect();
        let history = entries(&terms, &escrow.pubkey(), &payers);
        let qualifying: Vec<_> = history.iter().collect();
        gateway.set_balance(
            associated_token_address(&escrow.pubkey(), &terms.award_asset),
            TokenBalance {
                amount: 30_000_000,
                decimals: 6,
            },
        );

        let outcome = engine.payout("a", &escrow, &terms, &qualifying).await;
        let PayoutOutcome::Paid { winner, amount, .. } = outcome else {
            panic!("expected a payout, got {outcome:?}");
        };
        assert!(payers.contains(&winner));
        assert_eq!(amount, 30_000_000);

        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message.instructions.len(), 3);
        assert_eq!(sent[0].message.account_keys[0], escrow.pubkey());
        assert!(sent[0].is_signed());
    }

    #[tokio::test]
    async fn test_unreadable_balance_still_submits_zero_transfer() {
        let gateway = Arc::new(MockGateway::new());
        let engine = engine(gateway.clone());
        let escrow = Keypair::new();
        let terms = terms();
        let payers = [Pubkey::new_unique()];
        let history = entries(&terms, &escrow.pubkey(), &payers);
        let qualifying: Vec<_> = history.iter().collect();

        let outcome = engine.payout("a", &escrow, &terms, &qualifying).await;
        let PayoutOutcome::Paid { winner, amount, .. } = outcome else {
            panic!("expected a submission, got {outcome:?}");
        };
        assert_eq!(winner, payers[0]);
        assert_eq!(amount, 0);
        assert_eq!(gateway.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_submission_failure_is_reported_not_retried() {
        let gateway = Arc::new(MockGateway::new());
        gateway.fail_send(true);
        let engine = engine(gateway.clone());
        let escrow = Keypair::new();
        let terms = terms();
        let payers = [Pubkey::new_unique()];
        let history = entries(&terms, &escrow.pubkey(), &payers);
        let qualifying: Vec<_> = history.iter().collect();
        gateway.set_balance(
            associated_token_address(&escrow.pubkey(), &terms.award_asset),
            TokenBalance {
                amount: 5,
                decimals: 0,
            },
        );

        let outcome = engine.payout("a", &escrow, &terms, &qualifying).await;
        assert!(matches!(outcome, PayoutOutcome::Failed { .. }));
        assert_eq!(gateway.sent().len(), 1);
    }
}
