//! EntryBuilder.
//!
//! Builds the transaction a participant signs to enter a competition. The
//! entry fee goes into the escrow and the same amount is forwarded from the
//! escrow to the fee collector, so the escrow co-signs before the
//! transaction is handed out. Nothing is submitted here.

use crate::entities::GetCompetition;
use crate::framework::CompetitionRegistry;
use crate::ledger::LedgerGateway;
use crate::service::CompetitionError;
use crate::utils::token::{associated_token_address, encode_transaction, to_base_units};
use kanau::processor::Processor;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use tracing::debug;

pub struct EntryBuilder {
    registry: CompetitionRegistry,
    gateway: Arc<dyn LedgerGateway>,
    fee_collector: Pubkey,
    priority_fee_micro_lamports: u64,
}

impl EntryBuilder {
    pub fn new(
        registry: CompetitionRegistry,
        gateway: Arc<dyn LedgerGateway>,
        fee_collector: Pubkey,
        priority_fee_micro_lamports: u64,
    ) -> Self {
        Self {
            registry,
            gateway,
            fee_collector,
            priority_fee_micro_lamports,
        }
    }

    /// Base64 entry transaction for `participant` in competition `id`,
    /// partially signed by the escrow.
    pub async fn build(&self, id: &str, participant: &Pubkey) -> Result<String, CompetitionError> {
        let competition = self
            .registry
            .process(GetCompetition { id: id.to_string() })
            .await
            .ok()
            .flatten()
            .ok_or(CompetitionError::NotFound)?;
        // Placeholders have no terms to enter.
        let terms = *competition.terms().ok_or(CompetitionError::NotFound)?;

        let mint = terms.purchase_asset;
        let decimals = self.gateway.mint_decimals(&mint).await?;
        let amount = to_base_units(terms.entry_amount, decimals).ok_or_else(|| {
            CompetitionError::InvalidTerms(format!(
                "entry amount {} is not representable with {} decimals",
                terms.entry_amount, decimals
            ))
        })?;

        let escrow = competition.escrow_address();
        let participant_account = associated_token_address(participant, &mint);
        let escrow_account = associated_token_address(&escrow, &mint);
        let collector_account = associated_token_address(&self.fee_collector, &mint);

        let instructions = vec![
            ComputeBudgetInstruction::set_compute_unit_price(self.priority_fee_micro_lamports),
            spl_token::instruction::transfer(
                &spl_token::id(),
                &participant_account,
                &escrow_account,
                participant,
                &[],
                amount,
            )
            .map_err(|e| CompetitionError::Transaction(e.to_string()))?,
            spl_token::instruction::transfer(
                &spl_token::id(),
                &escrow_account,
                &collector_account,
                &escrow,
                &[],
                amount,
            )
            .map_err(|e| CompetitionError::Transaction(e.to_string()))?,
        ];

        let blockhash = self.gateway.latest_blockhash().await?;
        let mut transaction = Transaction::new_with_payer(&instructions, Some(participant));
        transaction
            .try_partial_sign(&[&*competition.escrow], blockhash)
            .map_err(|e| CompetitionError::Transaction(e.to_string()))?;

        debug!(
            competition = %id,
            %participant,
            amount,
            "Built entry transaction"
        );

        encode_transaction(&transaction).map_err(|e| CompetitionError::Transaction(e.to_string()))
    }
}
