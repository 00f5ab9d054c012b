//! Operations exposed to the HTTP layer.
//!
//! Creation is a two-step flow: `create_pending` reserves an escrow under a
//! placeholder id, `finalize` attaches terms to it and moves it to its
//! permanent id. Participants then read the competition with `view` and
//! request entry transactions with `build_entry`.

use crate::config::CompetitionConfig;
use crate::entities::{
    ClaimPlaceholder, Competition, CompetitionId, CompetitionTerms, GetCompetition,
    Phase, RegistryError, ReservePlaceholder,
};
use crate::framework::CompetitionRegistry;
use crate::ledger::{LedgerError, LedgerGateway};
use crate::processors::EntryBuilder;
use crate::utils::clock::Clock;
use crate::utils::token::{associated_token_address, encode_transaction};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use thiserror::Error;
use time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Longest competition a creator may request: one year.
pub const MAX_DURATION_MINUTES: u32 = 366 * 24 * 60;

/// Errors surfaced to callers of [`CompetitionService`].
#[derive(Debug, Error)]
pub enum CompetitionError {
    /// Unknown id, or an id that does not refer to a competition in the
    /// state the operation needs.
    #[error("competition not found")]
    NotFound,

    #[error("invalid competition terms: {0}")]
    InvalidTerms(String),

    /// Too many competitions are waiting to be finalized.
    #[error("too many pending competitions, try again later")]
    Busy,

    #[error("registry error: {0}")]
    Registry(RegistryError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Building, signing or encoding a transaction failed.
    #[error("transaction error: {0}")]
    Transaction(String),
}

impl From<RegistryError> for CompetitionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound | RegistryError::NotReserved => CompetitionError::NotFound,
            RegistryError::PlaceholderLimit => CompetitionError::Busy,
            other => CompetitionError::Registry(other),
        }
    }
}

/// A competition that has just left the placeholder stage.
#[derive(Debug, Clone)]
pub struct FinalizedCompetition {
    pub id: CompetitionId,
    pub escrow: Pubkey,
    /// Base64, unsigned. The creator signs it to fund the escrow's fees and
    /// rent.
    pub funding_transaction: String,
}

/// Public state of a competition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitionView {
    pub entry_amount: Decimal,
    pub purchase_asset: Pubkey,
    pub award_asset: Pubkey,
    /// Award asset held by the escrow, in whole units.
    pub current_reward_balance: Decimal,
    /// Full duration until the first entry, then the time left until the
    /// deadline, never negative.
    pub time_remaining: Duration,
    pub started: bool,
}

pub struct CompetitionService {
    registry: CompetitionRegistry,
    gateway: Arc<dyn LedgerGateway>,
    clock: Arc<dyn Clock>,
    entry_builder: EntryBuilder,
    priority_fee_micro_lamports: u64,
    escrow_funding_lamports: u64,
    max_reserved_placeholders: usize,
}

impl CompetitionService {
    pub fn new(
        registry: CompetitionRegistry,
        gateway: Arc<dyn LedgerGateway>,
        clock: Arc<dyn Clock>,
        config: &CompetitionConfig,
    ) -> Self {
        Self {
            entry_builder: EntryBuilder::new(
                registry.clone(),
                gateway.clone(),
                config.fee_collector,
                config.priority_fee_micro_lamports,
            ),
            registry,
            gateway,
            clock,
            priority_fee_micro_lamports: config.priority_fee_micro_lamports,
            escrow_funding_lamports: config.escrow_funding_lamports,
            max_reserved_placeholders: config.max_reserved_placeholders,
        }
    }

    /// Reserve a fresh escrow. The returned placeholder id is the escrow's
    /// address.
    ///
    /// Fails with [`CompetitionError::Busy`] while the configured number of
    /// placeholders is already waiting to be finalized.
    pub async fn create_pending(&self) -> Result<CompetitionId, CompetitionError> {
        let (id, competition) = Competition::reserve();
        self.registry
            .process(ReservePlaceholder {
                id: id.clone(),
                competition,
                limit: self.max_reserved_placeholders,
            })
            .await?;
        info!(placeholder = %id, "Reserved competition escrow");
        Ok(id)
    }

    /// Attach terms to placeholder `pending_id` and give the competition its
    /// permanent id. The placeholder is consumed.
    pub async fn finalize(
        &self,
        pending_id: &str,
        amount: Decimal,
        duration_minutes: u32,
        award_asset: Pubkey,
        purchase_asset: Pubkey,
        creator: &Pubkey,
    ) -> Result<FinalizedCompetition, CompetitionError> {
        if amount <= Decimal::ZERO {
            return Err(CompetitionError::InvalidTerms(
                "entry amount must be positive".to_string(),
            ));
        }
        if duration_minutes == 0 {
            return Err(CompetitionError::InvalidTerms(
                "duration must be at least one minute".to_string(),
            ));
        }
        if duration_minutes > MAX_DURATION_MINUTES {
            return Err(CompetitionError::InvalidTerms(format!(
                "duration must not exceed {MAX_DURATION_MINUTES} minutes"
            )));
        }
        if award_asset == purchase_asset {
            return Err(CompetitionError::InvalidTerms(
                "award and purchase assets must differ".to_string(),
            ));
        }

        let reserved = self
            .registry
            .process(GetCompetition {
                id: pending_id.to_string(),
            })
            .await
            .ok()
            .flatten()
            .is_some_and(|c| c.phase == Phase::Reserved);
        if !reserved {
            return Err(CompetitionError::NotFound);
        }

        // Fetched before claiming so a ledger failure leaves the placeholder usable.
        let blockhash = self.gateway.latest_blockhash().await?;

        let id = Uuid::new_v4().to_string();
        let competition = self
            .registry
            .process(ClaimPlaceholder {
                placeholder_id: pending_id.to_string(),
                new_id: id.clone(),
                terms: CompetitionTerms {
                    entry_amount: amount,
                    purchase_asset,
                    award_asset,
                },
                duration: Duration::minutes(i64::from(duration_minutes)),
            })
            .await?;
        let escrow = competition.escrow_address();

        let instructions = [
            ComputeBudgetInstruction::set_compute_unit_price(self.priority_fee_micro_lamports),
            system_instruction::transfer(creator, &escrow, self.escrow_funding_lamports),
        ];
        let mut transaction = Transaction::new_with_payer(&instructions, Some(creator));
        transaction.message.recent_blockhash = blockhash;
        let funding_transaction = encode_transaction(&transaction)
            .map_err(|e| CompetitionError::Transaction(e.to_string()))?;

        info!(
            competition = %id,
            placeholder = %pending_id,
            %escrow,
            %amount,
            duration_minutes,
            "Competition finalized"
        );

        Ok(FinalizedCompetition {
            id,
            escrow,
            funding_transaction,
        })
    }

    pub async fn view(&self, id: &str) -> Result<CompetitionView, CompetitionError> {
        let competition = self
            .registry
            .process(GetCompetition { id: id.to_string() })
            .await
            .ok()
            .flatten()
            .ok_or(CompetitionError::NotFound)?;

        let (terms, time_remaining, started) = match competition.phase {
            Phase::Reserved => return Err(CompetitionError::NotFound),
            Phase::Pending { terms, duration } => (terms, duration, false),
            Phase::Active { terms, deadline } => {
                let remaining = (deadline - self.clock.now()).max(Duration::ZERO);
                (terms, remaining, true)
            }
        };

        let pot = associated_token_address(&competition.escrow_address(), &terms.award_asset);
        let current_reward_balance = match self.gateway.token_balance(&pot).await {
            Ok(balance) => balance.ui_amount(),
            Err(e) => {
                warn!(
                    competition = %id,
                    account = %pot,
                    error = %e,
                    "Failed to read reward balance"
                );
                Decimal::ZERO
            }
        };

        Ok(CompetitionView {
            entry_amount: terms.entry_amount,
            purchase_asset: terms.purchase_asset,
            award_asset: terms.award_asset,
            current_reward_balance,
            time_remaining,
            started,
        })
    }

    /// Entry transaction for `participant`, partially signed by the escrow.
    pub async fn build_entry(
        &self,
        id: &str,
        participant: &Pubkey,
    ) -> Result<String, CompetitionError> {
        self.entry_builder.build(id, participant).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ListCompetitions, StartCompetition};
    use crate::ledger::TokenBalance;
    use crate::testing::{ManualClock, MockGateway};
    use base64::Engine;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use time::OffsetDateTime;

    struct Harness {
        registry: CompetitionRegistry,
        gateway: Arc<MockGateway>,
        clock: Arc<ManualClock>,
        service: CompetitionService,
    }

    fn harness() -> Harness {
        let registry = CompetitionRegistry::new();
        let gateway = Arc::new(MockGateway::new());
        let clock = Arc::new(ManualClock::new(OffsetDateTime::now_utc()));
        let service = CompetitionService::new(
            registry.clone(),
            gateway.clone(),
            clock.clone(),
            &CompetitionConfig::new(Pubkey::new_unique()),
        );
        Harness {
            registry,
            gateway,
            clock,
            service,
        }
    }

    async fn finalize(h: &Harness, award: Pubkey, purchase: Pubkey) -> FinalizedCompetition {
        let placeholder = h.service.create_pending().await.unwrap();
        h.service
            .finalize(&placeholder, dec!(10), 1, award, purchase, &Pubkey::new_unique())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_every_record_owns_a_distinct_escrow() {
        let h = harness();
        let mut placeholders = Vec::new();
        for _ in 0..50 {
            placeholders.push(h.service.create_pending().await.unwrap());
        }
        for placeholder in placeholders.iter().take(25) {
            h.service
                .finalize(
                    placeholder,
                    dec!(1),
                    5,
                    Pubkey::new_unique(),
                    Pubkey::new_unique(),
                    &Pubkey::new_unique(),
                )
                .await
                .unwrap();
        }

        let records = h.registry.process(ListCompetitions).await.unwrap();
        assert_eq!(records.len(), 50);
        let escrows: HashSet<_> = records.iter().map(|(_, c)| c.escrow_address()).collect();
        assert_eq!(escrows.len(), 50);
    }

    #[tokio::test]
    async fn test_reservations_are_capped_until_finalized() {
        let mut config = CompetitionConfig::new(Pubkey::new_unique());
        config.max_reserved_placeholders = 1;
        let service = CompetitionService::new(
            CompetitionRegistry::new(),
            Arc::new(MockGateway::new()),
            Arc::new(ManualClock::new(OffsetDateTime::now_utc())),
            &config,
        );

        let placeholder = service.create_pending().await.unwrap();
        assert!(matches!(
            service.create_pending().await,
            Err(CompetitionError::Busy)
        ));

        service
            .finalize(
                &placeholder,
                dec!(10),
                1,
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                &Pubkey::new_unique(),
            )
            .await
            .unwrap();
        assert!(service.create_pending().await.is_ok());
    }

    #[tokio::test]
    async fn test_finalize_validates_terms_and_keeps_placeholder() {
        let h = harness();
        let placeholder = h.service.create_pending().await.unwrap();
        let asset = Pubkey::new_unique();
        let creator = Pubkey::new_unique();

        let cases = [
            (dec!(0), 1, Pubkey::new_unique(), Pubkey::new_unique()),
            (dec!(-2), 1, Pubkey::new_unique(), Pubkey::new_unique()),
            (dec!(10), 0, Pubkey::new_unique(), Pubkey::new_unique()),
            (dec!(10), MAX_DURATION_MINUTES + 1, Pubkey::new_unique(), Pubkey::new_unique()),
            (dec!(10), u32::MAX, Pubkey::new_unique(), Pubkey::new_unique()),
            (dec!(10), 1, asset, asset),
        ];
        for (amount, minutes, award, purchase) in cases {
            let err = h
                .service
                .finalize(&placeholder, amount, minutes, award, purchase, &creator)
                .await
                .unwrap_err();
            assert!(matches!(err, CompetitionError::InvalidTerms(_)));
        }

        assert!(
            h.service
                .finalize(
                    &placeholder,
                    dec!(10),
                    MAX_DURATION_MINUTES,
                    Pubkey::new_unique(),
                    asset,
                    &creator
                )
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_finalize_consumes_placeholder() {
        let h = harness();
        let placeholder = h.service.create_pending().await.unwrap();
        let creator = Pubkey::new_unique();
        let finalized = h
            .service
            .finalize(
                &placeholder,
                dec!(10),
                1,
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                &creator,
            )
            .await
            .unwrap();

        assert_eq!(finalized.escrow.to_string(), placeholder);
        let err = h
            .service
            .finalize(
                &placeholder,
                dec!(10),
                1,
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                &creator,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CompetitionError::NotFound));

        let err = h
            .service
            .finalize(
                &finalized.id,
                dec!(10),
                1,
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                &creator,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CompetitionError::NotFound));
    }

    #[tokio::test]
    async fn test_funding_transaction_pays_escrow_from_creator() {
        let h = harness();
        let placeholder = h.service.create_pending().await.unwrap();
        let creator = Pubkey::new_unique();
        let finalized = h
            .service
            .finalize(
                &placeholder,
                dec!(10),
                1,
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                &creator,
            )
            .await
            .unwrap();

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&finalized.funding_transaction)
            .unwrap();
        let (transaction, _): (Transaction, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::legacy()).unwrap();
        assert_eq!(transaction.message.account_keys[0], creator);
        assert!(transaction.message.account_keys.contains(&finalized.escrow));
        assert_eq!(transaction.message.instructions.len(), 2);
        assert!(!transaction.is_signed());
    }

    #[tokio::test]
    async fn test_view_reports_time_remaining() {
        let h = harness();
        let award = Pubkey::new_unique();
        let finalized = finalize(&h, award, Pubkey::new_unique()).await;

        let view = h.service.view(&finalized.id).await.unwrap();
        assert!(!view.started);
        assert_eq!(view.time_remaining, Duration::minutes(1));
        assert_eq!(view.current_reward_balance, Decimal::ZERO);

        h.registry
            .process(StartCompetition {
                id: finalized.id.clone(),
                deadline: h.clock.now() + Duration::minutes(1),
            })
            .await
            .unwrap();
        h.clock.advance(Duration::seconds(20));
        h.gateway.set_balance(
            associated_token_address(&finalized.escrow, &award),
            TokenBalance {
                amount: 2_500_000,
                decimals: 6,
            },
        );

        let view = h.service.view(&finalized.id).await.unwrap();
        assert!(view.started);
        assert_eq!(view.time_remaining, Duration::seconds(40));
        assert_eq!(view.current_reward_balance, dec!(2.5));

        h.clock.advance(Duration::minutes(5));
        let view = h.service.view(&finalized.id).await.unwrap();
        assert_eq!(view.time_remaining, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_view_hides_placeholders_and_unknown_ids() {
        let h = harness();
        let placeholder = h.service.create_pending().await.unwrap();
        assert!(matches!(
            h.service.view(&placeholder).await.unwrap_err(),
            CompetitionError::NotFound
        ));
        assert!(matches!(
            h.service.view("missing").await.unwrap_err(),
            CompetitionError::NotFound
        ));
    }
}
