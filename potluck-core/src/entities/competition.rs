use crate::framework::{CompetitionRegistry, RegistryEntry};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

/// Registry key. Placeholders are keyed by their escrow's base58 address,
/// finalized competitions by a UUID.
pub type CompetitionId = String;

/// Terms fixed when a competition is finalized. Never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompetitionTerms {
    /// Amount of `purchase_asset` (in whole units) a deposit must carry.
    pub entry_amount: Decimal,
    /// Mint participants pay the entry fee in.
    pub purchase_asset: Pubkey,
    /// Mint the winner is paid in.
    pub award_asset: Pubkey,
}

/// Where a competition is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Escrow generated, terms not supplied yet.
    Reserved,
    /// Waiting for the first qualifying deposit. The clock has not started.
    Pending {
        terms: CompetitionTerms,
        duration: Duration,
    },
    /// A qualifying deposit was seen; settles once `deadline` has passed.
    Active {
        terms: CompetitionTerms,
        deadline: OffsetDateTime,
    },
}

/// A competition record.
#[derive(Debug, Clone)]
pub struct Competition {
    /// Deposit address and payout signer. Owned by exactly one record.
    pub escrow: Arc<Keypair>,
    pub phase: Phase,
}

impl Competition {
    /// Generate a fresh escrow and wrap it in a `Reserved` record.
    ///
    /// Returns the placeholder id alongside the record.
    pub fn reserve() -> (CompetitionId, Self) {
        let escrow = Keypair::new();
        let id = escrow.pubkey().to_string();
        (
            id,
            Self {
                escrow: Arc::new(escrow),
                phase: Phase::Reserved,
            },
        )
    }

    pub fn escrow_address(&self) -> Pubkey {
        self.escrow.pubkey()
    }

    pub fn terms(&self) -> Option<&CompetitionTerms> {
        match &self.phase {
            Phase::Reserved => None,
            Phase::Pending { terms, .. } | Phase::Active { terms, .. } => Some(terms),
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self.phase, Phase::Active { .. })
    }
}

/// Errors returned by registry mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("competition not found")]
    NotFound,

    #[error("competition has already started")]
    AlreadyStarted,

    #[error("competition is not a placeholder")]
    NotReserved,

    #[error("competition id already in use")]
    IdTaken,

    #[error("too many reserved competitions")]
    PlaceholderLimit,
}

#[derive(Debug, Clone)]
/// Insert a competition, replacing an existing record only if it has not
/// started yet.
pub struct InsertCompetition {
    pub id: CompetitionId,
    pub competition: Competition,
}

impl Processor<InsertCompetition> for CompetitionRegistry {
    type Output = ();
    type Error = RegistryError;
    #[tracing::instrument(skip_all, err, name = "Registry:InsertCompetition")]
    async fn process(&self, insert: InsertCompetition) -> Result<(), RegistryError> {
        let sequence = self.next_sequence();
        let mut map = self.inner.write().await;
        if let Some(existing) = map.get(&insert.id) {
            if existing.competition.is_started() {
                return Err(RegistryError::AlreadyStarted);
            }
        }
        map.insert(
            insert.id,
            RegistryEntry {
                sequence,
                competition: insert.competition,
            },
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Look up a competition by id.
pub struct GetCompetition {
    pub id: CompetitionId,
}

impl Processor<GetCompetition> for CompetitionRegistry {
    type Output = Option<Competition>;
    type Error = Infallible;
    #[tracing::instrument(skip_all, name = "Registry:GetCompetition")]
    async fn process(&self, query: GetCompetition) -> Result<Option<Competition>, Infallible> {
        let map = self.inner.read().await;
        Ok(map.get(&query.id).map(|entry| entry.competition.clone()))
    }
}

#[derive(Debug, Clone)]
/// Remove a competition, returning the removed record.
pub struct RemoveCompetition {
    pub id: CompetitionId,
}

impl Processor<RemoveCompetition> for CompetitionRegistry {
    type Output = Option<Competition>;
    type Error = Infallible;
    #[tracing::instrument(skip_all, name = "Registry:RemoveCompetition")]
    async fn process(&self, query: RemoveCompetition) -> Result<Option<Competition>, Infallible> {
        let mut map = self.inner.write().await;
        Ok(map.remove(&query.id).map(|entry| entry.competition))
    }
}

#[derive(Debug, Clone, Copy)]
/// Snapshot every competition in insertion order.
pub struct ListCompetitions;

impl Processor<ListCompetitions> for CompetitionRegistry {
    type Output = Vec<(CompetitionId, Competition)>;
    type Error = Infallible;
    #[tracing::instrument(skip_all, name = "Registry:ListCompetitions")]
    async fn process(
        &self,
        _query: ListCompetitions,
    ) -> Result<Vec<(CompetitionId, Competition)>, Infallible> {
        let map = self.inner.read().await;
        let mut entries: Vec<_> = map
            .iter()
            .map(|(id, entry)| (entry.sequence, id.clone(), entry.competition.clone()))
            .collect();
        entries.sort_by_key(|(sequence, _, _)| *sequence);
        Ok(entries
            .into_iter()
            .map(|(_, id, competition)| (id, competition))
            .collect())
    }
}

#[derive(Debug, Clone)]
/// First step of creation: store a fresh `Reserved` record unless `limit`
/// placeholders are already waiting to be finalized.
pub struct ReservePlaceholder {
    pub id: CompetitionId,
    pub competition: Competition,
    pub limit: usize,
}

impl Processor<ReservePlaceholder> for CompetitionRegistry {
    type Output = ();
    type Error = RegistryError;
    #[tracing::instrument(skip_all, err, name = "Registry:ReservePlaceholder")]
    async fn process(&self, reserve: ReservePlaceholder) -> Result<(), RegistryError> {
        let sequence = self.next_sequence();
        let mut map = self.inner.write().await;
        let reserved = map
            .values()
            .filter(|entry| entry.competition.phase == Phase::Reserved)
            .count();
        if reserved >= reserve.limit {
            return Err(RegistryError::PlaceholderLimit);
        }
        if map.contains_key(&reserve.id) {
            return Err(RegistryError::IdTaken);
        }
        map.insert(
            reserve.id,
            RegistryEntry {
                sequence,
                competition: reserve.competition,
            },
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Second step of creation: move a placeholder's escrow into a `Pending`
/// competition stored under `new_id`.
///
/// The placeholder is removed in the same critical section, so the escrow
/// never belongs to two records.
pub struct ClaimPlaceholder {
    pub placeholder_id: CompetitionId,
    pub new_id: CompetitionId,
    pub terms: CompetitionTerms,
    pub duration: Duration,
}

impl Processor<ClaimPlaceholder> for CompetitionRegistry {
    type Output = Competition;
    type Error = RegistryError;
    #[tracing::instrument(skip_all, err, name = "Registry:ClaimPlaceholder")]
    async fn process(&self, claim: ClaimPlaceholder) -> Result<Competition, RegistryError> {
        let sequence = self.next_sequence();
        let mut map = self.inner.write().await;
        let placeholder = map
            .get(&claim.placeholder_id)
            .ok_or(RegistryError::NotFound)?;
        if placeholder.competition.phase != Phase::Reserved {
            return Err(RegistryError::NotReserved);
        }
        if map.contains_key(&claim.new_id) {
            return Err(RegistryError::IdTaken);
        }
        let Some(placeholder) = map.remove(&claim.placeholder_id) else {
            return Err(RegistryError::NotFound);
        };
        let competition = Competition {
            escrow: placeholder.competition.escrow,
            phase: Phase::Pending {
                terms: claim.terms,
                duration: claim.duration,
            },
        };
        map.insert(
            claim.new_id,
            RegistryEntry {
                sequence,
                competition: competition.clone(),
            },
        );
        Ok(competition)
    }
}

#[derive(Debug, Clone)]
/// Convert a `Pending` competition into an `Active` one with the given
/// absolute deadline.
///
/// Returns `false` without touching the record when it is not `Pending`,
/// so the conversion can only ever happen once.
pub struct StartCompetition {
    pub id: CompetitionId,
    pub deadline: OffsetDateTime,
}

impl Processor<StartCompetition> for CompetitionRegistry {
    type Output = bool;
    type Error = Infallible;
    #[tracing::instrument(skip_all, name = "Registry:StartCompetition")]
    async fn process(&self, start: StartCompetition) -> Result<bool, Infallible> {
        let mut map = self.inner.write().await;
        let Some(entry) = map.get_mut(&start.id) else {
            return Ok(false);
        };
        let Phase::Pending { terms, .. } = entry.competition.phase else {
            return Ok(false);
        };
        entry.competition.phase = Phase::Active {
            terms,
            deadline: start.deadline,
        };
        Ok(true)
    }
}
