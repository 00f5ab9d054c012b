//! LifecycleEngine processor.
//!
//! The LifecycleEngine is responsible for:
//! - Ticking on a fixed interval until shutdown is signaled
//! - Starting the clock of a pending competition once its first qualifying
//!   entry shows up on chain
//! - Settling a competition once its deadline has passed: removing it from
//!   the registry and handing its entries to the [`PayoutEngine`]
//!
//! Competitions are processed one after another. A failure while handling
//! one competition is logged and never affects the others.

use super::payout::{PayoutEngine, PayoutOutcome};
use super::scanner::TransactionScanner;
use crate::config::CompetitionConfig;
use crate::entities::transaction::qualifying;
use crate::entities::{
    Competition, CompetitionTerms, ListCompetitions, ParsedTransaction, Phase, RemoveCompetition,
    StartCompetition,
};
use crate::framework::CompetitionRegistry;
use crate::ledger::LedgerGateway;
use crate::utils::clock::Clock;
use kanau::processor::Processor;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub struct LifecycleEngine {
    registry: CompetitionRegistry,
    scanner: TransactionScanner,
    payout: PayoutEngine,
    clock: Arc<dyn Clock>,
    poll_interval: std::time::Duration,
}

impl LifecycleEngine {
    pub fn new(
        registry: CompetitionRegistry,
        scanner: TransactionScanner,
        payout: PayoutEngine,
        clock: Arc<dyn Clock>,
        poll_interval: std::time::Duration,
    ) -> Self {
        Self {
            registry,
            scanner,
            payout,
            clock,
            poll_interval,
        }
    }

    /// Engine wired to `gateway` with the scan and payout settings of
    /// `config`.
    pub fn from_config(
        registry: CompetitionRegistry,
        gateway: Arc<dyn LedgerGateway>,
        clock: Arc<dyn Clock>,
        config: &CompetitionConfig,
    ) -> Self {
        Self::new(
            registry,
            TransactionScanner::new(gateway.clone(), config.page_size, config.lookup_concurrency),
            PayoutEngine::new(gateway, config.payout_compute_unit_limit),
            clock,
            config.poll_interval,
        )
    }

    /// Run the engine until shutdown is signaled.
    ///
    /// The first tick fires immediately. A tick that overruns the interval
    /// delays the next one instead of bursting.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "LifecycleEngine started"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("LifecycleEngine received shutdown signal");
                        break;
                    }
                }

                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        info!("LifecycleEngine shutdown complete");
    }

    /// One pass over a snapshot of the registry.
    pub async fn tick(&self) {
        let competitions = self
            .registry
            .process(ListCompetitions)
            .await
            .unwrap_or_default();

        debug!(competitions = competitions.len(), "Lifecycle tick");

        for (id, competition) in competitions {
            match competition.phase {
                Phase::Reserved => {}
                Phase::Pending { terms, duration } => {
                    self.try_start(&id, &competition, &terms, duration).await;
                }
                Phase::Active { terms, deadline } => {
                    let now = self.clock.now();
                    if now < deadline {
                        debug!(
                            competition = %id,
                            remaining_secs = (deadline - now).whole_seconds(),
                            "Competition running"
                        );
                    } else {
                        self.settle(&id, &competition, &terms).await;
                    }
                }
            }
        }
    }

    /// Start the clock if a qualifying entry exists.
    async fn try_start(
        &self,
        id: &str,
        competition: &Competition,
        terms: &CompetitionTerms,
        duration: time::Duration,
    ) {
        let Some(transactions) = self.scan(id, competition).await else {
            return;
        };
        if qualifying(&transactions, terms, &competition.escrow_address()).is_empty() {
            return;
        }

        let Some(deadline) = self.clock.now().checked_add(duration) else {
            warn!(
                competition = %id,
                duration_minutes = duration.whole_minutes(),
                "Deadline out of range, competition not started"
            );
            return;
        };
        let started = self
            .registry
            .process(StartCompetition {
                id: id.to_string(),
                deadline,
            })
            .await
            .unwrap_or(false);

        if started {
            info!(competition = %id, %deadline, "First entry received, competition started");
        }
    }

    /// Remove an expired competition and pay it out. Returns `None` when the
    /// scan failed or another pass already removed the record, in which case
    /// nothing was submitted.
    async fn settle(
        &self,
        id: &str,
        competition: &Competition,
        terms: &CompetitionTerms,
    ) -> Option<PayoutOutcome> {
        let transactions = self.scan(id, competition).await?;

        // Removed before the payout is submitted, so no later pass can pay twice.
        let removed = self
            .registry
            .process(RemoveCompetition { id: id.to_string() })
            .await
            .ok()
            .flatten();
        if removed.is_none() {
            debug!(competition = %id, "Competition already settled");
            return None;
        }

        let entries = qualifying(&transactions, terms, &competition.escrow_address());
        info!(
            competition = %id,
            entries = entries.len(),
            "Competition expired, settling"
        );

        Some(
            self.payout
                .payout(id, &competition.escrow, terms, &entries)
                .await,
        )
    }

    async fn scan(&self, id: &str, competition: &Competition) -> Option<Vec<ParsedTransaction>> {
        match self.scanner.scan(&competition.escrow_address()).await {
            Ok(transactions) => Some(transactions),
            Err(e) => {
                warn!(
                    competition = %id,
                    escrow = %competition.escrow_address(),
                    error = %e,
                    "Failed to scan escrow history"
                );
                None
            }
        }
    }
}
