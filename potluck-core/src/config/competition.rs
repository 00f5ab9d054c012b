//! Competition lifecycle settings.

use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

/// Settings for polling, entry construction and payouts.
#[derive(Debug, Clone)]
pub struct CompetitionConfig {
    /// Interval between lifecycle ticks.
    pub poll_interval: Duration,
    /// Signatures requested per history page.
    pub page_size: usize,
    /// Indexer lookups in flight at once during a scan.
    pub lookup_concurrency: usize,
    /// Wallet that receives the platform's copy of every entry fee.
    pub fee_collector: Pubkey,
    /// Compute unit price attached to entry and funding transactions.
    pub priority_fee_micro_lamports: u64,
    /// Compute unit limit of payout transactions.
    pub payout_compute_unit_limit: u32,
    /// Lamports the creator sends to a new escrow to cover payout fees and rent.
    pub escrow_funding_lamports: u64,
    /// Reserved placeholders allowed to wait for finalization at once.
    pub max_reserved_placeholders: usize,
}

impl CompetitionConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
    pub const DEFAULT_PAGE_SIZE: usize = 1000;
    pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 8;
    pub const DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS: u64 = 33_333;
    pub const DEFAULT_PAYOUT_COMPUTE_UNIT_LIMIT: u32 = 1_000_000;
    pub const DEFAULT_ESCROW_FUNDING_LAMPORTS: u64 = 13_800_000;
    pub const DEFAULT_MAX_RESERVED_PLACEHOLDERS: usize = 10_000;

    /// Default settings with the given fee collector.
    pub fn new(fee_collector: Pubkey) -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            page_size: Self::DEFAULT_PAGE_SIZE,
            lookup_concurrency: Self::DEFAULT_LOOKUP_CONCURRENCY,
            fee_collector,
            priority_fee_micro_lamports: Self::DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS,
            payout_compute_unit_limit: Self::DEFAULT_PAYOUT_COMPUTE_UNIT_LIMIT,
            escrow_funding_lamports: Self::DEFAULT_ESCROW_FUNDING_LAMPORTS,
            max_reserved_placeholders: Self::DEFAULT_MAX_RESERVED_PLACEHOLDERS,
        }
    }
}
