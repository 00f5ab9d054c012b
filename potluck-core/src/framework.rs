use crate::entities::competition::{Competition, CompetitionId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// The process-wide store of competitions.
///
/// Volatile by design: it starts empty and everything in it is lost when the
/// process exits. Queries against it are expressed as
/// [`kanau::processor::Processor`] implementations in
/// [`crate::entities::competition`].
///
/// Cloning is cheap and every clone shares the same map. The lock is only
/// ever held for plain map operations, never across ledger calls.
#[derive(Clone, Default)]
pub struct CompetitionRegistry {
    pub(crate) inner: Arc<RwLock<HashMap<CompetitionId, RegistryEntry>>>,
    sequence: Arc<AtomicU64>,
}

/// A competition together with the sequence number it was inserted with,
/// so snapshots can be returned in insertion order.
#[derive(Clone)]
pub(crate) struct RegistryEntry {
    pub(crate) sequence: u64,
    pub(crate) competition: Competition,
}

impl CompetitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
