//! Application state shared across all request handlers.

use crate::config::ActionsConfig;
use potluck_core::service::CompetitionService;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Competition operations backed by the shared registry.
    pub service: Arc<CompetitionService>,
    /// How actions are presented to blink clients.
    pub actions: Arc<ActionsConfig>,
}

impl AppState {
    pub fn new(service: CompetitionService, actions: ActionsConfig) -> Self {
        Self {
            service: Arc::new(service),
            actions: Arc::new(actions),
        }
    }
}
