//! HTTP API.
//!
//! Every endpoint speaks the Solana Actions format so that blink clients
//! can render it directly.

use crate::state::AppState;
use axum::Router;

mod competition;

/// Build the API router.
pub fn router() -> Router<AppState> {
    competition::router()
}
