//! Competition action handlers.
//!
//! # Endpoints
//!
//! - `GET  /create`                                                    – reserve an escrow
//! - `POST /create/{placeholder}/{amount}/{time}/{awardCoin}/{purchaseCoin}` – finalize terms
//! - `GET  /{id}`                                                      – competition as an action
//! - `POST /purchase/{id}`                                             – entry transaction

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use potluck_core::service::CompetitionError;
use potluck_sdk::objects::ActionError;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::state::AppState;

mod create;
mod purchase;
mod view;

/// Build the competition router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", get(create::reserve))
        .route(
            "/create/{placeholder}/{amount}/{time}/{awardCoin}/{purchaseCoin}",
            post(create::finalize),
        )
        .route("/purchase/{id}", post(purchase::purchase))
        .route("/{id}", get(view::view))
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in competition handlers.
#[derive(Debug)]
enum CompetitionApiError {
    /// Unknown competition or placeholder.
    NotFound,
    /// A path or body value could not be used.
    BadRequest(String),
    /// The ledger or indexer could not be reached.
    Ledger(String),
    /// Too many placeholders are waiting to be finalized.
    Busy,
    Internal(String),
}

impl From<CompetitionError> for CompetitionApiError {
    fn from(err: CompetitionError) -> Self {
        match err {
            CompetitionError::NotFound => CompetitionApiError::NotFound,
            CompetitionError::InvalidTerms(reason) => CompetitionApiError::BadRequest(reason),
            CompetitionError::Ledger(e) => CompetitionApiError::Ledger(e.to_string()),
            CompetitionError::Busy => CompetitionApiError::Busy,
            other => CompetitionApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for CompetitionApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            CompetitionApiError::NotFound => {
                (StatusCode::NOT_FOUND, "Competition not found".to_string())
            }
            CompetitionApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason),
            CompetitionApiError::Busy => (
                StatusCode::SERVICE_UNAVAILABLE,
                "too many pending competitions, try again later".to_string(),
            ),
            CompetitionApiError::Ledger(e) => {
                tracing::error!(error = %e, "Competition API ledger error");
                (StatusCode::BAD_GATEWAY, "ledger unavailable".to_string())
            }
            CompetitionApiError::Internal(e) => {
                tracing::error!(error = %e, "Competition API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ActionError::new(message))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a base58 public key supplied by the client.
fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, CompetitionApiError> {
    Pubkey::from_str(value)
        .map_err(|_| CompetitionApiError::BadRequest(format!("{field} is not a valid public key")))
}
