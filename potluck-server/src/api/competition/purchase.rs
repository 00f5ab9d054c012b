use axum::{
    Json,
    extract::{Path, State},
};
use potluck_sdk::objects::{ActionPostRequest, ActionPostResponse};

use super::{CompetitionApiError, parse_pubkey};
use crate::state::AppState;

/// `POST /purchase/{id}`: entry transaction for the posting wallet.
///
/// The transaction is co-signed by the competition's escrow and still needs
/// the participant's signature.
pub(super) async fn purchase(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ActionPostRequest>,
) -> Result<Json<ActionPostResponse>, CompetitionApiError> {
    let participant = parse_pubkey("account", &body.account)?;
    let transaction = state.service.build_entry(&id, &participant).await?;

    tracing::debug!(competition = %id, %participant, "Issued entry transaction");

    Ok(Json(ActionPostResponse {
        transaction,
        message: Some("Sign to enter the competition".to_string()),
    }))
}
