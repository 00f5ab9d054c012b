use axum::{
    Json,
    extract::{Path, State},
};
use potluck_sdk::objects::{
    ActionGetResponse, ActionLinks, ActionParameter, ActionPostRequest, ActionPostResponse,
    FinalizeCompetitionPath, LinkedAction,
};

use super::{CompetitionApiError, parse_pubkey};
use crate::state::AppState;

const CREATE_LABEL: &str = "Create a competition";

/// `GET /create`: reserve an escrow and hand out the finalize link.
///
/// The placeholder is baked into the link, the remaining path segments are
/// filled in by the client from the action parameters.
pub(super) async fn reserve(
    State(state): State<AppState>,
) -> Result<Json<ActionGetResponse>, CompetitionApiError> {
    let placeholder = state.service.create_pending().await?;

    Ok(Json(ActionGetResponse {
        icon: state.actions.icon.clone(),
        title: CREATE_LABEL.to_string(),
        description: "Create a competition: the first matching deposit starts the clock and \
                      one random entrant takes the whole pot."
            .to_string(),
        label: CREATE_LABEL.to_string(),
        links: Some(ActionLinks {
            actions: vec![LinkedAction {
                href: format!(
                    "/create/{placeholder}/{{amount}}/{{time}}/{{awardCoin}}/{{purchaseCoin}}"
                ),
                label: CREATE_LABEL.to_string(),
                parameters: vec![
                    ActionParameter::new("amount", "Enter amount"),
                    ActionParameter::new("time", "Enter time in minutes from the first deposit"),
                    ActionParameter::new("awardCoin", "Enter award coin"),
                    ActionParameter::new("purchaseCoin", "Enter purchase coin"),
                ],
            }],
        }),
    }))
}

/// `POST /create/{placeholder}/{amount}/{time}/{awardCoin}/{purchaseCoin}`:
/// attach terms to a reserved escrow.
///
/// Returns the unsigned transaction through which the creator funds the
/// escrow's fees and rent.
pub(super) async fn finalize(
    State(state): State<AppState>,
    Path(path): Path<FinalizeCompetitionPath>,
    Json(body): Json<ActionPostRequest>,
) -> Result<Json<ActionPostResponse>, CompetitionApiError> {
    let creator = parse_pubkey("account", &body.account)?;
    let award_asset = parse_pubkey("awardCoin", &path.award_coin)?;
    let purchase_asset = parse_pubkey("purchaseCoin", &path.purchase_coin)?;

    let finalized = state
        .service
        .finalize(
            &path.placeholder,
            path.amount,
            path.time,
            award_asset,
            purchase_asset,
            &creator,
        )
        .await?;

    let link = state
        .actions
        .public_base_url
        .join(&finalized.id)
        .map_err(|e| CompetitionApiError::Internal(e.to_string()))?;

    Ok(Json(ActionPostResponse {
        transaction: finalized.funding_transaction,
        message: Some(format!(
            "Competition created. Participants enter by sending {} {} to {} or through {} in a \
             blink client. Fund the prize by sending {} to {}.",
            path.amount, path.purchase_coin, finalized.escrow, link, path.award_coin, finalized.escrow
        )),
    }))
}
