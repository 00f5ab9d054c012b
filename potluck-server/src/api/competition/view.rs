use axum::{
    Json,
    extract::{Path, State},
};
use potluck_sdk::objects::{ActionGetResponse, ActionLinks, LinkedAction};

use super::CompetitionApiError;
use crate::state::AppState;

/// `GET /{id}`: a competition rendered as an entry action.
pub(super) async fn view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionGetResponse>, CompetitionApiError> {
    let view = state.service.view(&id).await?;

    let remaining = view.time_remaining;
    let minutes = remaining.whole_minutes();
    let seconds = remaining.whole_seconds() % 60;
    let clock = if view.started {
        format!("in {minutes}m {seconds}s")
    } else {
        format!("{minutes} minutes after the first entry")
    };

    Ok(Json(ActionGetResponse {
        icon: state.actions.icon.clone(),
        title: "Enter the competition".to_string(),
        description: format!(
            "Purchase a ticket for {} {} to win {} {} {}",
            view.entry_amount.normalize(),
            view.purchase_asset,
            view.current_reward_balance.normalize(),
            view.award_asset,
            clock
        ),
        label: "Enter".to_string(),
        links: Some(ActionLinks {
            actions: vec![LinkedAction {
                href: format!("/purchase/{id}"),
                label: "Gamble".to_string(),
                parameters: vec![],
            }],
        }),
    }))
}
