//! Competition path objects.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Path parameters of the finalize link handed out by the create action.
///
/// Field names follow the `{awardCoin}`/`{purchaseCoin}` placeholders of the
/// link template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeCompetitionPath {
    /// Id of the reserved placeholder (the escrow's public key).
    pub placeholder: String,
    /// Entry amount in whole units of the purchase asset.
    pub amount: Decimal,
    /// Minutes the competition runs after the first qualifying deposit.
    pub time: u32,
    pub award_coin: String,
    pub purchase_coin: String,
}
