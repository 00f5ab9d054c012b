//! Response types of the enhanced-transaction indexer.

use super::LedgerError;
use crate::entities::{ParsedTransaction, TokenTransfer, TransactionKind};
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnhancedTransaction {
    pub signature: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub fee_payer: String,
    #[serde(default)]
    pub transaction_error: Option<serde_json::Value>,
    #[serde(default)]
    pub token_transfers: Vec<EnhancedTokenTransfer>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnhancedTokenTransfer {
    #[serde(default)]
    pub from_user_account: Option<String>,
    #[serde(default)]
    pub to_user_account: Option<String>,
    pub mint: String,
    pub token_amount: serde_json::Number,
}

impl TryFrom<EnhancedTransaction> for ParsedTransaction {
    type Error = LedgerError;

    fn try_from(tx: EnhancedTransaction) -> Result<Self, LedgerError> {
        let token_transfers = tx
            .token_transfers
            .into_iter()
            .map(|t| {
                Ok(TokenTransfer {
                    amount: number_to_decimal(&t.token_amount)?,
                    mint: t.mint,
                    from_user_account: t.from_user_account,
                    to_user_account: t.to_user_account,
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        Ok(ParsedTransaction {
            kind: TransactionKind::from(tx.kind.as_str()),
            signature: tx.signature,
            fee_payer: tx.fee_payer,
            token_transfers,
            error: tx.transaction_error.map(|e| e.to_string()),
        })
    }
}

/// The indexer reports amounts as JSON floats, occasionally in exponent form.
fn number_to_decimal(number: &serde_json::Number) -> Result<Decimal, LedgerError> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| LedgerError::Parse(format!("Invalid token amount {text}: {e}")))
}
