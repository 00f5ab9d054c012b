use crate::entities::competition::CompetitionTerms;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

/// Classification the indexer attaches to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    /// A plain asset transfer.
    Transfer,
    Other(String),
}

impl From<&str> for TransactionKind {
    fn from(value: &str) -> Self {
        match value {
            "TRANSFER" => TransactionKind::Transfer,
            other => TransactionKind::Other(other.to_string()),
        }
    }
}

/// One token movement inside a parsed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
    pub mint: String,
    pub from_user_account: Option<String>,
    pub to_user_account: Option<String>,
    /// Amount in whole units (already scaled by the mint's decimals).
    pub amount: Decimal,
}

/// A transaction as described by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub signature: String,
    pub kind: TransactionKind,
    pub fee_payer: String,
    pub token_transfers: Vec<TokenTransfer>,
    /// Execution error, if the transaction failed on chain.
    pub error: Option<String>,
}

impl ParsedTransaction {
    /// Whether this transaction is an entry into the competition described by
    /// `terms` whose deposit address is `escrow`.
    ///
    /// It must be a successful plain transfer that moves exactly
    /// `entry_amount` of the purchase asset into the escrow.
    pub fn qualifies(&self, terms: &CompetitionTerms, escrow: &Pubkey) -> bool {
        if self.kind != TransactionKind::Transfer || self.error.is_some() {
            return false;
        }
        let purchase_asset = terms.purchase_asset.to_string();
        let escrow = escrow.to_string();
        self.token_transfers.iter().any(|transfer| {
            transfer.mint == purchase_asset
                && transfer.to_user_account.as_deref() == Some(escrow.as_str())
                && transfer.amount == terms.entry_amount
        })
    }
}

/// Keep only the transactions that qualify, preserving scan order.
pub fn qualifying<'a>(
    transactions: &'a [ParsedTransaction],
    terms: &CompetitionTerms,
    escrow: &Pubkey,
) -> Vec<&'a ParsedTransaction> {
    transactions
        .iter()
        .filter(|tx| tx.qualifies(terms, escrow))
        .collect()
}
