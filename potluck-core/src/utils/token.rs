//! SPL token helpers shared by entry and payout construction.

use base64::Engine;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;

/// The canonical token account of `owner` for `mint`.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, mint)
}

/// Convert a whole-unit amount into the mint's integer base units.
///
/// Returns `None` when the amount is negative, has more precision than the
/// mint supports, or does not fit in a `u64`.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Option<u64> {
    let scale = 10u64.checked_pow(u32::from(decimals))?;
    let raw = amount.checked_mul(Decimal::from(scale))?;
    if raw.is_sign_negative() || !raw.fract().is_zero() {
        return None;
    }
    raw.to_u64()
}

/// Wire-encode a transaction and wrap it in base64 for wallets.
pub fn encode_transaction(transaction: &Transaction) -> Result<String, bincode::error::EncodeError> {
    let bytes = bincode::serde::encode_to_vec(transaction, bincode::config::legacy())?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_base_unit_scaling() {
        assert_eq!(to_base_units(dec!(10), 6), Some(10_000_000));
        assert_eq!(to_base_units(dec!(0.5), 9), Some(500_000_000));
        assert_eq!(to_base_units(dec!(1.25), 2), Some(125));
        assert_eq!(to_base_units(dec!(3), 0), Some(3));
    }

    #[test]
    fn test_base_unit_rejections() {
        // More precision than the mint has.
        assert_eq!(to_base_units(dec!(0.001), 2), None);
        assert_eq!(to_base_units(dec!(-1), 6), None);
        assert_eq!(to_base_units(dec!(100000000000000), 9), None);
    }

    #[test]
    fn test_associated_token_address_is_deterministic() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        assert_eq!(
            associated_token_address(&owner, &mint),
            associated_token_address(&owner, &mint)
        );
        assert_ne!(
            associated_token_address(&owner, &mint),
            associated_token_address(&Pubkey::new_unique(), &mint)
        );
    }
}
