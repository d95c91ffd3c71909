//! Conversions between base units (wei, lamports) and decimal amounts

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use unipredict_core::{TradingError, TradingResult};

/// Convert a raw integer amount to whole units
pub fn from_base_units(raw: u128, decimals: u32) -> TradingResult<Decimal> {
    let raw = i128::try_from(raw)
        .map_err(|_| TradingError::decode(format!("Amount out of range: {}", raw)))?;

    Decimal::try_from_i128_with_scale(raw, decimals)
        .map(|d| d.normalize())
        .map_err(|e| TradingError::decode(format!("Amount out of range: {} ({})", raw, e)))
}

/// Convert whole units to a raw integer amount
///
/// Rejects negative amounts and amounts with more precision than the asset
/// supports.
pub fn to_base_units(amount: Decimal, decimals: u32) -> TradingResult<u128> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(TradingError::invalid_input(format!("Negative amount: {}", amount)));
    }

    let factor = Decimal::from_i128_with_scale(10i128.pow(decimals), 0);
    let scaled = amount
        .checked_mul(factor)
        .ok_or_else(|| TradingError::invalid_input(format!("Amount too large: {}", amount)))?;

    if !scaled.fract().is_zero() {
        return Err(TradingError::invalid_input(format!(
            "Amount {} has more than {} decimal places",
            amount, decimals
        )));
    }

    scaled
        .trunc()
        .to_u128()
        .ok_or_else(|| TradingError::invalid_input(format!("Amount too large: {}", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wei_to_ether() {
        assert_eq!(from_base_units(1_500_000_000_000_000_000, 18).unwrap(), dec!(1.5));
        assert_eq!(from_base_units(0, 18).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(from_base_units(2_500_000_000, 9).unwrap(), dec!(2.5));
        assert_eq!(from_base_units(1, 9).unwrap(), dec!(0.000000001));
    }

    #[test]
    fn test_to_base_units() {
        assert_eq!(to_base_units(dec!(0.5), 18).unwrap(), 500_000_000_000_000_000);
        assert_eq!(to_base_units(dec!(1), 6).unwrap(), 1_000_000);
    }

    #[test]
    fn test_to_base_units_rejects_bad_amounts() {
        assert!(matches!(to_base_units(dec!(-1), 18), Err(TradingError::InvalidInput(_))));
        assert!(matches!(to_base_units(dec!(0.0000001), 6), Err(TradingError::InvalidInput(_))));
    }
}
