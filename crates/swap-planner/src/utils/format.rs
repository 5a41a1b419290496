//! Human-readable rendering of raw amounts.

use std::str::FromStr;

use alloy_primitives::{I256, U256};
use rust_decimal::Decimal;

use crate::types::SLIPPAGE_SCALE;

/// Raw amount as a decimal token quantity, rounded to 6 places. Falls back to
/// the raw integer when it does not fit a `Decimal`.
pub fn format_token_amount(raw_amount: U256, decimals: u8) -> String {
    if decimals == 0 {
        return raw_amount.to_string();
    }
    match Decimal::from_str(&raw_amount.to_string()) {
        Ok(mut amount) => match amount.set_scale(decimals as u32) {
            Ok(()) => amount.round_dp(6).to_string(),
            Err(_) => raw_amount.to_string(),
        },
        Err(_) => raw_amount.to_string(),
    }
}

/// Slippage (1e12 = 100 %) as a percentage with 4 decimal places.
pub fn format_slippage(slippage: I256) -> String {
    let scale = Decimal::from_str(&SLIPPAGE_SCALE.to_string()).unwrap_or(Decimal::ONE);
    match Decimal::from_str(&slippage.to_string()) {
        Ok(value) => format!("{:.4}%", value * Decimal::ONE_HUNDRED / scale),
        Err(_) => slippage.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_amounts_with_decimals() {
        assert_eq!(format_token_amount(U256::from(1_500_000u64), 6), "1.500000");
        assert_eq!(format_token_amount(U256::from(123u64), 0), "123");
        assert_eq!(format_token_amount(U256::from(1_234_567_891_234_567_891u64), 18), "1.234568");
        // too large for Decimal
        assert_eq!(format_token_amount(U256::MAX, 18), U256::MAX.to_string());
    }

    #[test]
    fn formats_slippage_as_percent() {
        assert_eq!(format_slippage(I256::try_from(10_000_000_000i64).unwrap()), "1.0000%");
        assert_eq!(format_slippage(-I256::try_from(5_000_000_000i64).unwrap()), "-0.5000%");
    }
}
