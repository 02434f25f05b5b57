//! Decimal helpers for monetary values.

use rust_decimal::Decimal;

/// Decimal places shown for balances in logs and alerts.
pub const DISPLAY_PRECISION: u32 = 8;

/// Round a decimal to a specific number of decimal places.
pub fn round_to_precision(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp(decimals)
}

/// Render an amount with at most eight decimal places and no trailing zeros.
pub fn format_amount(value: Decimal) -> String {
    round_to_precision(value, DISPLAY_PRECISION)
        .normalize()
        .to_string()
}
