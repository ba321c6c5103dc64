use rust_decimal::{Decimal, RoundingStrategy};

/// Format a reporting-currency amount with a fixed number of decimals,
/// e.g. `10407.60 BGN`.
///
/// Rounding is half away from zero. Trailing zeros are padded so every
/// amount in a message lines up.
pub fn format_amount(value: Decimal, currency: &str, decimals: u32) -> String {
    format!("{} {}", format_decimal(value, decimals), currency)
}

/// Round and pad a decimal to exactly `decimals` fractional digits.
pub fn format_decimal(value: Decimal, decimals: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        // Avoid rendering "-0.00" for tiny negative inputs.
        rounded = Decimal::ZERO;
    }
    rounded.rescale(decimals);
    rounded.to_string()
}
