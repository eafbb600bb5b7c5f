//! Last-digit extraction for the statistics stream
//!
//! The statistics convention reads the final character of a price's canonical
//! string form. Barrier contracts use a different, scaled-numeric convention;
//! see [`crate::contract::scaled_last_digit`].

use rust_decimal::Decimal;

/// Extract the last digit of a price string.
///
/// Returns the final character interpreted as a decimal digit, or 0 when the
/// string is empty or ends in anything other than `0-9`.
pub fn extract_digit(price: &str) -> u8 {
    price
        .trim_end()
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .map(|d| d as u8)
        .unwrap_or(0)
}

/// Extract the last digit of a decimal using its display form.
///
/// `Decimal` keeps its scale, so `100.00` renders as `"100.00"` and yields 0.
pub fn extract_digit_decimal(price: &Decimal) -> u8 {
    extract_digit(&price.to_string())
}
