//! Conversion between human decimal prices and raw token amounts.
//!
//! Prices travel as decimal strings (`"50.00"`), while the token contract
//! works in its smallest unit. Conversion is purely textual so no precision
//! is ever lost to floating point.

use alloy::primitives::U256;
use thiserror::Error;

/// Largest precision a raw amount can carry; `U256::MAX` has 78 digits.
pub const MAX_DECIMALS: u32 = 77;

/// Reasons a decimal string could not be converted into a raw amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid character {0:?} in amount")]
    InvalidDigit(char),

    #[error("amount contains more than one decimal point")]
    MultipleDecimalPoints,

    #[error("amount does not fit in 256 bits")]
    Overflow,

    #[error("{0} decimals exceeds the maximum of {MAX_DECIMALS}")]
    TooManyDecimals(u32),
}

/// Convert a decimal string into a raw integer amount with `decimals` digits
/// of fractional precision.
///
/// The fractional part is padded with zeros or truncated (never rounded) to
/// exactly `decimals` digits. Malformed input yields zero; use
/// [`try_to_raw_amount`] when malformed input must be rejected instead.
pub fn to_raw_amount(decimal: &str, decimals: u32) -> U256 {
    try_to_raw_amount(decimal, decimals).unwrap_or(U256::ZERO)
}

/// Strict form of [`to_raw_amount`].
pub fn try_to_raw_amount(decimal: &str, decimals: u32) -> Result<U256, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::TooManyDecimals(decimals));
    }
    let decimal = decimal.trim();
    let (whole, fraction) = match decimal.split_once('.') {
        Some((whole, fraction)) => {
            if fraction.contains('.') {
                return Err(AmountError::MultipleDecimalPoints);
            }
            (whole, fraction)
        }
        None => (decimal, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Empty);
    }
    if let Some(bad) = whole.chars().chain(fraction.chars()).find(|c| !c.is_ascii_digit()) {
        return Err(AmountError::InvalidDigit(bad));
    }

    let width = decimals as usize;
    let mut digits = String::with_capacity(whole.len() + width);
    digits.push_str(whole);
    digits.extend(fraction.chars().chain(std::iter::repeat('0')).take(width));

    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(&digits, 10).map_err(|_| AmountError::Overflow)
}

/// Render a raw amount back as a decimal string, dropping trailing zeros of
/// the fractional part.
pub fn format_raw_amount(raw: U256, decimals: u32) -> String {
    let digits = raw.to_string();
    let width = decimals as usize;
    if width == 0 {
        return digits;
    }

    let padded = format!("{digits:0>width$}", width = width + 1);
    let (whole, fraction) = padded.split_at(padded.len() - width);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Apply the pricing-to-token scale factor. Floor division; a zero divisor
/// yields zero.
pub fn scale_down(raw: U256, divisor: u64) -> U256 {
    raw.checked_div(U256::from(divisor)).unwrap_or(U256::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_raw_amount() {
        assert_eq!(to_raw_amount("12.5", 2), U256::from(1250));
        assert_eq!(to_raw_amount("12", 2), U256::from(1200));
        assert_eq!(to_raw_amount("abc", 2), U256::ZERO);
        assert_eq!(to_raw_amount("1.23456", 2), U256::from(123));
        assert_eq!(to_raw_amount(".5", 2), U256::from(50));
        assert_eq!(to_raw_amount("7.", 3), U256::from(7000));
    }

    #[test]
    fn test_strict_conversion_rejects_malformed_input() {
        assert_eq!(try_to_raw_amount("", 2), Err(AmountError::Empty));
        assert_eq!(try_to_raw_amount(".", 2), Err(AmountError::Empty));
        assert_eq!(try_to_raw_amount("-1.5", 2), Err(AmountError::InvalidDigit('-')));
        assert_eq!(try_to_raw_amount("0x10", 0), Err(AmountError::InvalidDigit('x')));
        assert_eq!(
            try_to_raw_amount("1.2.3", 2),
            Err(AmountError::MultipleDecimalPoints)
        );
        assert_eq!(
            try_to_raw_amount(&"9".repeat(90), 0),
            Err(AmountError::Overflow)
        );
        assert_eq!(to_raw_amount("1.2.3", 2), U256::ZERO);
        assert_eq!(
            try_to_raw_amount("1", u32::MAX),
            Err(AmountError::TooManyDecimals(u32::MAX))
        );
        assert!(try_to_raw_amount("0", MAX_DECIMALS).is_ok());
    }

    #[test]
    fn test_required_amount_for_fifty_frax() {
        let raw = to_raw_amount("50.00", 18);
        assert_eq!(raw, U256::from(50u128 * 10u128.pow(18)));
        assert_eq!(scale_down(raw, 10_000), U256::from(5u128 * 10u128.pow(15)));
    }

    #[test]
    fn test_scale_down_floors() {
        assert_eq!(scale_down(U256::from(19_999), 10_000), U256::from(1));
        assert_eq!(scale_down(U256::from(5), 0), U256::ZERO);
    }

    #[test]
    fn test_format_raw_amount() {
        assert_eq!(format_raw_amount(U256::from(1250), 2), "12.5");
        assert_eq!(format_raw_amount(U256::from(1200), 2), "12");
        assert_eq!(format_raw_amount(U256::from(5), 3), "0.005");
        assert_eq!(format_raw_amount(U256::ZERO, 18), "0");
        assert_eq!(format_raw_amount(U256::from(42), 0), "42");
    }
}
