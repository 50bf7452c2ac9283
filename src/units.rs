//! Conversion between smallest-unit integers and decimal strings.
//!
//! Scaling goes through alloy's unit helpers. This module adds the display
//! rule and the stricter input checks a typed amount needs.

use alloy::primitives::utils::{self, UnitsError};
use alloy::primitives::U256;

use crate::types::validation::ValidationError;

/// Decimals of the chain's native currency.
pub const NATIVE_DECIMALS: u8 = 18;

/// Formats a smallest-unit integer as a decimal string.
///
/// Trailing fractional zeros are trimmed but at least one fractional digit is
/// kept, so `1_000_000` with 6 decimals renders as `"1.0"` and `1_500_000` as
/// `"1.5"`. Decimal counts alloy cannot scale fall back to the raw integer.
pub fn format_units(value: U256, decimals: u8) -> String {
    let formatted = match utils::format_units(value, decimals) {
        Ok(formatted) => formatted,
        Err(e) => {
            tracing::debug!("Cannot format {} with {} decimals: {}", value, decimals, e);
            return value.to_string();
        }
    };

    let (whole, frac) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), ""));
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, frac)
    }
}

/// Parses a human-entered decimal amount into smallest units.
///
/// Accepts `"12"`, `"12.5"` and `".5"`. Rejects signs, exponents, more
/// fractional digits than `decimals`, and values that overflow `U256`.
/// Zero is returned as-is; positivity is the caller's rule.
pub fn parse_units(input: &str, decimals: u8) -> Result<U256, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidAmount(input.to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(ValidationError::NonPositiveAmount(trimmed.to_string()));
    }

    let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(ValidationError::InvalidAmount(trimmed.to_string()));
    }

    // alloy truncates extra fractional digits instead of rejecting them
    if frac.len() > decimals as usize {
        return Err(ValidationError::TooManyDecimals {
            amount: trimmed.to_string(),
            decimals,
        });
    }

    let normalized = format!("{}.{}", if whole.is_empty() { "0" } else { whole }, frac);
    utils::parse_units(&normalized, decimals)
        .map(|parsed| parsed.get_absolute())
        .map_err(|e: UnitsError| {
            tracing::debug!("Rejected amount {}: {}", trimmed, e);
            ValidationError::InvalidAmount(trimmed.to_string())
        })
}
