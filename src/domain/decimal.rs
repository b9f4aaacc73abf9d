//! Fixed-scale decimal helpers shared by the coefficient, propagation and
//! aggregation passes.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round half-to-even and pad to exactly `digits` fractional digits.
pub fn round_half_even(value: Decimal, digits: u32) -> Decimal {
    round_with(value, digits, RoundingStrategy::MidpointNearestEven)
}

/// Round half-away-from-zero and pad to exactly `digits` fractional digits.
pub fn round_half_up(value: Decimal, digits: u32) -> Decimal {
    round_with(value, digits, RoundingStrategy::MidpointAwayFromZero)
}

fn round_with(value: Decimal, digits: u32, strategy: RoundingStrategy) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(digits, strategy);
    rounded.rescale(digits);
    rounded
}

/// Substitute `1` for a zero or absent value.
///
/// A missing baseline is a neutral multiplier, never a division fault.
pub fn effective(value: Option<Decimal>) -> Decimal {
    match value {
        Some(v) if !v.is_zero() => v,
        _ => Decimal::ONE,
    }
}

/// `numerator / denominator` rounded half-to-even, or `None` on overflow or zero divisor.
pub fn div_half_even(numerator: Decimal, denominator: Decimal, digits: u32) -> Option<Decimal> {
    numerator
        .checked_div(denominator)
        .map(|q| round_half_even(q, digits))
}

/// `numerator / denominator` rounded half-up, or `None` on overflow or zero divisor.
pub fn div_half_up(numerator: Decimal, denominator: Decimal, digits: u32) -> Option<Decimal> {
    numerator
        .checked_div(denominator)
        .map(|q| round_half_up(q, digits))
}
