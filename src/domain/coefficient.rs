//! Quantity/price ratios between an edited line and its baseline.

use rust_decimal::Decimal;

use crate::domain::decimal::{div_half_even, effective};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::line::LineData;
use crate::domain::policy::PricingPolicy;

/// Multiplicative ratios cascaded unchanged to every descendant of an edited line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coefficients {
    pub quantity: Decimal,
    pub price: Decimal,
}

impl Coefficients {
    pub const NEUTRAL: Coefficients = Coefficients {
        quantity: Decimal::ONE,
        price: Decimal::ONE,
    };

    /// `quantity / effective(quantity_before_update)` and
    /// `price / effective(price_before_update)`, rounded half-even.
    pub fn from_line(line: &LineData, policy: &PricingPolicy) -> DomainResult<Self> {
        let digits = policy.coefficient_digits;
        let quantity = div_half_even(line.quantity, effective(line.quantity_before_update), digits)
            .ok_or_else(|| DomainError::overflow(line, "quantity coefficient"))?;
        let price = div_half_even(line.price, effective(line.price_before_update), digits)
            .ok_or_else(|| DomainError::overflow(line, "price coefficient"))?;
        Ok(Self { quantity, price })
    }

    /// Both ratios are exactly one: propagation has nothing to do.
    pub fn is_neutral(&self) -> bool {
        self.quantity == Decimal::ONE && self.price == Decimal::ONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn edited(qty: Decimal, qty_before: Option<Decimal>, price: Decimal, price_before: Option<Decimal>) -> LineData {
        LineData {
            quantity: qty,
            quantity_before_update: qty_before,
            price,
            price_before_update: price_before,
            ..LineData::default()
        }
    }

    #[rstest]
    #[case::doubled_quantity(dec!(4), Some(dec!(2)), dec!(2.0000))]
    #[case::zero_baseline(dec!(6), Some(dec!(0)), dec!(6.0000))]
    #[case::absent_baseline(dec!(6), None, dec!(6.0000))]
    #[case::thirds(dec!(1), Some(dec!(3)), dec!(0.3333))]
    #[case::half_even(dec!(1), Some(dec!(32)), dec!(0.0312))]
    fn given_quantity_edit_when_computing_then_quantity_coefficient_matches(
        #[case] qty: Decimal,
        #[case] before: Option<Decimal>,
        #[case] expected: Decimal,
    ) {
        let line = edited(qty, before, dec!(5), Some(dec!(5)));
        let coefs = Coefficients::from_line(&line, &PricingPolicy::default()).unwrap();
        assert_eq!(coefs.quantity, expected);
        assert_eq!(coefs.price, Decimal::ONE);
    }

    #[test]
    fn given_zero_baseline_when_computing_then_coefficient_has_four_digits() {
        let line = edited(dec!(6), Some(Decimal::ZERO), dec!(1), None);
        let coefs = Coefficients::from_line(&line, &PricingPolicy::default()).unwrap();
        assert_eq!(coefs.quantity.to_string(), "6.0000");
    }

    #[test]
    fn given_unchanged_line_when_computing_then_coefficients_are_neutral() {
        let line = edited(dec!(3), Some(dec!(3.00)), dec!(12.5), Some(dec!(12.5000)));
        let coefs = Coefficients::from_line(&line, &PricingPolicy::default()).unwrap();
        assert!(coefs.is_neutral());
        assert_eq!(coefs, Coefficients::NEUTRAL);
    }

    #[test]
    fn given_price_edit_when_computing_then_price_coefficient_changes() {
        let line = edited(dec!(3), Some(dec!(3)), dec!(15), Some(dec!(10)));
        let coefs = Coefficients::from_line(&line, &PricingPolicy::default()).unwrap();
        assert_eq!(coefs.price, dec!(1.5));
        assert!(!coefs.is_neutral());
    }
}
