//! Tax converters backing the pricing port.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::trace;

use crate::domain::decimal::round_half_up;
use crate::domain::{PricingError, TaxConverter, TaxSet};

/// Tax-inclusive price equals the ex-tax price.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTaxConverter;

impl TaxConverter for NoTaxConverter {
    fn convert_ex_tax_to_in_tax(
        &self,
        ex_tax_unit_price: Decimal,
        _tax_set: &TaxSet,
        decimal_digits: u32,
    ) -> Result<Decimal, PricingError> {
        Ok(round_half_up(ex_tax_unit_price, decimal_digits))
    }
}

/// Applies the sum of the rates of every tax code in the set: `ex * (1 + Σ rate)`.
#[derive(Debug, Default, Clone)]
pub struct RateTableTaxConverter {
    rates: BTreeMap<String, Decimal>,
}

impl RateTableTaxConverter {
    pub fn new(rates: BTreeMap<String, Decimal>) -> Self {
        Self { rates }
    }

    fn combined_rate(&self, tax_set: &TaxSet) -> Result<Decimal, PricingError> {
        tax_set.codes().iter().try_fold(Decimal::ZERO, |total, code| {
            let rate = self
                .rates
                .get(code)
                .ok_or_else(|| PricingError::unknown_tax_code(code))?;
            total
                .checked_add(*rate)
                .ok_or_else(|| PricingError::new(format!("tax rate overflow at {code}")))
        })
    }
}

impl TaxConverter for RateTableTaxConverter {
    fn convert_ex_tax_to_in_tax(
        &self,
        ex_tax_unit_price: Decimal,
        tax_set: &TaxSet,
        decimal_digits: u32,
    ) -> Result<Decimal, PricingError> {
        let rate = self.combined_rate(tax_set)?;
        let in_tax = (Decimal::ONE + rate)
            .checked_mul(ex_tax_unit_price)
            .ok_or_else(|| PricingError::new("in-tax price overflow"))?;
        trace!("in-tax price {} at rate {}", in_tax, rate);
        Ok(round_half_up(in_tax, decimal_digits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn converter() -> RateTableTaxConverter {
        RateTableTaxConverter::new(BTreeMap::from([
            ("VAT20".to_string(), dec!(0.20)),
            ("ECO".to_string(), dec!(0.005)),
        ]))
    }

    #[test]
    fn given_tax_codes_when_converting_then_rates_are_summed() {
        let price = converter()
            .convert_ex_tax_to_in_tax(dec!(10), &TaxSet::from_codes(["VAT20", "ECO"]), 4)
            .unwrap();
        assert_eq!(price.to_string(), "12.0500");
    }

    #[test]
    fn given_empty_tax_set_when_converting_then_price_is_unchanged() {
        let price = converter()
            .convert_ex_tax_to_in_tax(dec!(3.33335), &TaxSet::default(), 4)
            .unwrap();
        assert_eq!(price, dec!(3.3334));
    }

    #[test]
    fn given_unknown_tax_code_when_converting_then_fails_with_code() {
        let err = converter()
            .convert_ex_tax_to_in_tax(dec!(10), &TaxSet::from_codes(["GST"]), 4)
            .unwrap_err();
        assert_eq!(err.tax_code.as_deref(), Some("GST"));
    }

    #[test]
    fn given_no_tax_converter_when_converting_then_rescales_only() {
        let price = NoTaxConverter
            .convert_ex_tax_to_in_tax(dec!(7.5), &TaxSet::from_codes(["VAT20"]), 4)
            .unwrap();
        assert_eq!(price.to_string(), "7.5000");
    }
}
