//! Pricing collaborator port.
//!
//! The engine never interprets tax metadata itself; it hands the ex-tax unit
//! price and the line's tax set to a [`TaxConverter`] and stores what comes back.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::line::TaxSet;

/// Rejection raised by a pricing collaborator, propagated unmodified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("pricing conversion failed: {message}")]
pub struct PricingError {
    /// Tax code that caused the rejection, when the collaborator knows it
    pub tax_code: Option<String>,
    pub message: String,
}

impl PricingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            tax_code: None,
            message: message.into(),
        }
    }

    pub fn unknown_tax_code(code: &str) -> Self {
        Self {
            tax_code: Some(code.to_string()),
            message: format!("unknown tax code: {code}"),
        }
    }
}

/// Converts an ex-tax unit price into a tax-inclusive unit price.
pub trait TaxConverter: Send + Sync {
    fn convert_ex_tax_to_in_tax(
        &self,
        ex_tax_unit_price: Decimal,
        tax_set: &TaxSet,
        decimal_digits: u32,
    ) -> Result<Decimal, PricingError>;
}
