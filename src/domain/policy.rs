//! Computation policies, resolved once per operation and passed down explicitly.

use serde::{Deserialize, Serialize};

/// Decimal precision used by the price path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PricingPolicy {
    /// Fractional digits of unit prices (ex-tax, in-tax, cost)
    pub unit_price_digits: u32,
    /// Fractional digits of quantities
    pub quantity_digits: u32,
    /// Fractional digits of quantity/price coefficients
    pub coefficient_digits: u32,
    /// Fractional digits of line totals
    pub total_digits: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            unit_price_digits: 4,
            quantity_digits: 2,
            coefficient_digits: 4,
            total_digits: 2,
        }
    }
}

/// How the gross margin of a line is derived from its price and cost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarginFormula {
    /// `price / cost - (1 + general_expenses)`, half-even
    #[default]
    Markup,
    /// `price / (general_expenses * cost)`, half-up
    ExpenseRatio,
}

/// Cost price aggregation and margin derivation (construction documents).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CostPolicy {
    /// Aggregate cost prices and derive gross margins
    pub unit_price_calculation: bool,
    pub margin_formula: MarginFormula,
    /// Fractional digits of the gross margin
    pub margin_digits: u32,
}

impl Default for CostPolicy {
    fn default() -> Self {
        Self {
            unit_price_calculation: false,
            margin_formula: MarginFormula::Markup,
            margin_digits: 2,
        }
    }
}

/// Everything a recompute pass needs to know about the owning document type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputePolicy {
    pub pricing: PricingPolicy,
    pub cost: CostPolicy,
}

impl std::str::FromStr for MarginFormula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "markup" => Ok(MarginFormula::Markup),
            "expense_ratio" => Ok(MarginFormula::ExpenseRatio),
            other => Err(format!("unknown margin formula: {other}")),
        }
    }
}
