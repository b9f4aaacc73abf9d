//! Top-down cascade of an edit's coefficients through a subtree.

use generational_arena::Index;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::domain::aggregate::Aggregator;
use crate::domain::arena::LineTree;
use crate::domain::coefficient::Coefficients;
use crate::domain::decimal::{effective, round_half_even};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::line::LineData;

/// Scales every descendant of an edited line by the same coefficient pair.
pub struct Propagator<'a> {
    aggregator: &'a Aggregator<'a>,
}

impl<'a> Propagator<'a> {
    pub fn new(aggregator: &'a Aggregator<'a>) -> Self {
        Self { aggregator }
    }

    /// Apply `coefficients` to every line strictly below `idx`.
    ///
    /// Returns the number of lines updated; zero for a leaf or neutral coefficients.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn propagate(&self, tree: &mut LineTree, idx: Index, coefficients: Coefficients) -> DomainResult<usize> {
        if tree.is_leaf(idx) || coefficients.is_neutral() {
            return Ok(0);
        }

        let descendants: Vec<Index> = tree.iter_from(idx).skip(1).map(|(i, _)| i).collect();
        for &current in &descendants {
            let line = tree
                .line_mut(current)
                .ok_or_else(|| DomainError::NodeNotFound(format!("{current:?}")))?;
            self.scale(line, coefficients)?;
        }

        debug!("propagated {:?} to {} lines", coefficients, descendants.len());
        Ok(descendants.len())
    }

    fn scale(&self, line: &mut LineData, coefficients: Coefficients) -> DomainResult<()> {
        let policy = self.aggregator.policy();
        let pricing = &policy.pricing;

        line.quantity = round_half_even(
            product(line, coefficients.quantity, effective(Some(line.quantity)), "quantity")?,
            pricing.quantity_digits,
        );
        line.price = round_half_even(
            product(line, coefficients.price, effective(Some(line.price)), "price")?,
            pricing.unit_price_digits,
        );
        if policy.cost.unit_price_calculation {
            line.gross_margin = self.aggregator.gross_margin(line)?;
        }
        self.aggregator.recompute_total(line)?;
        line.snapshot_before_update();
        Ok(())
    }
}

fn product(line: &LineData, a: Decimal, b: Decimal, operation: &'static str) -> DomainResult<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| DomainError::overflow(line, operation))
}
