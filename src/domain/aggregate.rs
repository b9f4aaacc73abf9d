//! Bottom-up recomputation of prices and totals.

use generational_arena::Index;
use rust_decimal::Decimal;
use tracing::{debug, instrument, trace};

use crate::domain::arena::LineTree;
use crate::domain::decimal::{div_half_even, div_half_up, round_half_even};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::line::LineData;
use crate::domain::policy::{ComputePolicy, MarginFormula};
use crate::domain::pricing::TaxConverter;

/// Derives non-leaf prices and totals from their sub-lines.
pub struct Aggregator<'a> {
    converter: &'a dyn TaxConverter,
    policy: ComputePolicy,
}

impl<'a> Aggregator<'a> {
    pub fn new(converter: &'a dyn TaxConverter, policy: ComputePolicy) -> Self {
        Self { converter, policy }
    }

    pub fn policy(&self) -> &ComputePolicy {
        &self.policy
    }

    /// Derive the tax-inclusive unit price and total of a single line.
    pub fn recompute_node(&self, line: &mut LineData) -> DomainResult<()> {
        let pricing = &self.policy.pricing;
        let in_tax_price = self.converter.convert_ex_tax_to_in_tax(
            line.price,
            &line.tax_set,
            pricing.unit_price_digits,
        )?;
        let in_tax_total = in_tax_price
            .checked_mul(line.quantity)
            .ok_or_else(|| DomainError::overflow(line, "in-tax total"))?;

        line.in_tax_price = in_tax_price;
        line.in_tax_total = round_half_even(in_tax_total, pricing.total_digits);
        Ok(())
    }

    /// Derive `ex_tax_total = quantity * price` at total precision, then the tax-inclusive values.
    pub fn recompute_total(&self, line: &mut LineData) -> DomainResult<()> {
        let total = line
            .quantity
            .checked_mul(line.price)
            .ok_or_else(|| DomainError::overflow(line, "ex-tax total"))?;
        line.ex_tax_total = round_half_even(total, self.policy.pricing.total_digits);
        self.recompute_node(line)
    }

    /// Re-derive every non-leaf line below and including `idx`, children first.
    ///
    /// Sub-line indices are re-stamped from `prefix` before anything is summed.
    /// A leaf is price-authoritative and is left untouched.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn recompute_subtree(&self, tree: &mut LineTree, idx: Index, prefix: &str) -> DomainResult<()> {
        if tree.is_leaf(idx) {
            return Ok(());
        }
        tree.restamp_indices(idx, prefix);

        let parents: Vec<Index> = tree
            .iter_postorder_from(idx)
            .filter(|(_, node)| !node.is_leaf())
            .map(|(i, _)| i)
            .collect();

        for current in parents {
            let sums = self.sum_children(tree, current)?;
            let line = tree
                .line_mut(current)
                .ok_or_else(|| DomainError::NodeNotFound(format!("{current:?}")))?;
            self.apply_sums(line, sums)?;
            trace!("recomputed {}: total={} price={}", line.label(), line.ex_tax_total, line.price);
        }
        Ok(())
    }

    /// Re-stamp every top-level index as its position and recompute every subtree.
    #[instrument(level = "debug", skip_all)]
    pub fn recompute_all(&self, tree: &mut LineTree) -> DomainResult<()> {
        let roots = tree.roots().to_vec();
        for (position, root) in roots.into_iter().enumerate() {
            let index = (position + 1).to_string();
            let line = tree
                .line_mut(root)
                .ok_or_else(|| DomainError::NodeNotFound(format!("{root:?}")))?;
            line.index = Some(index.clone());
            self.recompute_subtree(tree, root, &index)?;
        }
        debug!("recomputed {} top-level lines", tree.roots().len());
        Ok(())
    }

    /// Gross margin of `line` under the configured formula, zero when the divisor is zero.
    pub fn gross_margin(&self, line: &LineData) -> DomainResult<Decimal> {
        let digits = self.policy.cost.margin_digits;
        match self.policy.cost.margin_formula {
            MarginFormula::Markup => {
                if line.cost_price.is_zero() {
                    return Ok(Decimal::ZERO);
                }
                let ratio = div_half_even(line.price, line.cost_price, digits)
                    .ok_or_else(|| DomainError::overflow(line, "gross margin"))?;
                Ok(ratio - (line.general_expenses + Decimal::ONE))
            }
            MarginFormula::ExpenseRatio => {
                let divisor = line
                    .general_expenses
                    .checked_mul(line.cost_price)
                    .ok_or_else(|| DomainError::overflow(line, "gross margin"))?;
                if divisor.is_zero() {
                    return Ok(Decimal::ZERO);
                }
                div_half_up(line.price, divisor, digits)
                    .ok_or_else(|| DomainError::overflow(line, "gross margin"))
            }
        }
    }

    fn sum_children(&self, tree: &LineTree, idx: Index) -> DomainResult<ChildSums> {
        let mut sums = ChildSums::default();
        for &child in tree.children(idx) {
            let Some(line) = tree.line(child) else {
                continue;
            };
            sums.total = sums
                .total
                .checked_add(line.ex_tax_total)
                .ok_or_else(|| DomainError::overflow(line, "sub-line total"))?;
            if self.policy.cost.unit_price_calculation {
                let cost = line
                    .cost_price
                    .checked_mul(line.quantity)
                    .and_then(|c| sums.cost_total.checked_add(c))
                    .ok_or_else(|| DomainError::overflow(line, "sub-line cost"))?;
                sums.cost_total = cost;
            }
        }
        Ok(sums)
    }

    fn apply_sums(&self, line: &mut LineData, sums: ChildSums) -> DomainResult<()> {
        let digits = self.policy.pricing.unit_price_digits;
        if line.quantity.is_zero() {
            line.price = Decimal::ZERO;
            line.ex_tax_total = Decimal::ZERO;
        } else {
            line.price = div_half_even(sums.total, line.quantity, digits)
                .ok_or_else(|| DomainError::overflow(line, "unit price"))?;
            line.ex_tax_total = sums.total;
        }

        if self.policy.cost.unit_price_calculation {
            line.cost_price = if line.quantity.is_zero() {
                Decimal::ZERO
            } else {
                div_half_even(sums.cost_total, line.quantity, digits)
                    .ok_or_else(|| DomainError::overflow(line, "cost price"))?
            };
            line.gross_margin = self.gross_margin(line)?;
        }

        self.recompute_node(line)?;
        line.snapshot_before_update();
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ChildSums {
    total: Decimal,
    cost_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::line::{LineSubtree, TaxSet};
    use crate::domain::policy::CostPolicy;
    use crate::domain::pricing::PricingError;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    struct Identity;

    impl TaxConverter for Identity {
        fn convert_ex_tax_to_in_tax(&self, price: Decimal, _: &TaxSet, _: u32) -> Result<Decimal, PricingError> {
            Ok(price)
        }
    }

    struct Rejecting;

    impl TaxConverter for Rejecting {
        fn convert_ex_tax_to_in_tax(&self, _: Decimal, _: &TaxSet, _: u32) -> Result<Decimal, PricingError> {
            Err(PricingError::new("rate table unavailable"))
        }
    }

    fn leaf(cid: &str, qty: Decimal, price: Decimal) -> LineSubtree {
        LineSubtree::leaf(
            LineData::new(qty, price)
                .with_client_id(cid)
                .with_ex_tax_total(qty * price),
        )
    }

    fn construction() -> ComputePolicy {
        ComputePolicy {
            cost: CostPolicy {
                unit_price_calculation: true,
                ..CostPolicy::default()
            },
            ..ComputePolicy::default()
        }
    }

    #[test]
    fn given_nested_lines_when_recomputing_then_totals_roll_up() {
        let mut tree = LineTree::from_subtrees(vec![LineSubtree::with_children(
            LineData::new(dec!(2), dec!(0)).with_client_id("root").with_index("1"),
            vec![
                leaf("a", dec!(3), dec!(10)),
                LineSubtree::with_children(
                    LineData::new(dec!(1), dec!(0)).with_client_id("b"),
                    vec![leaf("b1", dec!(2), dec!(2.5)), leaf("b2", dec!(1), dec!(7))],
                ),
            ],
        )]);
        let root = tree.roots()[0];
        let aggregator = Aggregator::new(&Identity, ComputePolicy::default());

        aggregator.recompute_subtree(&mut tree, root, "1").unwrap();

        let b = tree.children(root)[1];
        let b_line = tree.line(b).unwrap();
        assert_eq!(b_line.ex_tax_total, dec!(12));
        assert_eq!(b_line.price, dec!(12.0000));
        assert_eq!(b_line.index.as_deref(), Some("1.2"));

        let root_line = tree.line(root).unwrap();
        assert_eq!(root_line.ex_tax_total, dec!(42));
        assert_eq!(root_line.price.to_string(), "21.0000");
        assert_eq!(root_line.in_tax_total, dec!(42.00));
        assert_eq!(root_line.price_before_update, Some(dec!(21)));
        assert_eq!(root_line.quantity_before_update, Some(dec!(2)));

        let b2 = tree.children(b)[1];
        assert_eq!(tree.line(b2).unwrap().index.as_deref(), Some("1.2.2"));
    }

    #[test]
    fn given_zero_quantity_parent_when_recomputing_then_price_and_total_are_zero() {
        let mut tree = LineTree::from_subtrees(vec![LineSubtree::with_children(
            LineData::new(dec!(0), dec!(9)).with_client_id("root"),
            vec![leaf("a", dec!(3), dec!(10))],
        )]);
        let root = tree.roots()[0];

        Aggregator::new(&Identity, ComputePolicy::default())
            .recompute_subtree(&mut tree, root, "1")
            .unwrap();

        let line = tree.line(root).unwrap();
        assert_eq!(line.price, Decimal::ZERO);
        assert_eq!(line.ex_tax_total, Decimal::ZERO);
    }

    #[test]
    fn given_leaf_when_recomputing_then_untouched() {
        let mut tree = LineTree::from_subtrees(vec![leaf("a", dec!(3), dec!(10))]);
        let root = tree.roots()[0];
        let before = tree.line(root).unwrap().clone();

        Aggregator::new(&Rejecting, ComputePolicy::default())
            .recompute_subtree(&mut tree, root, "1")
            .unwrap();

        assert_eq!(tree.line(root).unwrap(), &before);
    }

    #[test]
    fn given_rejecting_converter_when_recomputing_then_pricing_error_propagates() {
        let mut tree = LineTree::from_subtrees(vec![LineSubtree::with_children(
            LineData::new(dec!(1), dec!(0)).with_client_id("root"),
            vec![leaf("a", dec!(1), dec!(1))],
        )]);
        let root = tree.roots()[0];

        let result = Aggregator::new(&Rejecting, ComputePolicy::default()).recompute_subtree(&mut tree, root, "1");

        assert!(matches!(result, Err(DomainError::Pricing(_))));
    }

    #[test]
    fn given_unordered_roots_when_recompute_all_then_indices_follow_positions() {
        let mut tree = LineTree::from_subtrees(vec![
            LineSubtree::leaf(LineData::new(dec!(1), dec!(1)).with_index("7")),
            LineSubtree::with_children(
                LineData::new(dec!(1), dec!(0)).with_index("3"),
                vec![leaf("x", dec!(2), dec!(4))],
            ),
        ]);

        Aggregator::new(&Identity, ComputePolicy::default())
            .recompute_all(&mut tree)
            .unwrap();

        let indices: Vec<_> = tree.iter().map(|(_, n)| n.data.index.clone().unwrap()).collect();
        assert_eq!(indices, vec!["1", "2", "2.1"]);
        let second = tree.roots()[1];
        assert_eq!(tree.line(second).unwrap().ex_tax_total, dec!(8));
    }

    #[test]
    fn given_construction_policy_when_recomputing_then_cost_is_quantity_weighted() {
        let mut a = leaf("a", dec!(2), dec!(15));
        a.line.cost_price = dec!(10);
        let mut b = leaf("b", dec!(1), dec!(30));
        b.line.cost_price = dec!(20);
        let mut tree = LineTree::from_subtrees(vec![LineSubtree::with_children(
            LineData::new(dec!(1), dec!(0)).with_client_id("root"),
            vec![a, b],
        )]);
        let root = tree.roots()[0];

        Aggregator::new(&Identity, construction())
            .recompute_subtree(&mut tree, root, "1")
            .unwrap();

        let line = tree.line(root).unwrap();
        assert_eq!(line.cost_price, dec!(40));
        assert_eq!(line.price, dec!(60));
        // 60 / 40 - 1
        assert_eq!(line.gross_margin, dec!(0.50));
    }

    #[rstest]
    #[case::markup(MarginFormula::Markup, dec!(0), dec!(150), dec!(100), dec!(0.50))]
    #[case::markup_with_expenses(MarginFormula::Markup, dec!(0.1), dec!(150), dec!(100), dec!(0.40))]
    #[case::markup_zero_cost(MarginFormula::Markup, dec!(0.1), dec!(150), dec!(0), dec!(0))]
    #[case::expense_ratio(MarginFormula::ExpenseRatio, dec!(1.2), dec!(150), dec!(100), dec!(1.25))]
    #[case::expense_ratio_zero_expenses(MarginFormula::ExpenseRatio, dec!(0), dec!(150), dec!(100), dec!(0))]
    fn given_margin_formula_when_computing_margin_then_matches(
        #[case] formula: MarginFormula,
        #[case] general_expenses: Decimal,
        #[case] price: Decimal,
        #[case] cost: Decimal,
        #[case] expected: Decimal,
    ) {
        let mut policy = construction();
        policy.cost.margin_formula = formula;
        let mut line = LineData::new(dec!(1), price).with_cost_price(cost);
        line.general_expenses = general_expenses;

        let margin = Aggregator::new(&Identity, policy).gross_margin(&line).unwrap();

        assert_eq!(margin, expected);
    }
}
