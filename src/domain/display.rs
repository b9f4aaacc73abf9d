//! Terminal rendering of a line tree.

use std::collections::HashMap;

use generational_arena::Index;
use itertools::Itertools;
use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::LineTree;
use crate::domain::line::LineData;

/// One-line summary shown for each node of the printed tree.
pub fn line_summary(line: &LineData) -> String {
    let mut summary = format!(
        "{} qty={} price={} total={}",
        line.index.as_deref().unwrap_or("-"),
        line.quantity,
        line.price,
        line.ex_tax_total,
    );
    if !line.tax_set.is_empty() {
        summary.push_str(&format!(" [{}]", line.tax_set.codes().iter().join(", ")));
    }
    summary
}

impl LineTree {
    /// Render the document for terminal output, one `termtree` node per line.
    #[instrument(level = "debug", skip(self))]
    pub fn to_display_tree(&self, title: &str) -> Tree<String> {
        let mut built: HashMap<Index, Tree<String>> = HashMap::new();
        let mut document = Tree::new(title.to_string());

        for &root in self.roots() {
            for (idx, node) in self.iter_postorder_from(root) {
                let leaves: Vec<Tree<String>> = node
                    .children
                    .iter()
                    .filter_map(|child| built.remove(child))
                    .collect();
                built.insert(idx, Tree::new(line_summary(&node.data)).with_leaves(leaves));
            }
            if let Some(tree) = built.remove(&root) {
                document.push(tree);
            }
        }
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::line::{LineSubtree, TaxSet};
    use rust_decimal_macros::dec;

    #[test]
    fn given_nested_lines_when_rendering_then_shows_every_line() {
        let tree = LineTree::from_subtrees(vec![LineSubtree::with_children(
            LineData::new(dec!(1), dec!(10))
                .with_index("1")
                .with_tax_set(TaxSet::from_codes(["VAT20", "ECO"])),
            vec![LineSubtree::leaf(LineData::new(dec!(2), dec!(5)).with_index("1.1"))],
        )]);

        let rendered = tree.to_display_tree("order").to_string();

        assert!(rendered.starts_with("order"));
        assert!(rendered.contains("1 qty=1 price=10 total=0 [VAT20, ECO]"));
        assert!(rendered.contains("1.1 qty=2 price=5"));
    }
}
