//! Dotted hierarchical line indices (`"1"`, `"1.2"`, `"1.2.1"`).
//!
//! Indices are append-only: a removed line leaves a permanent gap, because
//! documents may reference a line's index from outside.

use generational_arena::Index;
use tracing::{debug, warn};

use crate::domain::arena::LineTree;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::line::LineData;

/// Index of the `position`-th (1-based) sub-line of the line indexed `prefix`.
pub fn child_index(prefix: &str, position: usize) -> String {
    format!("{prefix}.{position}")
}

/// Leading integer segment of a dotted index (`"12.3"` → `12`).
pub fn top_level_number(index: &str) -> Option<u64> {
    index.split('.').next().and_then(|s| s.trim().parse().ok())
}

/// Index for the next top-level line: `max(top-level numbers) + 1`, or `"1"`.
pub fn next_top_index(tree: &LineTree) -> String {
    tree.roots()
        .iter()
        .filter_map(|&root| tree.line(root).and_then(|l| l.index.as_deref()))
        .filter_map(|index| {
            let number = top_level_number(index);
            if number.is_none() {
                warn!("ignoring unparsable top-level index {:?}", index);
            }
            number
        })
        .max()
        .map(|max| (max + 1).to_string())
        .unwrap_or_else(|| "1".to_string())
}

/// Index for a new sub-line appended below `parent`.
pub fn next_child_index(tree: &LineTree, parent: Index) -> DomainResult<String> {
    let parent_line = tree
        .line(parent)
        .ok_or_else(|| DomainError::NodeNotFound(format!("{parent:?}")))?;
    let prefix = parent_line
        .index
        .as_deref()
        .ok_or_else(|| DomainError::UnindexedParent(parent_line.label()))?;
    Ok(child_index(prefix, tree.children(parent).len() + 1))
}

/// Start index of a new line, either top-level or below `parent`.
pub fn start_index(tree: &LineTree, parent: Option<Index>) -> DomainResult<String> {
    match parent {
        Some(parent) => next_child_index(tree, parent),
        None => Ok(next_top_index(tree)),
    }
}

impl LineTree {
    /// Append a new line, assigning its start index and a client id when missing.
    pub fn add_line(&mut self, mut line: LineData, parent: Option<Index>) -> DomainResult<Index> {
        if line.index.is_none() {
            line.index = Some(start_index(self, parent)?);
        }
        line.ensure_client_id();
        debug!("add_line: {}", line.label());
        Ok(self.insert_node(line, parent))
    }

    /// Re-stamp the indices of every line below `idx` from its position,
    /// using `prefix` as the index of `idx` itself.
    pub fn restamp_indices(&mut self, idx: Index, prefix: &str) {
        let mut stack = vec![(idx, prefix.to_string())];
        while let Some((current, current_prefix)) = stack.pop() {
            let children = self.children(current).to_vec();
            for (position, child) in children.into_iter().enumerate() {
                let index = child_index(&current_prefix, position + 1);
                if let Some(line) = self.line_mut(child) {
                    line.index = Some(index.clone());
                }
                stack.push((child, index));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn blank() -> LineData {
        LineData::new(dec!(1), dec!(1))
    }

    #[test]
    fn given_lines_added_in_sequence_when_indexing_then_top_level_counts_up() {
        let mut tree = LineTree::new();
        let first = tree.add_line(blank(), None).unwrap();
        let second = tree.add_line(blank(), None).unwrap();
        let third = tree.add_line(blank(), None).unwrap();

        let indices: Vec<_> = [first, second, third]
            .iter()
            .map(|&i| tree.line(i).unwrap().index.clone().unwrap())
            .collect();
        assert_eq!(indices, vec!["1", "2", "3"]);

        let child = tree.add_line(blank(), Some(second)).unwrap();
        assert_eq!(tree.line(child).unwrap().index.as_deref(), Some("2.1"));
    }

    #[test]
    fn given_gap_in_top_level_indices_when_next_top_index_then_uses_max_plus_one() {
        let mut tree = LineTree::new();
        tree.insert_node(blank().with_index("1"), None);
        tree.insert_node(blank().with_index("4"), None);
        tree.insert_node(blank(), None);

        assert_eq!(next_top_index(&tree), "5");
    }

    #[test]
    fn given_no_indexed_line_when_next_top_index_then_returns_one() {
        let mut tree = LineTree::new();
        assert_eq!(next_top_index(&tree), "1");
        tree.insert_node(blank(), None);
        assert_eq!(next_top_index(&tree), "1");
    }

    #[test]
    fn given_unparsable_index_when_next_top_index_then_skips_it() {
        let mut tree = LineTree::new();
        tree.insert_node(blank().with_index("x"), None);
        tree.insert_node(blank().with_index("2"), None);
        assert_eq!(next_top_index(&tree), "3");
    }

    #[test]
    fn given_unindexed_parent_when_adding_child_then_fails() {
        let mut tree = LineTree::new();
        let parent = tree.insert_node(blank(), None);
        let result = tree.add_line(blank(), Some(parent));
        assert!(matches!(result, Err(DomainError::UnindexedParent(_))));
    }

    #[test]
    fn given_explicit_index_when_adding_line_then_keeps_it() {
        let mut tree = LineTree::new();
        let idx = tree.add_line(blank().with_index("9"), None).unwrap();
        assert_eq!(tree.line(idx).unwrap().index.as_deref(), Some("9"));
        assert!(tree.line(idx).unwrap().client_id.is_some());
    }

    #[test]
    fn given_nested_lines_when_restamping_then_indices_follow_positions() {
        let mut tree = LineTree::new();
        let root = tree.insert_node(blank().with_index("3"), None);
        let a = tree.insert_node(blank().with_index("3.7"), Some(root));
        let b = tree.insert_node(blank(), Some(root));
        let b1 = tree.insert_node(blank(), Some(b));

        tree.restamp_indices(root, "3");

        assert_eq!(tree.line(a).unwrap().index.as_deref(), Some("3.1"));
        assert_eq!(tree.line(b).unwrap().index.as_deref(), Some("3.2"));
        assert_eq!(tree.line(b1).unwrap().index.as_deref(), Some("3.2.1"));
    }
}
