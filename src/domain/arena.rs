//! Arena-backed line hierarchy with explicit-stack traversals.

use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::line::{LineData, LineSubtree};

/// Tree node in the arena-based line hierarchy.
#[derive(Debug, Clone)]
pub struct LineNode {
    /// Line content
    pub data: LineData,
    /// Index of parent node in the arena, None for top-level lines
    pub parent: Option<Index>,
    /// Indices of sub-lines in the arena, in document order
    pub children: Vec<Index>,
}

impl LineNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-based forest holding every line of one document.
///
/// Sub-lines are owned through index lists; the parent relation is a plain
/// arena key, never an owning back-reference.
#[derive(Debug, Default, Clone)]
pub struct LineTree {
    /// Arena storage for all line nodes
    arena: Arena<LineNode>,
    /// Top-level lines in document order
    roots: Vec<Index>,
}

impl LineTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            roots: Vec::new(),
        }
    }

    /// Build the arena from owned subtrees (document order preserved).
    pub fn from_subtrees(subtrees: Vec<LineSubtree>) -> Self {
        let mut tree = Self::new();
        for subtree in subtrees {
            tree.insert_subtree(subtree, None);
        }
        tree
    }

    /// Append a line as the last child of `parent`, or as the last top-level line.
    #[instrument(level = "trace", skip(self, data))]
    pub fn insert_node(&mut self, data: LineData, parent: Option<Index>) -> Index {
        let node = LineNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        match parent.and_then(|p| self.arena.get_mut(p)) {
            Some(parent_node) => parent_node.children.push(node_idx),
            None => self.roots.push(node_idx),
        }

        node_idx
    }

    /// Append a whole owned subtree below `parent`; returns the subtree root.
    #[instrument(level = "trace", skip(self, subtree))]
    pub fn insert_subtree(&mut self, subtree: LineSubtree, parent: Option<Index>) -> Index {
        let LineSubtree { line, children } = subtree;
        let root_idx = self.insert_node(line, parent);

        let mut stack: Vec<(LineSubtree, Index)> =
            children.into_iter().rev().map(|c| (c, root_idx)).collect();
        while let Some((current, parent_idx)) = stack.pop() {
            let LineSubtree { line, children } = current;
            let current_idx = self.insert_node(line, Some(parent_idx));
            // Reverse so the first child is popped (and appended) first
            for child in children.into_iter().rev() {
                stack.push((child, current_idx));
            }
        }

        root_idx
    }

    /// Replace the line at `idx` and everything below it with `subtree`,
    /// keeping its position among its siblings.
    #[instrument(level = "debug", skip(self, subtree))]
    pub fn replace_subtree(&mut self, idx: Index, subtree: LineSubtree) -> DomainResult<Index> {
        let descendants: Vec<Index> = self.iter_from(idx).skip(1).map(|(i, _)| i).collect();
        for descendant in descendants {
            self.arena.remove(descendant);
        }

        let LineSubtree { line, children } = subtree;
        let node = self
            .arena
            .get_mut(idx)
            .ok_or_else(|| DomainError::NodeNotFound(line.label()))?;
        node.data = line;
        node.children.clear();

        for child in children {
            self.insert_subtree(child, Some(idx));
        }
        Ok(idx)
    }

    /// Overwrite the line data at `idx`, keeping its sub-lines.
    pub fn replace_line(&mut self, idx: Index, line: LineData) -> DomainResult<Index> {
        let node = self
            .arena
            .get_mut(idx)
            .ok_or_else(|| DomainError::NodeNotFound(line.label()))?;
        node.data = line;
        Ok(idx)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node(&self, idx: Index) -> Option<&LineNode> {
        self.arena.get(idx)
    }

    pub fn line(&self, idx: Index) -> Option<&LineData> {
        self.arena.get(idx).map(|n| &n.data)
    }

    pub fn line_mut(&mut self, idx: Index) -> Option<&mut LineData> {
        self.arena.get_mut(idx).map(|n| &mut n.data)
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn children(&self, idx: Index) -> &[Index] {
        self.arena
            .get(idx)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, idx: Index) -> Option<Index> {
        self.arena.get(idx).and_then(|n| n.parent)
    }

    pub fn is_leaf(&self, idx: Index) -> bool {
        self.arena.get(idx).map(LineNode::is_leaf).unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Walk parent links up to the top-level line owning `idx`.
    pub fn top_level_ancestor(&self, idx: Index) -> Option<Index> {
        let mut current = self.arena.get(idx).map(|_| idx)?;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        Some(current)
    }

    /// 1-based position of `idx` among its siblings.
    pub fn position(&self, idx: Index) -> Option<usize> {
        let siblings = match self.parent(idx) {
            Some(parent) => self.children(parent),
            None => self.roots.as_slice(),
        };
        siblings.iter().position(|&s| s == idx).map(|p| p + 1)
    }

    /// First line, in document order, that is the same line as `probe`.
    #[instrument(level = "debug", skip_all, fields(line = %probe.label()))]
    pub fn find_line(&self, probe: &LineData) -> Option<Index> {
        self.iter()
            .find(|(_, node)| node.data.same_line(probe))
            .map(|(idx, _)| idx)
    }

    /// Pre-order iteration over the whole document.
    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.roots.iter().rev().copied().collect())
    }

    /// Pre-order iteration over the subtree rooted at `idx` (including it).
    #[instrument(level = "trace", skip(self))]
    pub fn iter_from(&self, idx: Index) -> TreeIterator<'_> {
        TreeIterator::new(self, vec![idx])
    }

    /// Post-order iteration over the subtree rooted at `idx` (including it).
    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder_from(&self, idx: Index) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, vec![(idx, false)])
    }

    /// All leaf lines (no sub-lines), in document order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaves(&self) -> Vec<Index> {
        self.iter()
            .filter(|(_, node)| node.is_leaf())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Owned copy of the subtree rooted at `idx`.
    pub fn export_subtree(&self, idx: Index) -> Option<LineSubtree> {
        let mut built: HashMap<Index, LineSubtree> = HashMap::new();
        for (current, node) in self.iter_postorder_from(idx) {
            let children = node
                .children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(current, LineSubtree::with_children(node.data.clone(), children));
        }
        built.remove(&idx)
    }

    /// Owned copy of the whole document.
    pub fn to_subtrees(&self) -> Vec<LineSubtree> {
        self.roots
            .iter()
            .filter_map(|&root| self.export_subtree(root))
            .collect()
    }
}

pub struct TreeIterator<'a> {
    tree: &'a LineTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a LineTree, stack: Vec<Index>) -> Self {
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a LineNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a LineTree,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a LineTree, stack: Vec<(Index, bool)>) -> Self {
        Self { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a LineNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(cid: &str) -> LineData {
        LineData::new(dec!(1), dec!(1)).with_client_id(cid)
    }

    // root
    // ├── a
    // └── b
    //     ├── b1
    //     └── b2
    fn sample() -> LineTree {
        LineTree::from_subtrees(vec![
            LineSubtree::leaf(line("a")),
            LineSubtree::with_children(
                line("b"),
                vec![LineSubtree::leaf(line("b1")), LineSubtree::leaf(line("b2"))],
            ),
        ])
    }

    fn cids<'a>(it: impl Iterator<Item = (Index, &'a LineNode)>) -> Vec<String> {
        it.map(|(_, n)| n.data.client_id.as_ref().unwrap().to_string())
            .collect()
    }

    #[test]
    fn given_forest_when_iterating_then_visits_in_document_order() {
        let tree = sample();
        assert_eq!(cids(tree.iter()), vec!["a", "b", "b1", "b2"]);
    }

    #[test]
    fn given_subtree_when_iterating_postorder_then_children_come_first() {
        let tree = sample();
        let b = tree.roots()[1];
        assert_eq!(cids(tree.iter_postorder_from(b)), vec!["b1", "b2", "b"]);
    }

    #[test]
    fn given_nested_line_when_top_level_ancestor_then_returns_root() {
        let tree = sample();
        let b = tree.roots()[1];
        let b2 = tree.children(b)[1];
        assert_eq!(tree.top_level_ancestor(b2), Some(b));
        assert_eq!(tree.position(b2), Some(2));
        assert_eq!(tree.position(b), Some(2));
    }

    #[test]
    fn given_tree_when_exported_then_round_trips_structure() {
        let tree = sample();
        let exported = tree.to_subtrees();
        let rebuilt = LineTree::from_subtrees(exported.clone());
        assert_eq!(rebuilt.to_subtrees(), exported);
        assert_eq!(rebuilt.leaves().len(), 3);
    }

    #[test]
    fn given_line_when_replace_subtree_then_keeps_position_and_drops_old_children() {
        let mut tree = sample();
        let b = tree.roots()[1];
        let replacement = LineSubtree::with_children(
            line("b"),
            vec![LineSubtree::leaf(line("bx"))],
        );

        let idx = tree.replace_subtree(b, replacement).unwrap();

        assert_eq!(idx, b);
        assert_eq!(tree.position(b), Some(2));
        assert_eq!(cids(tree.iter()), vec!["a", "b", "bx"]);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn given_line_when_replace_line_then_keeps_sub_lines() {
        let mut tree = sample();
        let b = tree.roots()[1];

        tree.replace_line(b, LineData::new(dec!(4), dec!(2)).with_client_id("b")).unwrap();

        assert_eq!(tree.line(b).unwrap().quantity, dec!(4));
        assert_eq!(cids(tree.iter()), vec!["a", "b", "b1", "b2"]);
    }
}
