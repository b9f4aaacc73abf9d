//! Edit recomputation service
//!
//! Orchestrates one edit of a document's line tree:
//!
//! ```text
//! payload -> dirty line -> splice into live tree -> coefficients
//!         -> propagate down -> aggregate top-level ancestor -> flatten
//! ```
//!
//! Every mutation happens on a working copy that replaces the caller's tree
//! only when the whole operation succeeded.

use std::sync::Arc;

use generational_arena::Index;
use tracing::{debug, instrument, warn};

use crate::application::locator::DirtyLineLocator;
use crate::application::payload::EditPayload;
use crate::application::ApplicationResult;
use crate::domain::{
    prune_detached, start_index, AggregationMode, Aggregator, Coefficients, ComputePolicy,
    DomainError, Flattener, LineData, LineSubtree, LineTree, Propagator, TaxConverter,
};
use crate::infrastructure::traits::LineRepository;

/// What an edit did to the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The edited line was found and the tree recomputed
    Applied { line: String, updated: usize },
    /// No line of the payload is flagged as changed
    NoDirtyLine,
    /// The edited line matches no line of the tree; nothing changed
    IdentityMismatch { line: String },
}

/// Applies client edits to a line tree.
pub struct RecomputeService {
    repository: Arc<dyn LineRepository>,
    converter: Arc<dyn TaxConverter>,
}

impl RecomputeService {
    pub fn new(repository: Arc<dyn LineRepository>, converter: Arc<dyn TaxConverter>) -> Self {
        Self {
            repository,
            converter,
        }
    }

    /// Splice the edited line into `tree`, cascade its coefficients to its
    /// sub-lines and re-derive its top-level ancestor.
    #[instrument(level = "debug", skip_all)]
    pub fn update_related_lines(
        &self,
        tree: &mut LineTree,
        payload: &[EditPayload],
        policy: &ComputePolicy,
    ) -> ApplicationResult<EditOutcome> {
        let locator = DirtyLineLocator::new(self.repository.as_ref());
        let Some(dirty) = locator.locate(payload)? else {
            return Ok(EditOutcome::NoDirtyLine);
        };
        let label = dirty.line.label();

        let Some(target) = tree.find_line(&dirty.line) else {
            warn!("edited line {} not found in document, ignoring edit", label);
            return Ok(EditOutcome::IdentityMismatch { line: label });
        };

        let coefficients = Coefficients::from_line(&dirty.line, &policy.pricing)?;
        let aggregator = Aggregator::new(self.converter.as_ref(), *policy);

        let mut working = tree.clone();
        match dirty.children {
            Some(children) => working.replace_subtree(target, LineSubtree::with_children(dirty.line, children))?,
            None => working.replace_line(target, dirty.line)?,
        };
        if working.is_leaf(target) {
            let line = working
                .line_mut(target)
                .ok_or_else(|| DomainError::NodeNotFound(label.clone()))?;
            aggregator.recompute_total(line)?;
            line.snapshot_before_update();
        }
        let updated = Propagator::new(&aggregator).propagate(&mut working, target, coefficients)?;
        self.recompute_ancestor(&aggregator, &mut working, target)?;
        *tree = working;

        debug!("applied edit to {}: {} lines propagated", label, updated);
        Ok(EditOutcome::Applied {
            line: label,
            updated,
        })
    }

    /// Re-stamp top-level indices by position and recompute the whole document.
    #[instrument(level = "debug", skip_all)]
    pub fn recalculate_all_prices(&self, tree: &mut LineTree, policy: &ComputePolicy) -> ApplicationResult<()> {
        let aggregator = Aggregator::new(self.converter.as_ref(), *policy);
        let mut working = tree.clone();
        aggregator.recompute_all(&mut working)?;
        *tree = working;
        Ok(())
    }

    /// Flat persisted projection of `tree`.
    pub fn synchronize(&self, tree: &LineTree, mode: AggregationMode) -> Vec<LineData> {
        Flattener::new(mode).flatten(tree)
    }

    /// Drop persisted flat entries whose line was removed from `tree`.
    pub fn remove_detached_lines(&self, flat: Vec<LineData>, tree: &LineTree) -> Vec<LineData> {
        prune_detached(flat, tree)
    }

    /// Start index for a new line below the line indexed `parent_index`, or at top level.
    pub fn next_index(&self, tree: &LineTree, parent_index: Option<&str>) -> ApplicationResult<String> {
        let parent = match parent_index {
            Some(index) => Some(
                tree.iter()
                    .find(|(_, node)| node.data.index.as_deref() == Some(index))
                    .map(|(idx, _)| idx)
                    .ok_or_else(|| DomainError::NodeNotFound(format!("#{index}")))?,
            ),
            None => None,
        };
        Ok(start_index(tree, parent)?)
    }

    fn recompute_ancestor(&self, aggregator: &Aggregator<'_>, tree: &mut LineTree, target: Index) -> ApplicationResult<()> {
        let top = tree
            .top_level_ancestor(target)
            .ok_or_else(|| DomainError::NodeNotFound(format!("{target:?}")))?;
        let position = tree.position(top).unwrap_or(1);
        let line = tree
            .line_mut(top)
            .ok_or_else(|| DomainError::NodeNotFound(format!("{top:?}")))?;
        let prefix = line
            .index
            .get_or_insert_with(|| position.to_string())
            .clone();
        aggregator.recompute_subtree(tree, top, &prefix)?;
        Ok(())
    }
}
