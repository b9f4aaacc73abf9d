//! Finds the single edited line of a payload and materialises it.

use tracing::{debug, instrument, warn};

use crate::application::payload::{EditPayload, EditedLine};
use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::{LineData, LineSubtree};
use crate::infrastructure::traits::LineRepository;

/// The edited line, materialised for splicing into the live tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DirtyLine {
    pub line: LineData,
    /// Sub-lines replacing the live ones; `None` keeps the live sub-lines
    pub children: Option<Vec<LineSubtree>>,
}

/// Depth-first search for the edited line; parents are visited before their
/// sub-lines and the first match wins.
pub struct DirtyLineLocator<'a> {
    repository: &'a dyn LineRepository,
}

impl<'a> DirtyLineLocator<'a> {
    pub fn new(repository: &'a dyn LineRepository) -> Self {
        Self { repository }
    }

    /// First edited line in document order, if any.
    pub fn find<'p>(&self, payload: &'p [EditPayload]) -> Option<&'p EditedLine> {
        let mut stack: Vec<&EditPayload> = payload.iter().rev().collect();
        while let Some(current) = stack.pop() {
            if let EditPayload::Edited(edited) = current {
                return Some(edited);
            }
            if let Some(children) = current.children() {
                stack.extend(children.iter().rev());
            }
        }
        None
    }

    /// The edited line, or `None` when nothing is flagged.
    #[instrument(level = "debug", skip_all)]
    pub fn locate(&self, payload: &[EditPayload]) -> ApplicationResult<Option<DirtyLine>> {
        match self.find(payload) {
            Some(edited) => self.materialize(edited).map(Some),
            None => {
                debug!("no changed line in payload");
                Ok(None)
            }
        }
    }

    /// Apply the baseline snapshot and resolve sub-lines that were not sent.
    pub fn materialize(&self, edited: &EditedLine) -> ApplicationResult<DirtyLine> {
        let mut line = edited.current.clone();
        if let Some(baseline) = &edited.baseline {
            line.quantity_before_update = baseline.quantity;
            line.price_before_update = baseline.price;
        }

        let children = match (&edited.children, line.id) {
            (Some(children), _) => Some(children.iter().map(to_subtree).collect()),
            (None, Some(id)) => match self
                .repository
                .find_by_id(id)
                .with_repository_context(&format!("load sub-lines of line {id}"))?
            {
                Some(persisted) => Some(persisted.children),
                None => {
                    warn!("persisted line {} not found, keeping its live sub-lines", id);
                    None
                }
            },
            (None, None) => None,
        };

        match &children {
            Some(children) => debug!("dirty line {} with {} sub-lines", line.label(), children.len()),
            None => debug!("dirty line {} keeps its live sub-lines", line.label()),
        }
        Ok(DirtyLine { line, children })
    }
}

fn to_subtree(payload: &EditPayload) -> LineSubtree {
    let children = payload
        .children()
        .map(|children| children.iter().map(to_subtree).collect())
        .unwrap_or_default();
    LineSubtree::with_children(payload.current().clone(), children)
}
