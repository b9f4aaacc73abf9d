//! Projection of the line tree onto the flat persisted line list, and back.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use generational_arena::Index;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::arena::{LineNode, LineTree};
use crate::domain::line::{ClientId, LineData, LineId};

/// Which tree lines end up in the flat persisted list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationMode {
    /// Every line, in document order
    #[default]
    #[serde(alias = "all")]
    All,
    /// Lines without sub-lines
    #[serde(alias = "only_leaves")]
    OnlyLeaves,
    /// Top-level lines
    #[serde(alias = "only_top_level")]
    OnlyTopLevel,
}

impl AggregationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMode::All => "ALL",
            AggregationMode::OnlyLeaves => "ONLY_LEAVES",
            AggregationMode::OnlyTopLevel => "ONLY_TOP_LEVEL",
        }
    }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "ALL" => Ok(AggregationMode::All),
            "ONLY_LEAVES" => Ok(AggregationMode::OnlyLeaves),
            "ONLY_TOP_LEVEL" => Ok(AggregationMode::OnlyTopLevel),
            other => Err(format!("unknown aggregation mode: {other}")),
        }
    }
}

/// Builds the flat line list persisted alongside the tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flattener {
    mode: AggregationMode,
}

impl Flattener {
    pub fn new(mode: AggregationMode) -> Self {
        Self { mode }
    }

    /// Detached copies of the selected lines, each stamped with
    /// `parent_client_id` = its own client id.
    #[instrument(level = "debug", skip_all, fields(mode = %self.mode))]
    pub fn flatten(&self, tree: &LineTree) -> Vec<LineData> {
        let flat: Vec<LineData> = match self.mode {
            AggregationMode::All => tree.iter().map(detached).collect(),
            AggregationMode::OnlyLeaves => tree
                .leaves()
                .into_iter()
                .filter_map(|leaf| tree.get_node(leaf).map(|n| detached((leaf, n))))
                .collect(),
            AggregationMode::OnlyTopLevel => tree
                .roots()
                .iter()
                .filter_map(|&root| tree.get_node(root).map(|n| detached((root, n))))
                .collect(),
        };
        debug!("flattened {} of {} lines", flat.len(), tree.len());
        flat
    }
}

fn detached((_, node): (Index, &LineNode)) -> LineData {
    let mut line = node.data.clone();
    line.parent_client_id = line.client_id.clone();
    line
}

/// Drop flat entries that no longer stand for a line of `tree`.
///
/// An entry survives while its `parent_client_id` names a live client id or
/// its `id` names a live persisted line.
pub fn prune_detached(flat: Vec<LineData>, tree: &LineTree) -> Vec<LineData> {
    let live_cids: HashSet<&ClientId> = tree
        .iter()
        .filter_map(|(_, node)| node.data.client_id.as_ref())
        .collect();
    let live_ids: HashSet<LineId> = tree.iter().filter_map(|(_, node)| node.data.id).collect();

    let before = flat.len();
    let kept: Vec<LineData> = flat
        .into_iter()
        .filter(|line| {
            line.parent_client_id.as_ref().is_some_and(|cid| live_cids.contains(cid))
                || line.id.is_some_and(|id| live_ids.contains(&id))
        })
        .collect();
    debug!("pruned {} detached lines", before - kept.len());
    kept
}

/// Regroup a flat list into a tree by dotted index.
///
/// An entry whose index extends another entry's index (`"2.1"` below `"2"`)
/// becomes its sub-line; unindexed or orphaned entries become top-level lines.
#[instrument(level = "debug", skip_all, fields(lines = flat.len()))]
pub fn rebuild(flat: Vec<LineData>) -> LineTree {
    let mut entries = flat;
    // Stable, so siblings keep their relative order.
    entries.sort_by_key(|line| line.index.as_deref().map_or(1, |i| i.split('.').count()));

    let mut tree = LineTree::new();
    let mut by_index: HashMap<String, Index> = HashMap::new();
    for mut line in entries {
        line.parent_client_id = None;
        let parent = line
            .index
            .as_deref()
            .and_then(|i| i.rsplit_once('.'))
            .and_then(|(prefix, _)| by_index.get(prefix).copied());
        let index = line.index.clone();
        let idx = tree.insert_node(line, parent);
        if let Some(index) = index {
            by_index.entry(index).or_insert(idx);
        }
    }
    tree
}
