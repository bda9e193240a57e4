//! Predecessor text: comma-separated display ordinals.
//!
//! Predecessors are stored as stable ids but shown and edited as the
//! current short names, so both directions need a fresh numbering.

use std::collections::BTreeSet;

use itertools::Itertools;
use thiserror::Error;

use crate::domain::arena::WbsTree;
use crate::domain::entities::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredecessorError {
    #[error("not a number: {0:?}")]
    NotANumber(String),

    #[error("no item with number {0}")]
    UnknownOrdinal(usize),

    #[error("item {0} lies inside the subtree of the edited item")]
    InsideOwnSubtree(usize),
}

/// Splits `"1, 2"` into ordinals. Empty text means no predecessors.
pub fn parse_predecessor_text(text: &str) -> Result<Vec<usize>, PredecessorError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split(',')
        .map(str::trim)
        .map(|token| {
            token
                .parse::<usize>()
                .map_err(|_| PredecessorError::NotANumber(token.to_string()))
        })
        .collect()
}

/// Maps ordinals to ids for `node`, rejecting unknown numbers and members
/// of the node's own subtree. Requires a current numbering.
pub fn resolve_ordinals(
    tree: &WbsTree,
    node: NodeId,
    ordinals: &[usize],
) -> Result<BTreeSet<NodeId>, PredecessorError> {
    ordinals
        .iter()
        .map(|&ordinal| {
            let target = tree
                .find_by_ordinal(ordinal)
                .ok_or(PredecessorError::UnknownOrdinal(ordinal))?;
            if target == node || tree.is_ancestor(node, target) {
                return Err(PredecessorError::InsideOwnSubtree(ordinal));
            }
            Ok(target)
        })
        .collect()
}

/// Comma-joined ordinals of the live predecessors, in ordinal order.
/// Dangling ids are skipped. Empty when the numbering is stale.
pub fn render_predecessors(tree: &WbsTree, node: NodeId) -> String {
    tree.live_predecessors(node)
        .into_iter()
        .filter_map(|p| tree.display_ordinal(p))
        .sorted()
        .join(", ")
}
