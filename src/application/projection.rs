//! Flattened view of a document: visible rows, selection and scroll offset.
//!
//! Rows are node ids in DFS pre-order, skipping the descendants of collapsed
//! nodes. The projection never mutates document content; the only tree state
//! it touches is the non-persistent expansion flag and the display numbering.

use std::collections::HashMap;

use tracing::{debug, instrument, trace};

use crate::domain::{
    person_duration, render_predecessors, resource_status, DomainResult, FieldStatus, NodeId,
    PersonDuration, Rgb, WbsTree,
};

/// Column headers shared by the table view and the exporters.
pub const COLUMNS: [&str; 8] = [
    "ID",
    "Item Name",
    "Duration",
    "Person Duration",
    "Resource",
    "Predecessors",
    "Notes1",
    "Notes2",
];

/// Everything a renderer needs for one row, as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDescriptor {
    pub id: NodeId,
    /// Short name; `None` only when rendered against a stale numbering
    pub ordinal: Option<usize>,
    pub level: usize,
    /// The root row, rendered as the table header
    pub is_header: bool,
    pub is_leaf: bool,
    pub expanded: bool,
    pub name: String,
    pub duration: f64,
    pub person_duration: PersonDuration,
    pub resource: String,
    pub resource_status: FieldStatus,
    pub predecessors: String,
    pub predecessors_status: FieldStatus,
    pub notes1: String,
    pub notes2: String,
    pub color: Rgb,
}

/// Pure row rendering; `None` for unknown ids.
pub fn render_row(tree: &WbsTree, id: NodeId) -> Option<RowDescriptor> {
    let node = tree.find_by_id(id)?;
    Some(RowDescriptor {
        id,
        ordinal: tree.display_ordinal(id),
        level: tree.level(id),
        is_header: id == tree.root(),
        is_leaf: node.is_leaf(),
        expanded: node.is_expanded(),
        name: node.data.name.clone(),
        duration: node.duration(),
        person_duration: person_duration(tree, id),
        resource: node.data.resource.clone(),
        resource_status: resource_status(&node.data.resource),
        predecessors: render_predecessors(tree, id),
        predecessors_status: FieldStatus::Valid,
        notes1: node.data.notes1.clone(),
        notes2: node.data.notes2.clone(),
        color: node.data.color,
    })
}

/// Visible nodes in DFS pre-order starting at `start` (inclusive).
pub fn visible_rows(tree: &WbsTree, start: NodeId) -> Vec<NodeId> {
    let mut rows = Vec::new();
    let mut stack = vec![start];
    while let Some(current) = stack.pop() {
        let Some(node) = tree.find_by_id(current) else {
            continue;
        };
        rows.push(current);
        if node.is_expanded() {
            for &child in node.children().iter().rev() {
                stack.push(child);
            }
        }
    }
    rows
}

/// A node is visible iff all of its strict ancestors are expanded.
pub fn is_visible(tree: &WbsTree, id: NodeId) -> bool {
    tree.contains(id)
        && tree
            .ancestors(id)
            .all(|a| tree.find_by_id(a).is_some_and(|n| n.is_expanded()))
}

/// Modifier keys held during a row click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickModifiers {
    pub ctrl: bool,
    pub shift: bool,
}

impl ClickModifiers {
    pub const PLAIN: ClickModifiers = ClickModifiers {
        ctrl: false,
        shift: false,
    };
    pub const CTRL: ClickModifiers = ClickModifiers {
        ctrl: true,
        shift: false,
    };
    pub const SHIFT: ClickModifiers = ClickModifiers {
        ctrl: false,
        shift: true,
    };
}

#[derive(Debug, Clone, Default)]
pub struct Projection {
    rows: Vec<NodeId>,
    /// Insertion ordered; the last element is the shift-click anchor
    selection: Vec<NodeId>,
    scroll_offset: usize,
    /// Predecessor text that failed to resolve, shown flagged until fixed
    rejected_predecessors: HashMap<NodeId, String>,
}

impl Projection {
    pub fn new(tree: &mut WbsTree) -> Self {
        let mut projection = Self::default();
        projection.refresh(tree);
        projection
    }

    /// Renumbers, prunes dangling predecessors and re-flattens the tree.
    /// Selected nodes that no longer exist or are hidden are deselected.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn refresh(&mut self, tree: &mut WbsTree) {
        tree.renumber();
        let ids: Vec<NodeId> = tree.all_nodes().map(|(id, _)| id).collect();
        let pruned: usize = ids.iter().map(|&id| tree.prune_predecessors(id)).sum();
        if pruned > 0 {
            debug!("pruned {} dangling predecessor ids", pruned);
        }
        self.rows = visible_rows(tree, tree.root());
        let rows = &self.rows;
        self.selection.retain(|id| rows.contains(id));
        self.rejected_predecessors.retain(|id, _| tree.contains(*id));
        self.scroll_offset = self.clamp_offset(self.scroll_offset);
        trace!("{} visible rows", self.rows.len());
    }

    pub fn rows(&self) -> &[NodeId] {
        &self.rows
    }

    pub fn row_index(&self, id: NodeId) -> Option<usize> {
        self.rows.iter().position(|&r| r == id)
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        self.row_index(id).is_some()
    }

    /// Row data with any pending predecessor-text rejection applied.
    pub fn row(&self, tree: &WbsTree, id: NodeId) -> Option<RowDescriptor> {
        let mut row = render_row(tree, id)?;
        if let Some(text) = self.rejected_predecessors.get(&id) {
            row.predecessors = text.clone();
            row.predecessors_status = FieldStatus::Invalid;
        }
        Some(row)
    }

    /// All visible rows rendered.
    pub fn render(&self, tree: &WbsTree) -> Vec<RowDescriptor> {
        self.rows.iter().filter_map(|&id| self.row(tree, id)).collect()
    }

    pub fn flag_predecessors(&mut self, id: NodeId, text: impl Into<String>) {
        self.rejected_predecessors.insert(id, text.into());
    }

    pub fn clear_predecessor_flag(&mut self, id: NodeId) {
        self.rejected_predecessors.remove(&id);
    }

    /// Flips the expansion flag and splices only the affected row run.
    /// Returns the new expansion state.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn toggle_expanded(&mut self, tree: &mut WbsTree, id: NodeId) -> DomainResult<bool> {
        let expanded = !tree.node(id)?.is_expanded();
        tree.set_expanded_flag(id, expanded)?;

        let Some(at) = self.row_index(id) else {
            return Ok(expanded);
        };
        if expanded {
            let run: Vec<NodeId> = visible_rows(tree, id).into_iter().skip(1).collect();
            self.rows.splice(at + 1..at + 1, run);
        } else {
            let end = self.rows[at + 1..]
                .iter()
                .position(|&r| !tree.is_ancestor(id, r))
                .map_or(self.rows.len(), |offset| at + 1 + offset);
            let hidden: Vec<NodeId> = self.rows.drain(at + 1..end).collect();
            self.selection.retain(|s| !hidden.contains(s));
        }
        self.scroll_offset = self.clamp_offset(self.scroll_offset);
        Ok(expanded)
    }

    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(&id)
    }

    /// The sole selected node, if exactly one is selected.
    pub fn single_selection(&self) -> Option<NodeId> {
        match self.selection.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn select_only(&mut self, id: NodeId) {
        self.selection.clear();
        if self.is_visible(id) {
            self.selection.push(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Applies click semantics; clicks on rows that are not visible are ignored.
    #[instrument(level = "trace", skip(self))]
    pub fn click(&mut self, id: NodeId, modifiers: ClickModifiers) {
        let Some(target) = self.row_index(id) else {
            return;
        };
        if modifiers.ctrl {
            match self.selection.iter().position(|&s| s == id) {
                Some(pos) => {
                    self.selection.remove(pos);
                }
                None => self.selection.push(id),
            }
        } else if modifiers.shift {
            let anchor = self.selection.last().and_then(|&a| self.row_index(a));
            match anchor {
                None => self.select_only(id),
                Some(anchor) => {
                    let run: Vec<NodeId> = if anchor <= target {
                        self.rows[anchor..=target].to_vec()
                    } else {
                        self.rows[target..=anchor].iter().rev().copied().collect()
                    };
                    for row in run {
                        if !self.selection.contains(&row) {
                            self.selection.push(row);
                        }
                    }
                    // the clicked row anchors the next shift-click
                    self.selection.retain(|&s| s != id);
                    self.selection.push(id);
                }
            }
        } else {
            self.select_only(id);
        }
    }

    /// Seeds an empty selection with `id`; returns the context-menu target,
    /// which exists only when exactly one node is selected.
    pub fn right_click(&mut self, id: NodeId) -> Option<NodeId> {
        if self.selection.is_empty() {
            self.select_only(id);
        }
        self.single_selection()
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn set_scroll_offset(&mut self, offset: usize) {
        self.scroll_offset = self.clamp_offset(offset);
    }

    fn clamp_offset(&self, offset: usize) -> usize {
        offset.min(self.rows.len().saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EditEngine, NodeData};

    fn three_leaves() -> (WbsTree, Vec<NodeId>) {
        let mut tree = WbsTree::new("R");
        let engine = EditEngine::default();
        let root = tree.root();
        let ids = ["A", "B", "C"]
            .iter()
            .map(|n| engine.add_child(&mut tree, root, NodeData::named(*n)).unwrap())
            .collect();
        (tree, ids)
    }

    #[test]
    fn given_selection_when_shift_clicking_backwards_then_range_added() {
        let (mut tree, ids) = three_leaves();
        let mut projection = Projection::new(&mut tree);
        projection.click(ids[2], ClickModifiers::PLAIN);
        projection.click(ids[0], ClickModifiers::SHIFT);
        assert_eq!(projection.selection(), &[ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn given_large_offset_when_setting_scroll_then_clamped_to_last_row() {
        let (mut tree, _) = three_leaves();
        let mut projection = Projection::new(&mut tree);
        projection.set_scroll_offset(100);
        assert_eq!(projection.scroll_offset(), 3);
    }
}
