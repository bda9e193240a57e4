//! Conversion between [`WbsTree`] and its persisted record form.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::aggregate::recompute_durations;
use crate::domain::arena::WbsTree;
use crate::domain::entities::{NodeData, NodeId, Rgb};
use crate::domain::error::{DomainError, DomainResult};

pub const FORMAT_VERSION: u32 = 1;

/// Top-level persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFile {
    pub version: u32,
    pub root: NodeRecord,
}

/// One persisted work item with its nested children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub notes1: String,
    #[serde(default)]
    pub notes2: String,
    #[serde(default)]
    pub color: Rgb,
    #[serde(default)]
    pub predecessors: Vec<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    fn data(&self) -> NodeData {
        NodeData {
            name: self.name.clone(),
            duration: self.duration,
            resource: self.resource.clone(),
            notes1: self.notes1.clone(),
            notes2: self.notes2.clone(),
            color: self.color,
        }
    }
}

impl DocumentFile {
    /// Snapshot of `tree`. Dangling predecessor ids are pruned from the tree
    /// first, so they never reach the file.
    #[instrument(level = "debug", skip(tree))]
    pub fn from_tree(tree: &mut WbsTree) -> Self {
        let ids: Vec<NodeId> = tree.all_nodes().map(|(id, _)| id).collect();
        let pruned: usize = ids.iter().map(|&id| tree.prune_predecessors(id)).sum();
        if pruned > 0 {
            debug!("pruned {} dangling predecessor ids", pruned);
        }
        Self {
            version: FORMAT_VERSION,
            root: record_of(tree, tree.root()),
        }
    }

    /// Rebuilds a clean tree: fresh numbering, every node expanded,
    /// aggregates recomputed from the leaves.
    ///
    /// Fails on duplicate ids or negative/non-finite durations; no partial
    /// tree is ever returned.
    #[instrument(level = "debug", skip(self))]
    pub fn into_tree(self) -> DomainResult<WbsTree> {
        validate_duration(&self.root)?;
        let mut tree = WbsTree::with_root(self.root.id, self.root.data());
        let mut stack: Vec<(NodeId, NodeRecord)> = Vec::new();
        let mut links: Vec<(NodeId, Vec<NodeId>)> =
            vec![(self.root.id, self.root.predecessors.clone())];
        for child in self.root.children.into_iter().rev() {
            stack.push((self.root.id, child));
        }

        while let Some((parent, record)) = stack.pop() {
            validate_duration(&record)?;
            tree.insert_with_id(record.id, record.data(), parent)?;
            links.push((record.id, record.predecessors.clone()));
            let id = record.id;
            for child in record.children.into_iter().rev() {
                stack.push((id, child));
            }
        }

        for (id, predecessors) in links {
            tree.replace_predecessors(id, predecessors.into_iter().collect())?;
            tree.prune_predecessors(id);
        }
        recompute_durations(&mut tree);
        tree.renumber();
        tree.clear_modified();
        debug!("loaded {} nodes", tree.len());
        Ok(tree)
    }
}

fn validate_duration(record: &NodeRecord) -> DomainResult<()> {
    if record.duration.is_finite() && record.duration >= 0.0 {
        Ok(())
    } else {
        Err(DomainError::InvalidDuration {
            node: record.id,
            value: record.duration,
        })
    }
}

/// Persisted duration is the effective one: leaf value or roll-up.
fn record_of(tree: &WbsTree, id: NodeId) -> NodeRecord {
    let Some(node) = tree.find_by_id(id) else {
        return NodeRecord {
            id,
            name: String::new(),
            duration: 0.0,
            resource: String::new(),
            notes1: String::new(),
            notes2: String::new(),
            color: Rgb::WHITE,
            predecessors: Vec::new(),
            children: Vec::new(),
        };
    };
    NodeRecord {
        id,
        name: node.data.name.clone(),
        duration: node.duration(),
        resource: node.data.resource.clone(),
        notes1: node.data.notes1.clone(),
        notes2: node.data.notes2.clone(),
        color: node.data.color,
        predecessors: node.predecessors().iter().copied().collect(),
        children: node
            .children()
            .iter()
            .map(|&child| record_of(tree, child))
            .collect(),
    }
}
