//! Arena-backed WBS document tree.
//!
//! Nodes live in a generational arena and reference each other by [`NodeId`]
//! only; the parent link is an id, never an owning pointer. The tree always
//! has exactly one root, created together with the tree.

use std::collections::{BTreeSet, HashMap};

use generational_arena::{Arena, Index};
use tracing::{instrument, trace};

use crate::domain::entities::{NodeData, NodeId};
use crate::domain::error::{DomainError, DomainResult};

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct TreeNode {
    id: NodeId,
    /// Scalar payload (name, leaf duration, resource, notes, color)
    pub data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) predecessors: BTreeSet<NodeId>,
    pub(crate) aggregate: f64,
    pub(crate) expanded: bool,
    ordinal: usize,
}

impl TreeNode {
    fn new(id: NodeId, data: NodeData, parent: Option<NodeId>) -> Self {
        let aggregate = data.duration;
        Self {
            id,
            data,
            parent,
            children: Vec::new(),
            predecessors: BTreeSet::new(),
            aggregate,
            expanded: true,
            ordinal: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Raw predecessor ids; may contain ids of deleted nodes until pruned.
    pub fn predecessors(&self) -> &BTreeSet<NodeId> {
        &self.predecessors
    }

    /// Effective duration: the leaf value at leaves, the roll-up otherwise.
    pub fn duration(&self) -> f64 {
        self.aggregate
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }
}

/// A WBS document: arena storage for all nodes plus identity bookkeeping.
#[derive(Debug, Clone)]
pub struct WbsTree {
    arena: Arena<TreeNode>,
    index: HashMap<NodeId, Index>,
    root: NodeId,
    next_id: u64,
    /// ordinal -> node, present only right after a renumbering pass
    numbering: Option<Vec<NodeId>>,
    modified: bool,
}

impl WbsTree {
    /// Creates a document with a single root node. New documents start dirty.
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut tree = Self::with_root(NodeId::new(1), NodeData::named(root_name));
        tree.modified = true;
        tree
    }

    /// Creates a clean document whose root carries an explicit id (import).
    pub(crate) fn with_root(root_id: NodeId, data: NodeData) -> Self {
        let mut arena = Arena::new();
        let idx = arena.insert(TreeNode::new(root_id, data, None));
        let mut index = HashMap::new();
        index.insert(root_id, idx);
        Self {
            arena,
            index,
            root: root_id,
            next_id: root_id.get() + 1,
            numbering: None,
            modified: false,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Looks up a node; unknown ids yield `None`.
    pub fn find_by_id(&self, id: NodeId) -> Option<&TreeNode> {
        self.index.get(&id).and_then(|&idx| self.arena.get(idx))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub(crate) fn node(&self, id: NodeId) -> DomainResult<&TreeNode> {
        self.find_by_id(id).ok_or(DomainError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> DomainResult<&mut TreeNode> {
        match self.index.get(&id) {
            Some(&idx) => self.arena.get_mut(idx).ok_or(DomainError::NodeNotFound(id)),
            None => Err(DomainError::NodeNotFound(id)),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.find_by_id(id).and_then(|n| n.parent)
    }

    pub fn has_parent(&self, id: NodeId) -> bool {
        self.parent(id).is_some()
    }

    /// Ordered children; empty for leaves and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.find_by_id(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.children(id).is_empty()
    }

    /// Position of the node within its parent's children.
    pub fn sibling_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Number of ancestors: 0 for the root.
    pub fn level(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// True when `ancestor` lies strictly above `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whole tree in DFS pre-order, children left to right.
    #[instrument(level = "trace", skip(self))]
    pub fn all_nodes(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.root)
    }

    /// Subtree rooted at `id` (inclusive) in DFS pre-order.
    pub fn branch(&self, id: NodeId) -> TreeIterator<'_> {
        TreeIterator::new(self, id)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, self.root)
    }

    /// Number of levels in the tree; a lone root has depth 1.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.calculate_depth(self.root)
    }

    fn calculate_depth(&self, id: NodeId) -> usize {
        1 + self
            .children(id)
            .iter()
            .map(|&child| self.calculate_depth(child))
            .max()
            .unwrap_or(0)
    }

    /// Assigns display ordinals in DFS pre-order; the root gets 0.
    #[instrument(level = "debug", skip(self))]
    pub fn renumber(&mut self) {
        let order: Vec<NodeId> = self.all_nodes().map(|(id, _)| id).collect();
        for (ordinal, &id) in order.iter().enumerate() {
            if let Ok(node) = self.node_mut(id) {
                node.ordinal = ordinal;
            }
        }
        trace!("renumbered {} nodes", order.len());
        self.numbering = Some(order);
    }

    pub fn is_numbered(&self) -> bool {
        self.numbering.is_some()
    }

    /// Current short name of a node, `None` when numbering is stale.
    pub fn display_ordinal(&self, id: NodeId) -> Option<usize> {
        self.numbering.as_ref()?;
        self.find_by_id(id).map(|n| n.ordinal)
    }

    /// Resolves a short name, `None` when numbering is stale or out of range.
    pub fn find_by_ordinal(&self, ordinal: usize) -> Option<NodeId> {
        self.numbering.as_ref()?.get(ordinal).copied()
    }

    pub(crate) fn invalidate_numbering(&mut self) {
        self.numbering = None;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Called after a successful save.
    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    pub(crate) fn alloc_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends a fresh-id node under `parent`.
    #[instrument(level = "trace", skip(self, data))]
    pub(crate) fn insert_node(&mut self, data: NodeData, parent: NodeId) -> DomainResult<NodeId> {
        self.node(parent)?;
        let id = self.alloc_id();
        self.insert_raw(id, data, parent, None);
        Ok(id)
    }

    /// Inserts a node carrying an imported id; ids must stay unique.
    pub(crate) fn insert_with_id(
        &mut self,
        id: NodeId,
        data: NodeData,
        parent: NodeId,
    ) -> DomainResult<()> {
        if self.contains(id) {
            return Err(DomainError::DuplicateId(id));
        }
        self.node(parent)?;
        self.insert_raw(id, data, parent, None);
        self.next_id = self.next_id.max(id.get() + 1);
        Ok(())
    }

    fn insert_raw(&mut self, id: NodeId, data: NodeData, parent: NodeId, position: Option<usize>) {
        let idx = self.arena.insert(TreeNode::new(id, data, Some(parent)));
        self.index.insert(id, idx);
        self.link(id, parent, position);
    }

    /// Adds `id` to `parent`'s children at `position` (end when `None`).
    fn link(&mut self, id: NodeId, parent: NodeId, position: Option<usize>) {
        if let Ok(p) = self.node_mut(parent) {
            let at = position.unwrap_or(p.children.len()).min(p.children.len());
            p.children.insert(at, id);
        }
        if let Ok(n) = self.node_mut(id) {
            n.parent = Some(parent);
        }
        self.invalidate_numbering();
    }

    /// Removes `id` from its parent's children; returns the former position.
    pub(crate) fn detach(&mut self, id: NodeId) -> DomainResult<Option<usize>> {
        let parent = self.node(id)?.parent;
        let mut position = None;
        if let Some(parent) = parent {
            let p = self.node_mut(parent)?;
            position = p.children.iter().position(|&c| c == id);
            p.children.retain(|&c| c != id);
        }
        self.node_mut(id)?.parent = None;
        self.invalidate_numbering();
        Ok(position)
    }

    /// Re-links a detached node under `parent` at `position`.
    pub(crate) fn attach(
        &mut self,
        id: NodeId,
        parent: NodeId,
        position: Option<usize>,
    ) -> DomainResult<()> {
        self.node(id)?;
        self.node(parent)?;
        self.link(id, parent, position);
        Ok(())
    }

    /// Drops a detached subtree from the arena; returns the removed ids.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) -> DomainResult<Vec<NodeId>> {
        let removed: Vec<NodeId> = self.branch(id).map(|(n, _)| n).collect();
        if removed.is_empty() {
            return Err(DomainError::NodeNotFound(id));
        }
        self.detach(id)?;
        for n in &removed {
            if let Some(idx) = self.index.remove(n) {
                self.arena.remove(idx);
            }
        }
        Ok(removed)
    }

    pub(crate) fn swap_children(&mut self, parent: NodeId, a: usize, b: usize) -> DomainResult<()> {
        let p = self.node_mut(parent)?;
        if a < p.children.len() && b < p.children.len() {
            p.children.swap(a, b);
        }
        self.invalidate_numbering();
        Ok(())
    }

    /// Stores a roll-up. Inner nodes keep it as their own duration so a node
    /// that loses its children keeps the last sum.
    pub(crate) fn set_aggregate(&mut self, id: NodeId, value: f64) {
        if let Ok(n) = self.node_mut(id) {
            n.aggregate = value;
            n.data.duration = value;
        }
    }

    pub(crate) fn set_expanded_flag(&mut self, id: NodeId, expanded: bool) -> DomainResult<()> {
        self.node_mut(id)?.expanded = expanded;
        Ok(())
    }

    /// Predecessors that still exist, in id order.
    pub fn live_predecessors(&self, id: NodeId) -> Vec<NodeId> {
        self.find_by_id(id)
            .map(|n| {
                n.predecessors
                    .iter()
                    .copied()
                    .filter(|p| self.contains(*p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Removes dangling predecessor ids from a node; returns how many.
    pub(crate) fn prune_predecessors(&mut self, id: NodeId) -> usize {
        let live: BTreeSet<NodeId> = self.live_predecessors(id).into_iter().collect();
        match self.node_mut(id) {
            Ok(node) => {
                let pruned = node.predecessors.len() - live.len();
                node.predecessors = live;
                pruned
            }
            Err(_) => 0,
        }
    }

    pub(crate) fn replace_predecessors(
        &mut self,
        id: NodeId,
        predecessors: BTreeSet<NodeId>,
    ) -> DomainResult<()> {
        self.node_mut(id)?.predecessors = predecessors;
        Ok(())
    }
}

/// Walks parent links upwards.
pub struct Ancestors<'a> {
    tree: &'a WbsTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

pub struct TreeIterator<'a> {
    tree: &'a WbsTree,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a WbsTree, start: NodeId) -> Self {
        let mut stack = Vec::new();
        if tree.contains(start) {
            stack.push(start);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.find_by_id(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a WbsTree,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a WbsTree, start: NodeId) -> Self {
        let mut stack = Vec::new();
        if tree.contains(start) {
            stack.push((start, false));
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (NodeId, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.find_by_id(current) {
                if !visited {
                    self.stack.push((current, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current, node));
                }
            }
        }
        None
    }
}
