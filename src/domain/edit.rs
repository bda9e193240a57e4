//! Structural and field edits on a [`WbsTree`].
//!
//! The engine holds no document state. Every successful mutation marks the
//! tree dirty and is reported synchronously to the subscribed observers.
//! Precondition failures (root has no siblings, last sibling cannot shift in)
//! are no-ops reported as `false`/`None`, not errors.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use tracing::{debug, instrument};

use crate::domain::aggregate::{recompute_durations, resource_status, set_leaf_duration};
use crate::domain::arena::WbsTree;
use crate::domain::entities::{FieldStatus, NodeData, NodeId, Rgb};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::predecessors::{parse_predecessor_text, resolve_ordinals};

/// Structural operations offered per node (context menu and `wbsed edit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditOp {
    AddChild,
    AddSibling,
    Duplicate,
    DeepDuplicate,
    ShiftBackward,
    ShiftForward,
    BringToBack,
    BringToFront,
    ShiftOut,
    ShiftIn,
    Breakout,
    DeleteNode,
    DeleteSubtree,
    DeleteDescendants,
}

impl EditOp {
    pub const ALL: [EditOp; 14] = [
        EditOp::AddChild,
        EditOp::AddSibling,
        EditOp::Duplicate,
        EditOp::DeepDuplicate,
        EditOp::ShiftBackward,
        EditOp::ShiftForward,
        EditOp::BringToBack,
        EditOp::BringToFront,
        EditOp::ShiftOut,
        EditOp::ShiftIn,
        EditOp::Breakout,
        EditOp::DeleteNode,
        EditOp::DeleteSubtree,
        EditOp::DeleteDescendants,
    ];

    /// Command-line name, kebab case.
    pub fn name(self) -> &'static str {
        match self {
            EditOp::AddChild => "add-child",
            EditOp::AddSibling => "add-sibling",
            EditOp::Duplicate => "duplicate",
            EditOp::DeepDuplicate => "deep-duplicate",
            EditOp::ShiftBackward => "shift-backward",
            EditOp::ShiftForward => "shift-forward",
            EditOp::BringToBack => "bring-to-back",
            EditOp::BringToFront => "bring-to-front",
            EditOp::ShiftOut => "shift-out",
            EditOp::ShiftIn => "shift-in",
            EditOp::Breakout => "breakout",
            EditOp::DeleteNode => "delete-node",
            EditOp::DeleteSubtree => "delete-subtree",
            EditOp::DeleteDescendants => "delete-descendants",
        }
    }

    /// Menu label.
    pub fn label(self) -> &'static str {
        match self {
            EditOp::AddChild => "Add Child",
            EditOp::AddSibling => "Add Sibling",
            EditOp::Duplicate => "Duplicate",
            EditOp::DeepDuplicate => "Deep Duplicate",
            EditOp::ShiftBackward => "Shift Up",
            EditOp::ShiftForward => "Shift Down",
            EditOp::BringToBack => "Bring to Top",
            EditOp::BringToFront => "Bring to Bottom",
            EditOp::ShiftOut => "Shift Out",
            EditOp::ShiftIn => "Shift In",
            EditOp::Breakout => "Breakout",
            EditOp::DeleteNode => "Delete Node",
            EditOp::DeleteSubtree => "Delete Subtree",
            EditOp::DeleteDescendants => "Delete Descendants",
        }
    }

    /// Operations that need a yes/no/cancel confirmation first.
    pub fn is_destructive(self) -> bool {
        matches!(self, EditOp::DeleteSubtree | EditOp::DeleteDescendants)
    }
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EditOp {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        EditOp::ALL
            .into_iter()
            .find(|op| op.name() == wanted)
            .ok_or_else(|| DomainError::UnknownOperation(s.to_string()))
    }
}

/// Editable scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Duration,
    Resource,
    Notes1,
    Notes2,
    Color,
    Predecessors,
}

/// A single field assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    Name(String),
    Duration(f64),
    Resource(String),
    Notes1(String),
    Notes2(String),
    Color(Rgb),
    SiblingGroupColor(Rgb),
    Predecessors(String),
}

impl FieldEdit {
    pub fn field(&self) -> Field {
        match self {
            FieldEdit::Name(_) => Field::Name,
            FieldEdit::Duration(_) => Field::Duration,
            FieldEdit::Resource(_) => Field::Resource,
            FieldEdit::Notes1(_) => Field::Notes1,
            FieldEdit::Notes2(_) => Field::Notes2,
            FieldEdit::Color(_) | FieldEdit::SiblingGroupColor(_) => Field::Color,
            FieldEdit::Predecessors(_) => Field::Predecessors,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Structure(EditOp),
    Reparent,
    Field(Field),
}

/// Emitted after every successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditEvent {
    pub kind: EditKind,
    /// Node the edit was invoked on
    pub node: NodeId,
    /// Node to select afterwards (new node for inserts, parent for deletes)
    pub focus: NodeId,
}

pub trait EditObserver {
    fn on_edit(&self, event: &EditEvent);
}

impl<F: Fn(&EditEvent)> EditObserver for F {
    fn on_edit(&self, event: &EditEvent) {
        self(event)
    }
}

pub struct EditEngine {
    new_node_name: String,
    observers: Vec<Box<dyn EditObserver>>,
}

impl fmt::Debug for EditEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditEngine")
            .field("new_node_name", &self.new_node_name)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for EditEngine {
    fn default() -> Self {
        Self::new("New Node")
    }
}

impl EditEngine {
    /// `new_node_name` names the nodes created by add-child/add-sibling.
    pub fn new(new_node_name: impl Into<String>) -> Self {
        Self {
            new_node_name: new_node_name.into(),
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl EditObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&self, event: EditEvent) {
        for observer in &self.observers {
            observer.on_edit(&event);
        }
    }

    fn finish(&self, tree: &mut WbsTree, kind: EditKind, node: NodeId, focus: NodeId) {
        if matches!(kind, EditKind::Structure(_) | EditKind::Reparent) {
            recompute_durations(tree);
        }
        tree.mark_modified();
        debug!(?kind, %node, %focus, "edit applied");
        self.notify(EditEvent { kind, node, focus });
    }

    /// Whether `op` would change anything when applied to `id`.
    pub fn is_enabled(&self, tree: &WbsTree, op: EditOp, id: NodeId) -> bool {
        if !tree.contains(id) {
            return false;
        }
        let parent = tree.parent(id);
        let index = tree.sibling_index(id).unwrap_or(0);
        let siblings = parent.map(|p| tree.children(p).len()).unwrap_or(1);
        match op {
            EditOp::AddChild => true,
            EditOp::AddSibling
            | EditOp::Duplicate
            | EditOp::DeepDuplicate
            | EditOp::DeleteNode
            | EditOp::DeleteSubtree => parent.is_some(),
            EditOp::ShiftBackward | EditOp::BringToBack => parent.is_some() && index > 0,
            EditOp::ShiftForward | EditOp::BringToFront | EditOp::ShiftIn => {
                parent.is_some() && index + 1 < siblings
            }
            EditOp::ShiftOut | EditOp::Breakout => parent.is_some_and(|p| tree.has_parent(p)),
            EditOp::DeleteDescendants => !tree.is_leaf(id),
        }
    }

    /// Runs `op` on `id`; returns the node to select afterwards, `None` when
    /// the preconditions did not hold and nothing changed.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn apply(&self, tree: &mut WbsTree, op: EditOp, id: NodeId) -> DomainResult<Option<NodeId>> {
        tree.node(id)?;
        let keep = |changed: bool| changed.then_some(id);
        match op {
            EditOp::AddChild => self
                .add_child(tree, id, NodeData::named(self.new_node_name.as_str()))
                .map(Some),
            EditOp::AddSibling => {
                self.add_sibling(tree, id, NodeData::named(self.new_node_name.as_str()))
            }
            EditOp::Duplicate => self.copy(tree, id),
            EditOp::DeepDuplicate => match tree.parent(id) {
                Some(parent) => self.deep_copy(tree, id, parent).map(Some),
                None => Ok(None),
            },
            EditOp::ShiftBackward => self.shift_backward(tree, id).map(keep),
            EditOp::ShiftForward => self.shift_forward(tree, id).map(keep),
            EditOp::BringToBack => self.bring_to_back(tree, id).map(keep),
            EditOp::BringToFront => self.bring_to_front(tree, id).map(keep),
            EditOp::ShiftOut => self.shift_out(tree, id).map(keep),
            EditOp::ShiftIn => self.shift_in(tree, id).map(keep),
            EditOp::Breakout => self.breakout(tree, id).map(keep),
            EditOp::DeleteNode => self.delete_node(tree, id),
            EditOp::DeleteSubtree => self.deep_delete(tree, id),
            EditOp::DeleteDescendants => self.delete_descendants(tree, id).map(keep),
        }
    }

    /// Appends a fresh-id child under `parent`.
    #[instrument(level = "debug", skip(self, tree, data))]
    pub fn add_child(&self, tree: &mut WbsTree, parent: NodeId, data: NodeData) -> DomainResult<NodeId> {
        let id = tree.insert_node(data, parent)?;
        self.finish(tree, EditKind::Structure(EditOp::AddChild), parent, id);
        Ok(id)
    }

    /// Inserts a fresh-id node directly after `node`.
    #[instrument(level = "debug", skip(self, tree, data))]
    pub fn add_sibling(
        &self,
        tree: &mut WbsTree,
        node: NodeId,
        data: NodeData,
    ) -> DomainResult<Option<NodeId>> {
        let (Some(parent), Some(index)) = (tree.parent(node), tree.sibling_index(node)) else {
            return Ok(None);
        };
        let id = tree.insert_node(data, parent)?;
        tree.detach(id)?;
        tree.attach(id, parent, Some(index + 1))?;
        self.finish(tree, EditKind::Structure(EditOp::AddSibling), node, id);
        Ok(Some(id))
    }

    /// "Pop": children move up into the node's former slot, the node goes away.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn delete_node(&self, tree: &mut WbsTree, id: NodeId) -> DomainResult<Option<NodeId>> {
        let Some(parent) = tree.parent(id) else {
            return Ok(None);
        };
        let children = tree.children(id).to_vec();
        let position = tree.detach(id)?.unwrap_or_else(|| tree.children(parent).len());
        for (offset, &child) in children.iter().enumerate() {
            tree.detach(child)?;
            tree.attach(child, parent, Some(position + offset))?;
        }
        tree.remove_subtree(id)?;
        self.finish(tree, EditKind::Structure(EditOp::DeleteNode), id, parent);
        Ok(Some(parent))
    }

    /// Removes the whole subtree rooted at `id`.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn deep_delete(&self, tree: &mut WbsTree, id: NodeId) -> DomainResult<Option<NodeId>> {
        let Some(parent) = tree.parent(id) else {
            return Ok(None);
        };
        let removed = tree.remove_subtree(id)?;
        debug!("removed {} nodes", removed.len());
        self.finish(tree, EditKind::Structure(EditOp::DeleteSubtree), id, parent);
        Ok(Some(parent))
    }

    /// Removes every child subtree; the node itself stays.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn delete_descendants(&self, tree: &mut WbsTree, id: NodeId) -> DomainResult<bool> {
        let children = tree.children(id).to_vec();
        if children.is_empty() {
            return Ok(false);
        }
        for child in children {
            tree.remove_subtree(child)?;
        }
        self.finish(tree, EditKind::Structure(EditOp::DeleteDescendants), id, id);
        Ok(true)
    }

    /// Swaps with the next sibling.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn shift_forward(&self, tree: &mut WbsTree, id: NodeId) -> DomainResult<bool> {
        let (Some(parent), Some(index)) = (tree.parent(id), tree.sibling_index(id)) else {
            return Ok(false);
        };
        if index + 1 >= tree.children(parent).len() {
            return Ok(false);
        }
        tree.swap_children(parent, index, index + 1)?;
        self.finish(tree, EditKind::Structure(EditOp::ShiftForward), id, id);
        Ok(true)
    }

    /// Swaps with the previous sibling.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn shift_backward(&self, tree: &mut WbsTree, id: NodeId) -> DomainResult<bool> {
        let (Some(parent), Some(index)) = (tree.parent(id), tree.sibling_index(id)) else {
            return Ok(false);
        };
        if index == 0 {
            return Ok(false);
        }
        tree.swap_children(parent, index, index - 1)?;
        self.finish(tree, EditKind::Structure(EditOp::ShiftBackward), id, id);
        Ok(true)
    }

    /// Adjacent swaps until the node is the last sibling.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn bring_to_front(&self, tree: &mut WbsTree, id: NodeId) -> DomainResult<bool> {
        let (Some(parent), Some(mut index)) = (tree.parent(id), tree.sibling_index(id)) else {
            return Ok(false);
        };
        let last = tree.children(parent).len() - 1;
        if index == last {
            return Ok(false);
        }
        while index < last {
            tree.swap_children(parent, index, index + 1)?;
            index += 1;
        }
        self.finish(tree, EditKind::Structure(EditOp::BringToFront), id, id);
        Ok(true)
    }

    /// Adjacent swaps until the node is the first sibling.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn bring_to_back(&self, tree: &mut WbsTree, id: NodeId) -> DomainResult<bool> {
        let (Some(parent), Some(mut index)) = (tree.parent(id), tree.sibling_index(id)) else {
            return Ok(false);
        };
        if index == 0 {
            return Ok(false);
        }
        while index > 0 {
            tree.swap_children(parent, index, index - 1)?;
            index -= 1;
        }
        self.finish(tree, EditKind::Structure(EditOp::BringToBack), id, id);
        Ok(true)
    }

    /// Promotes the node one level, right after its former parent.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn shift_out(&self, tree: &mut WbsTree, id: NodeId) -> DomainResult<bool> {
        self.promote(tree, id, EditOp::ShiftOut)
    }

    /// Single-step promotion; same end state as [`Self::shift_out`].
    #[instrument(level = "debug", skip(self, tree))]
    pub fn breakout(&self, tree: &mut WbsTree, id: NodeId) -> DomainResult<bool> {
        self.promote(tree, id, EditOp::Breakout)
    }

    fn promote(&self, tree: &mut WbsTree, id: NodeId, op: EditOp) -> DomainResult<bool> {
        let Some(parent) = tree.parent(id) else {
            return Ok(false);
        };
        let (Some(grandparent), Some(parent_index)) = (tree.parent(parent), tree.sibling_index(parent))
        else {
            return Ok(false);
        };
        tree.detach(id)?;
        tree.attach(id, grandparent, Some(parent_index + 1))?;
        self.finish(tree, EditKind::Structure(op), id, id);
        Ok(true)
    }

    /// Demotes the node to the last child of its next sibling.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn shift_in(&self, tree: &mut WbsTree, id: NodeId) -> DomainResult<bool> {
        let (Some(parent), Some(index)) = (tree.parent(id), tree.sibling_index(id)) else {
            return Ok(false);
        };
        let Some(&target) = tree.children(parent).get(index + 1) else {
            return Ok(false);
        };
        tree.detach(id)?;
        tree.attach(id, target, None)?;
        self.finish(tree, EditKind::Structure(EditOp::ShiftIn), id, id);
        Ok(true)
    }

    /// Shallow duplicate appended to the node's parent: same scalars, no
    /// children, no predecessors, default color.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn copy(&self, tree: &mut WbsTree, id: NodeId) -> DomainResult<Option<NodeId>> {
        let Some(parent) = tree.parent(id) else {
            return Ok(None);
        };
        let source = tree.node(id)?;
        let data = copied_data(source.data.duplicate(), source.duration());
        let expanded = source.is_expanded();
        let copy = tree.insert_node(data, parent)?;
        tree.set_expanded_flag(copy, expanded)?;
        self.finish(tree, EditKind::Structure(EditOp::Duplicate), id, copy);
        Ok(Some(copy))
    }

    /// Duplicates the subtree at `id` under `target`; returns the new root.
    ///
    /// The source is snapshotted first, so copying a node into its own
    /// subtree copies the subtree as it was before the call.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn deep_copy(&self, tree: &mut WbsTree, id: NodeId, target: NodeId) -> DomainResult<NodeId> {
        tree.node(target)?;
        let snapshot: Vec<(NodeId, Option<NodeId>, NodeData, bool)> = tree
            .branch(id)
            .map(|(n, node)| {
                (
                    n,
                    node.parent(),
                    copied_data(node.data.duplicate(), node.duration()),
                    node.is_expanded(),
                )
            })
            .collect();
        if snapshot.is_empty() {
            return Err(DomainError::NodeNotFound(id));
        }

        let mut mapping: HashMap<NodeId, NodeId> = HashMap::new();
        let mut copy_root = target;
        for (original, original_parent, data, expanded) in snapshot {
            let parent = if original == id {
                target
            } else {
                original_parent
                    .and_then(|p| mapping.get(&p).copied())
                    .ok_or(DomainError::NodeNotFound(original))?
            };
            let copy = tree.insert_node(data, parent)?;
            tree.set_expanded_flag(copy, expanded)?;
            if original == id {
                copy_root = copy;
            }
            mapping.insert(original, copy);
        }
        debug!("copied {} nodes", mapping.len());
        self.finish(tree, EditKind::Structure(EditOp::DeepDuplicate), id, copy_root);
        Ok(copy_root)
    }

    /// Moves `id` to the end of `new_parent`'s children.
    ///
    /// The root cannot move (`Ok(false)`). Moving a node below itself or one
    /// of its descendants is rejected with [`DomainError::CycleDetected`].
    #[instrument(level = "debug", skip(self, tree))]
    pub fn reparent(&self, tree: &mut WbsTree, id: NodeId, new_parent: NodeId) -> DomainResult<bool> {
        tree.node(id)?;
        tree.node(new_parent)?;
        if !tree.has_parent(id) {
            return Ok(false);
        }
        if new_parent == id || tree.is_ancestor(id, new_parent) {
            return Err(DomainError::CycleDetected {
                node: id,
                target: new_parent,
            });
        }
        tree.detach(id)?;
        tree.attach(id, new_parent, None)?;
        self.finish(tree, EditKind::Reparent, id, id);
        Ok(true)
    }

    /// Assigns one field.
    ///
    /// Resource expressions are stored even when malformed and reported as
    /// [`FieldStatus::Invalid`]. Malformed predecessor text is reported the
    /// same way but leaves the stored predecessors untouched. A duration on
    /// an inner node is read-only and also reported as invalid.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn set_field(&self, tree: &mut WbsTree, id: NodeId, edit: FieldEdit) -> DomainResult<FieldStatus> {
        let field = edit.field();
        let status = match edit {
            FieldEdit::Name(name) => {
                tree.node_mut(id)?.data.name = name;
                FieldStatus::Valid
            }
            FieldEdit::Notes1(text) => {
                tree.node_mut(id)?.data.notes1 = text;
                FieldStatus::Valid
            }
            FieldEdit::Notes2(text) => {
                tree.node_mut(id)?.data.notes2 = text;
                FieldStatus::Valid
            }
            FieldEdit::Color(color) => {
                tree.node_mut(id)?.data.color = color;
                FieldStatus::Valid
            }
            FieldEdit::Resource(expr) => {
                let status = resource_status(&expr);
                tree.node_mut(id)?.data.resource = expr;
                status
            }
            FieldEdit::Duration(value) => {
                if !set_leaf_duration(tree, id, value)? {
                    return Ok(FieldStatus::Invalid);
                }
                FieldStatus::Valid
            }
            FieldEdit::SiblingGroupColor(color) => {
                tree.node(id)?;
                let Some(parent) = tree.parent(id) else {
                    return Ok(FieldStatus::Invalid);
                };
                for sibling in tree.children(parent).to_vec() {
                    tree.node_mut(sibling)?.data.color = color;
                }
                FieldStatus::Valid
            }
            FieldEdit::Predecessors(text) => {
                tree.node(id)?;
                match self.resolve_predecessors(tree, id, &text) {
                    Some(predecessors) => {
                        tree.replace_predecessors(id, predecessors)?;
                        FieldStatus::Valid
                    }
                    None => return Ok(FieldStatus::Invalid),
                }
            }
        };
        self.finish(tree, EditKind::Field(field), id, id);
        Ok(status)
    }

    fn resolve_predecessors(&self, tree: &mut WbsTree, id: NodeId, text: &str) -> Option<BTreeSet<NodeId>> {
        if !tree.is_numbered() {
            tree.renumber();
        }
        let resolved = parse_predecessor_text(text)
            .and_then(|ordinals| resolve_ordinals(tree, id, &ordinals));
        match resolved {
            Ok(predecessors) => Some(predecessors),
            Err(e) => {
                debug!("rejected predecessor text {:?}: {}", text, e);
                None
            }
        }
    }
}

fn copied_data(mut data: NodeData, effective_duration: f64) -> NodeData {
    data.duration = effective_duration;
    data
}
