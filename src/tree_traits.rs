//! Outline rendering of a document with `termtree`.

use termtree::Tree;
use tracing::instrument;

use crate::domain::{format_hours, person_duration, NodeId, WbsTree};

pub trait TreeOutline {
    /// Whole tree, one label per node: `<ordinal> <name> (<hours>h)`.
    fn to_outline(&self) -> Tree<String>;
}

impl TreeOutline for WbsTree {
    #[instrument(level = "debug", skip(self))]
    fn to_outline(&self) -> Tree<String> {
        fn build(tree: &WbsTree, id: NodeId) -> Tree<String> {
            let leaves: Vec<Tree<String>> = tree
                .children(id)
                .iter()
                .map(|&child| build(tree, child))
                .collect();
            Tree::new(label(tree, id)).with_leaves(leaves)
        }

        build(self, self.root())
    }
}

fn label(tree: &WbsTree, id: NodeId) -> String {
    let Some(node) = tree.find_by_id(id) else {
        return id.to_string();
    };
    let ordinal = tree
        .display_ordinal(id)
        .map(|o| o.to_string())
        .unwrap_or_else(|| "?".into());
    format!(
        "{} {} ({}h, {} person-h)",
        ordinal,
        node.data.name,
        format_hours(node.duration()),
        person_duration(tree, id)
    )
}
