//! Tests for the flattened table projection

use rstest::{fixture, rstest};

use wbsed::application::projection::{is_visible, visible_rows};
use wbsed::application::{render_row, ClickModifiers, Projection};
use wbsed::domain::{EditEngine, FieldEdit, FieldStatus, NodeData, NodeId, WbsTree};
use wbsed::util::testing;

/// Root
/// ├── A
/// │   ├── A1
/// │   │   └── A1x
/// │   └── A2
/// └── B
struct View {
    tree: WbsTree,
    engine: EditEngine,
    projection: Projection,
    a: NodeId,
    a1: NodeId,
    a1x: NodeId,
    a2: NodeId,
    b: NodeId,
}

#[fixture]
fn view() -> View {
    testing::init_test_setup();
    let mut tree = WbsTree::new("Root");
    let engine = EditEngine::default();
    let root = tree.root();
    let a = engine.add_child(&mut tree, root, NodeData::named("A")).unwrap();
    let a1 = engine.add_child(&mut tree, a, NodeData::named("A1")).unwrap();
    let a1x = engine.add_child(&mut tree, a1, NodeData::named("A1x")).unwrap();
    let a2 = engine.add_child(&mut tree, a, NodeData::named("A2")).unwrap();
    let b = engine.add_child(&mut tree, root, NodeData::named("B")).unwrap();
    let projection = Projection::new(&mut tree);
    View {
        tree,
        engine,
        projection,
        a,
        a1,
        a1x,
        a2,
        b,
    }
}

fn assert_rows_match_visibility(v: &View) {
    for (id, _) in v.tree.all_nodes() {
        assert_eq!(
            v.projection.is_visible(id),
            is_visible(&v.tree, id),
            "visibility of {id}"
        );
    }
    assert_eq!(v.projection.rows(), visible_rows(&v.tree, v.tree.root()).as_slice());
}

// ============================================================
// Rows and visibility
// ============================================================

#[rstest]
fn given_expanded_tree_when_projecting_then_all_rows_in_dfs_order(view: View) {
    let root = view.tree.root();
    assert_eq!(
        view.projection.rows(),
        &[root, view.a, view.a1, view.a1x, view.a2, view.b]
    );
}

#[rstest]
fn given_collapsed_node_when_toggling_then_descendants_hidden(mut view: View) {
    // Act
    let expanded = view
        .projection
        .toggle_expanded(&mut view.tree, view.a)
        .unwrap();

    // Assert
    assert!(!expanded);
    let root = view.tree.root();
    assert_eq!(view.projection.rows(), &[root, view.a, view.b]);
    assert_rows_match_visibility(&view);
}

#[rstest]
fn given_collapsed_inner_node_when_expanding_parent_then_inner_stays_hidden(mut view: View) {
    // Arrange
    view.projection.toggle_expanded(&mut view.tree, view.a1).unwrap();
    view.projection.toggle_expanded(&mut view.tree, view.a).unwrap();

    // Act
    view.projection.toggle_expanded(&mut view.tree, view.a).unwrap();

    // Assert
    let root = view.tree.root();
    assert_eq!(
        view.projection.rows(),
        &[root, view.a, view.a1, view.a2, view.b]
    );
    assert!(!view.projection.is_visible(view.a1x));
    assert_rows_match_visibility(&view);
}

#[rstest]
fn given_any_toggle_sequence_when_projecting_then_rows_equal_visible_set(mut view: View) {
    let sequence = [view.a1, view.a, view.b, view.a1, view.a, view.a1];
    for id in sequence {
        view.projection.toggle_expanded(&mut view.tree, id).unwrap();
        assert_rows_match_visibility(&view);
    }
}

#[rstest]
fn given_collapsed_node_when_toggling_then_document_not_modified(mut view: View) {
    view.tree.clear_modified();
    view.projection.toggle_expanded(&mut view.tree, view.a).unwrap();
    assert!(!view.tree.is_modified());
}

#[rstest]
fn given_structural_edit_when_refreshing_then_rows_follow(mut view: View) {
    view.engine.shift_in(&mut view.tree, view.a).unwrap();
    view.projection.refresh(&mut view.tree);

    let root = view.tree.root();
    assert_eq!(
        view.projection.rows(),
        &[root, view.b, view.a, view.a1, view.a1x, view.a2]
    );
    assert_eq!(view.tree.display_ordinal(view.a), Some(2));
}

// ============================================================
// Row rendering
// ============================================================

#[rstest]
fn given_node_when_rendering_row_then_descriptor_fields(mut view: View) {
    // Arrange
    view.engine
        .set_field(&mut view.tree, view.a2, FieldEdit::Duration(3.0))
        .unwrap();
    view.engine
        .set_field(&mut view.tree, view.a2, FieldEdit::Resource("Ann[50%]".into()))
        .unwrap();
    view.engine
        .set_field(&mut view.tree, view.b, FieldEdit::Predecessors("4".into()))
        .unwrap();
    view.projection.refresh(&mut view.tree);

    // Act
    let a2 = render_row(&view.tree, view.a2).unwrap();
    let b = render_row(&view.tree, view.b).unwrap();
    let root = render_row(&view.tree, view.tree.root()).unwrap();

    // Assert
    assert_eq!(a2.ordinal, Some(4));
    assert_eq!(a2.level, 2);
    assert!(a2.is_leaf);
    assert_eq!(a2.duration, 3.0);
    assert_eq!(a2.person_duration.hours(), Some(1.5));
    assert_eq!(a2.resource_status, FieldStatus::Valid);
    assert_eq!(b.predecessors, "4");
    assert!(root.is_header);
    assert_eq!(root.duration, 3.0);
}

#[rstest]
fn given_rejected_predecessor_text_when_rendering_then_flagged_until_cleared(mut view: View) {
    // Arrange
    view.projection.flag_predecessors(view.b, "1, x");

    // Act
    let flagged = view.projection.row(&view.tree, view.b).unwrap();
    view.projection.clear_predecessor_flag(view.b);
    let cleared = view.projection.row(&view.tree, view.b).unwrap();

    // Assert
    assert_eq!(flagged.predecessors, "1, x");
    assert_eq!(flagged.predecessors_status, FieldStatus::Invalid);
    assert_eq!(cleared.predecessors, "");
    assert_eq!(cleared.predecessors_status, FieldStatus::Valid);
}

// ============================================================
// Selection
// ============================================================

#[rstest]
fn given_plain_click_when_selecting_then_only_that_row(mut view: View) {
    view.projection.click(view.a, ClickModifiers::PLAIN);
    view.projection.click(view.b, ClickModifiers::PLAIN);
    assert_eq!(view.projection.selection(), &[view.b]);
    assert_eq!(view.projection.single_selection(), Some(view.b));
}

#[rstest]
fn given_ctrl_click_when_selecting_then_toggles_membership(mut view: View) {
    view.projection.click(view.a, ClickModifiers::PLAIN);
    view.projection.click(view.b, ClickModifiers::CTRL);
    assert_eq!(view.projection.selection(), &[view.a, view.b]);
    assert_eq!(view.projection.single_selection(), None);

    view.projection.click(view.a, ClickModifiers::CTRL);
    assert_eq!(view.projection.selection(), &[view.b]);
}

#[rstest]
fn given_anchor_when_shift_clicking_downwards_then_contiguous_run(mut view: View) {
    view.projection.click(view.a1, ClickModifiers::PLAIN);
    view.projection.click(view.b, ClickModifiers::SHIFT);
    assert_eq!(
        view.projection.selection(),
        &[view.a1, view.a1x, view.a2, view.b]
    );
}

#[rstest]
fn given_anchor_when_shift_clicking_upwards_then_run_toward_target(mut view: View) {
    view.projection.click(view.a2, ClickModifiers::PLAIN);
    view.projection.click(view.a, ClickModifiers::SHIFT);
    assert_eq!(
        view.projection.selection(),
        &[view.a2, view.a1x, view.a1, view.a]
    );
}

#[rstest]
fn given_already_selected_target_when_shift_clicking_then_target_anchors_next_run(mut view: View) {
    // Arrange
    view.projection.click(view.a2, ClickModifiers::PLAIN);
    view.projection.click(view.a, ClickModifiers::CTRL);

    // Act
    view.projection.click(view.a2, ClickModifiers::SHIFT);
    view.projection.click(view.b, ClickModifiers::SHIFT);

    // Assert
    assert_eq!(
        view.projection.selection(),
        &[view.a, view.a1, view.a1x, view.a2, view.b]
    );
}

#[rstest]
fn given_empty_selection_when_shift_clicking_then_selects_target(mut view: View) {
    view.projection.click(view.a2, ClickModifiers::SHIFT);
    assert_eq!(view.projection.selection(), &[view.a2]);
}

#[rstest]
fn given_selected_descendant_when_collapsing_then_deselected(mut view: View) {
    view.projection.click(view.a1x, ClickModifiers::PLAIN);
    view.projection.click(view.b, ClickModifiers::CTRL);

    view.projection.toggle_expanded(&mut view.tree, view.a).unwrap();

    assert_eq!(view.projection.selection(), &[view.b]);
}

#[rstest]
fn given_empty_selection_when_right_clicking_then_target_selected(mut view: View) {
    assert_eq!(view.projection.right_click(view.a), Some(view.a));
    assert_eq!(view.projection.selection(), &[view.a]);
}

#[rstest]
fn given_multi_selection_when_right_clicking_then_no_menu_target(mut view: View) {
    view.projection.click(view.a, ClickModifiers::PLAIN);
    view.projection.click(view.b, ClickModifiers::CTRL);
    assert_eq!(view.projection.right_click(view.a2), None);
}

#[rstest]
fn given_offset_beyond_rows_when_setting_scroll_then_clamped(mut view: View) {
    view.projection.set_scroll_offset(100);
    assert_eq!(view.projection.scroll_offset(), 5);

    view.projection.toggle_expanded(&mut view.tree, view.a).unwrap();
    assert_eq!(view.projection.scroll_offset(), 2);
}
