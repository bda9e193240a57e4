//! Tests for duration roll-up and person-duration

use rstest::rstest;

use wbsed::domain::{
    format_hours, person_duration, resource_multiplier, DocumentFile, EditEngine, FieldEdit,
    NodeData, NodeId, PersonDuration, WbsTree,
};
use wbsed::util::testing;

fn leaf(tree: &mut WbsTree, engine: &EditEngine, parent: NodeId, name: &str, hours: f64, resource: &str) -> NodeId {
    testing::init_test_setup();
    let id = engine.add_child(tree, parent, NodeData::named(name)).unwrap();
    engine.set_field(tree, id, FieldEdit::Duration(hours)).unwrap();
    engine
        .set_field(tree, id, FieldEdit::Resource(resource.to_string()))
        .unwrap();
    id
}

// ============================================================
// Resource multiplier
// ============================================================

#[rstest]
#[case::empty("", 0.0)]
#[case::single_name("Ann", 1.0)]
#[case::two_names("Ann, Bob", 2.0)]
#[case::percentage("Bob[50%]", 0.5)]
#[case::mixed("Bob[50%], Ann", 1.5)]
#[case::spaces_inside_bracket("Bob [ 25 % ]", 0.25)]
#[case::trailing_comma("Ann,", 1.0)]
#[case::fractional_percentage("Eve[12.5%]", 0.125)]
fn given_valid_expression_when_computing_multiplier_then_expected(
    #[case] expr: &str,
    #[case] expected: f64,
) {
    let multiplier = resource_multiplier(expr).unwrap();
    assert!((multiplier - expected).abs() < 1e-9, "{expr:?}: {multiplier}");
}

#[rstest]
#[case::bracket_only("[50%]")]
#[case::missing_percent_sign("Bob[50]")]
#[case::not_a_number("Bob[half%]")]
#[case::unbalanced("Bob[50%")]
#[case::two_groups("Bob[50%][20%]")]
#[case::one_bad_token("Ann, [10%]")]
fn given_malformed_expression_when_computing_multiplier_then_error(#[case] expr: &str) {
    assert!(resource_multiplier(expr).is_err(), "{expr:?}");
}

// ============================================================
// Roll-up
// ============================================================

#[test]
fn given_two_leaves_when_aggregating_then_sum_and_person_hours() {
    // Arrange: R -> A (5h, Bob[50%]), B (3h, Ann)
    let mut tree = WbsTree::new("R");
    let engine = EditEngine::default();
    let root = tree.root();
    leaf(&mut tree, &engine, root, "A", 5.0, "Bob[50%]");
    leaf(&mut tree, &engine, root, "B", 3.0, "Ann");

    // Act
    let aggregate = tree.find_by_id(root).unwrap().duration();
    let person = person_duration(&tree, root);

    // Assert
    assert_eq!(aggregate, 8.0);
    assert_eq!(person, PersonDuration::Hours(5.5));
    assert_eq!(person.to_string(), "5.5");
}

#[test]
fn given_nested_leaves_when_leaf_changes_then_every_ancestor_updated() {
    // Arrange
    let mut tree = WbsTree::new("R");
    let engine = EditEngine::default();
    let root = tree.root();
    let phase = engine.add_child(&mut tree, root, NodeData::named("Phase")).unwrap();
    let task = leaf(&mut tree, &engine, phase, "Task", 2.0, "");
    leaf(&mut tree, &engine, root, "Other", 1.0, "");

    // Act
    engine.set_field(&mut tree, task, FieldEdit::Duration(6.0)).unwrap();

    // Assert
    assert_eq!(tree.find_by_id(phase).unwrap().duration(), 6.0);
    assert_eq!(tree.find_by_id(root).unwrap().duration(), 7.0);
}

#[test]
fn given_leaf_gaining_child_when_aggregating_then_roll_up_replaces_own_value() {
    let mut tree = WbsTree::new("R");
    let engine = EditEngine::default();
    let root = tree.root();
    let task = leaf(&mut tree, &engine, root, "Task", 10.0, "");
    leaf(&mut tree, &engine, task, "Sub", 2.0, "");
    assert_eq!(tree.find_by_id(task).unwrap().duration(), 2.0);
    assert_eq!(tree.find_by_id(root).unwrap().duration(), 2.0);
}

#[test]
fn given_inner_node_losing_children_when_aggregating_then_keeps_last_roll_up() {
    // Arrange
    let mut tree = WbsTree::new("R");
    let engine = EditEngine::default();
    let root = tree.root();
    let task = leaf(&mut tree, &engine, root, "Task", 5.0, "");
    leaf(&mut tree, &engine, task, "Sub", 2.0, "");
    let mut reloaded = DocumentFile::from_tree(&mut tree).into_tree().unwrap();

    // Act
    engine.delete_descendants(&mut tree, task).unwrap();
    engine.delete_descendants(&mut reloaded, task).unwrap();

    // Assert
    assert_eq!(tree.find_by_id(task).unwrap().duration(), 2.0);
    assert_eq!(reloaded.find_by_id(task).unwrap().duration(), 2.0);
    assert_eq!(tree.find_by_id(root).unwrap().duration(), 2.0);
}

#[test]
fn given_moved_subtree_when_aggregating_then_both_parents_updated() {
    let mut tree = WbsTree::new("R");
    let engine = EditEngine::default();
    let root = tree.root();
    let left = engine.add_child(&mut tree, root, NodeData::named("Left")).unwrap();
    let right = engine.add_child(&mut tree, root, NodeData::named("Right")).unwrap();
    let task = leaf(&mut tree, &engine, left, "Task", 4.0, "");
    leaf(&mut tree, &engine, right, "Keep", 1.0, "");

    engine.reparent(&mut tree, task, right).unwrap();

    assert_eq!(tree.find_by_id(left).unwrap().duration(), 0.0);
    assert_eq!(tree.find_by_id(right).unwrap().duration(), 5.0);
    assert_eq!(tree.find_by_id(root).unwrap().duration(), 5.0);
}

// ============================================================
// Poisoning
// ============================================================

#[test]
fn given_malformed_resource_deep_in_subtree_when_aggregating_then_ancestors_poisoned() {
    // Arrange
    let mut tree = WbsTree::new("R");
    let engine = EditEngine::default();
    let root = tree.root();
    let phase = engine.add_child(&mut tree, root, NodeData::named("Phase")).unwrap();
    let sibling = leaf(&mut tree, &engine, root, "Healthy", 3.0, "Ann");
    let bad = leaf(&mut tree, &engine, phase, "Bad", 2.0, "[oops]");

    // Assert
    assert_eq!(person_duration(&tree, bad), PersonDuration::Invalid);
    assert_eq!(person_duration(&tree, phase), PersonDuration::Invalid);
    assert_eq!(person_duration(&tree, root), PersonDuration::Invalid);
    assert_eq!(person_duration(&tree, sibling), PersonDuration::Hours(3.0));
    assert_eq!(PersonDuration::Invalid.to_string(), "ERROR");
}

#[test]
fn given_fixed_malformed_resource_when_aggregating_then_valid_again() {
    let mut tree = WbsTree::new("R");
    let engine = EditEngine::default();
    let root = tree.root();
    let task = leaf(&mut tree, &engine, root, "Task", 2.0, "Bob[50]");
    assert!(!person_duration(&tree, root).is_valid());

    engine
        .set_field(&mut tree, task, FieldEdit::Resource("Bob[50%]".into()))
        .unwrap();

    assert_eq!(person_duration(&tree, root), PersonDuration::Hours(1.0));
}

#[rstest]
#[case(1.0, 2.0)]
#[case(0.0, 0.5)]
#[case(3.0, 30.0)]
fn given_larger_leaf_duration_when_aggregating_then_person_duration_not_smaller(
    #[case] before: f64,
    #[case] after: f64,
) {
    let mut tree = WbsTree::new("R");
    let engine = EditEngine::default();
    let root = tree.root();
    let task = leaf(&mut tree, &engine, root, "Task", before, "Ann, Bob[25%]");
    leaf(&mut tree, &engine, root, "Other", 1.0, "Eve");
    let low = person_duration(&tree, root).hours().unwrap();

    engine.set_field(&mut tree, task, FieldEdit::Duration(after)).unwrap();

    let high = person_duration(&tree, root).hours().unwrap();
    assert!(high >= low, "{high} < {low}");
}

#[rstest]
#[case(8.0, "8.0")]
#[case(5.5, "5.5")]
#[case(0.0, "0.0")]
#[case(0.25, "0.25")]
fn given_hours_when_formatting_then_at_least_one_decimal(#[case] value: f64, #[case] expected: &str) {
    assert_eq!(format_hours(value), expected);
}
