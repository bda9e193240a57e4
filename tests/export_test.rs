//! Tests for text and CSV exports

use pretty_assertions::assert_eq;

use wbsed::application::export::{export, export_csv, export_text};
use wbsed::application::ExportFormat;
use wbsed::domain::{EditEngine, FieldEdit, NodeData, WbsTree};
use wbsed::util::testing;

/// Plan
/// ├── Design
/// │   └── Sketch (2h, Ann)
/// └── Review (3h, "Bob, Eve[50%]", after Sketch, notes "a,b")
fn plan() -> WbsTree {
    testing::init_test_setup();
    let mut tree = WbsTree::new("Plan");
    let engine = EditEngine::default();
    let root = tree.root();
    let design = engine.add_child(&mut tree, root, NodeData::named("Design")).unwrap();
    let sketch = engine.add_child(&mut tree, design, NodeData::named("Sketch")).unwrap();
    let review = engine.add_child(&mut tree, root, NodeData::named("Review")).unwrap();
    let edits = [
        (sketch, FieldEdit::Duration(2.0)),
        (sketch, FieldEdit::Resource("Ann".into())),
        (review, FieldEdit::Duration(3.0)),
        (review, FieldEdit::Resource("Bob, Eve[50%]".into())),
        (review, FieldEdit::Notes1("a,b".into())),
    ];
    for (id, edit) in edits {
        engine.set_field(&mut tree, id, edit).unwrap();
    }
    tree.renumber();
    engine
        .set_field(&mut tree, review, FieldEdit::Predecessors("2".into()))
        .unwrap();
    tree
}

#[test]
fn given_tree_when_exporting_text_then_indented_tab_separated_rows() {
    let mut tree = plan();

    let text = export_text(&mut tree, 2);

    let expected = concat!(
        "Plan\n",
        "ID\tItem Name\tDuration\tPerson Duration\tResource\tPredecessors\tNotes1\tNotes2\n",
        "1\tDesign\t2.0\t2.0\t\t\t\t\n",
        "  2\tSketch\t2.0\t2.0\tAnn\t\t\t\n",
        "3\tReview\t3.0\t4.5\tBob, Eve[50%]\t2\ta,b\t\n",
    );
    assert_eq!(text, expected);
}

#[test]
fn given_wider_indent_when_exporting_text_then_more_leading_spaces() {
    let mut tree = plan();

    let text = export_text(&mut tree, 4);

    assert!(text.lines().any(|l| l.starts_with("    2\tSketch")));
}

#[test]
fn given_tree_when_exporting_csv_then_names_offset_by_level() {
    let mut tree = plan();

    let csv = export_csv(&mut tree);

    let expected = concat!(
        "ID,Item Name,,Duration,Person Duration,Resource,Predecessors,Notes1,Notes2\r\n",
        "1,Design,,2.0,2.0,,,,\r\n",
        "2,,Sketch,2.0,2.0,Ann,,,\r\n",
        "3,Review,,3.0,4.5,\"Bob, Eve[50%]\",2,\"a,b\",\r\n",
    );
    assert_eq!(csv, expected);
}

#[test]
fn given_malformed_resource_when_exporting_then_error_marker_in_person_column() {
    let mut tree = plan();
    let review = tree.find_by_ordinal(3).unwrap();
    EditEngine::default()
        .set_field(&mut tree, review, FieldEdit::Resource("[x]".into()))
        .unwrap();

    let text = export(&mut tree, ExportFormat::Text, 2);

    assert!(text.contains("3\tReview\t3.0\tERROR\t[x]"));
}

#[test]
fn given_lone_root_when_exporting_then_header_only() {
    testing::init_test_setup();
    let mut tree = WbsTree::new("Empty");

    assert_eq!(
        export(&mut tree, ExportFormat::Text, 2),
        "Empty\nID\tItem Name\tDuration\tPerson Duration\tResource\tPredecessors\tNotes1\tNotes2\n"
    );
    assert_eq!(
        export(&mut tree, ExportFormat::Csv, 2),
        "ID,Item Name,Duration,Person Duration,Resource,Predecessors,Notes1,Notes2\r\n"
    );
}
