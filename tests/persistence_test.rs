//! Tests for PersistenceService

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use wbsed::application::services::PersistenceService;
use wbsed::application::{ApplicationError, ExportFormat};
use wbsed::domain::{
    DomainError, EditEngine, FieldEdit, NodeData, NodeId, Rgb, WbsTree,
};
use wbsed::infrastructure::traits::RealFileSystem;
use wbsed::util::testing;

fn service() -> PersistenceService {
    testing::init_test_setup();
    PersistenceService::new(Arc::new(RealFileSystem))
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write document");
    path
}

/// Plan
/// ├── Design (Ann)
/// │   └── Sketch (2h)
/// └── Review (3h, after Sketch)
fn plan() -> (WbsTree, NodeId, NodeId, NodeId) {
    let mut tree = WbsTree::new("Plan");
    let engine = EditEngine::default();
    let root = tree.root();
    let design = engine.add_child(&mut tree, root, NodeData::named("Design")).unwrap();
    let sketch = engine.add_child(&mut tree, design, NodeData::named("Sketch")).unwrap();
    let review = engine.add_child(&mut tree, root, NodeData::named("Review")).unwrap();
    engine.set_field(&mut tree, sketch, FieldEdit::Duration(2.0)).unwrap();
    engine.set_field(&mut tree, review, FieldEdit::Duration(3.0)).unwrap();
    engine
        .set_field(&mut tree, design, FieldEdit::Resource("Ann".into()))
        .unwrap();
    engine
        .set_field(&mut tree, sketch, FieldEdit::Notes1("first pass".into()))
        .unwrap();
    engine
        .set_field(&mut tree, review, FieldEdit::Color(Rgb::new(0xAA, 0xBB, 0xCC)))
        .unwrap();
    tree.renumber();
    engine
        .set_field(&mut tree, review, FieldEdit::Predecessors("2".into()))
        .unwrap();
    (tree, design, sketch, review)
}

#[test]
fn given_saved_document_when_loading_then_same_structure_ids_and_fields() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("plan.wbs");
    let (mut tree, design, sketch, review) = plan();
    let service = service();

    // Act
    service.save(&mut tree, &path).unwrap();
    let loaded = service.load(&path).unwrap();

    // Assert
    let shape = |t: &WbsTree| -> Vec<(NodeId, Option<NodeId>, String)> {
        t.all_nodes()
            .map(|(id, n)| (id, n.parent(), n.data.name.clone()))
            .collect()
    };
    assert_eq!(shape(&loaded), shape(&tree));
    assert_eq!(loaded.find_by_id(design).unwrap().data.resource, "Ann");
    assert_eq!(loaded.find_by_id(sketch).unwrap().data.notes1, "first pass");
    assert_eq!(
        loaded.find_by_id(review).unwrap().data.color,
        Rgb::new(0xAA, 0xBB, 0xCC)
    );
    assert_eq!(loaded.live_predecessors(review), vec![sketch]);
    assert_eq!(loaded.find_by_id(loaded.root()).unwrap().duration(), 5.0);
    assert!(!loaded.is_modified());
}

#[test]
fn given_saved_document_when_saving_then_dirty_flag_cleared() {
    let temp = TempDir::new().unwrap();
    let (mut tree, ..) = plan();
    assert!(tree.is_modified());

    service().save(&mut tree, &temp.path().join("plan.wbs")).unwrap();

    assert!(!tree.is_modified());
}

#[test]
fn given_loaded_document_when_adding_node_then_fresh_id_above_all_loaded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("plan.wbs");
    let (mut tree, ..) = plan();
    let service = service();
    service.save(&mut tree, &path).unwrap();

    let mut loaded = service.load(&path).unwrap();
    let max = loaded.all_nodes().map(|(id, _)| id.get()).max().unwrap();
    let root = loaded.root();
    let fresh = EditEngine::default()
        .add_child(&mut loaded, root, NodeData::named("New"))
        .unwrap();

    assert!(fresh.get() > max);
}

#[test]
fn given_nested_json_when_loading_then_children_in_file_order() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write_file(
        &temp,
        "doc.wbs",
        r#"{
  "version": 1,
  "root": {
    "id": 1,
    "name": "Root",
    "children": [
      { "id": 7, "name": "Second", "duration": 1.5 },
      { "id": 3, "name": "Third", "predecessors": [7, 42],
        "children": [ { "id": 9, "name": "Deep", "duration": 2 } ] }
    ]
  }
}"#,
    );

    // Act
    let tree = service().load(&path).unwrap();

    // Assert
    let names: Vec<&str> = tree.all_nodes().map(|(_, n)| n.data.name.as_str()).collect();
    assert_eq!(names, vec!["Root", "Second", "Third", "Deep"]);
    assert_eq!(tree.live_predecessors(NodeId::new(3)), vec![NodeId::new(7)]);
    assert_eq!(tree.find_by_id(tree.root()).unwrap().duration(), 3.5);
    assert_eq!(tree.display_ordinal(NodeId::new(9)), Some(3));
}

#[test]
fn given_duplicate_ids_when_loading_then_error() {
    let temp = TempDir::new().unwrap();
    let path = write_file(
        &temp,
        "dup.wbs",
        r#"{"version": 1, "root": {"id": 1, "name": "R", "children": [
            {"id": 2, "name": "A"}, {"id": 2, "name": "B"}]}}"#,
    );

    let result = service().load(&path);

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::DuplicateId(_)))
    ));
}

#[test]
fn given_malformed_json_when_loading_then_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = write_file(&temp, "broken.wbs", "{ not json");

    let result = service().load(&path);

    assert!(matches!(result, Err(ApplicationError::Parse { .. })));
}

#[test]
fn given_future_version_when_loading_then_unsupported() {
    let temp = TempDir::new().unwrap();
    let path = write_file(
        &temp,
        "future.wbs",
        r#"{"version": 99, "root": {"id": 1, "name": "R"}}"#,
    );

    let result = service().load(&path);

    assert!(matches!(
        result,
        Err(ApplicationError::UnsupportedVersion { version: 99, .. })
    ));
}

#[test]
fn given_missing_file_when_loading_then_error() {
    let temp = TempDir::new().unwrap();
    let result = service().load(&temp.path().join("nope.wbs"));
    assert!(result.is_err());
}

#[test]
fn given_existing_untitled_files_when_choosing_name_then_first_free() {
    let temp = TempDir::new().unwrap();
    write_file(&temp, "untitled0.wbs", "");
    write_file(&temp, "untitled1.wbs", "");

    let (path, n) = service().untitled_path(temp.path(), "untitled", "wbs", 0);

    assert_eq!(n, 2);
    assert_eq!(path, temp.path().join("untitled2.wbs"));
}

#[test]
fn given_document_when_exporting_to_file_then_written_and_still_dirty() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("plan.csv");
    let (mut tree, ..) = plan();

    service()
        .export(&mut tree, &path, ExportFormat::Csv, 2)
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("ID,Item Name,"));
    assert!(tree.is_modified());
}
