//! Integration tests for Settings loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: scalars REPLACE, `[keys]` table REPLACES
//! - Global → Local (`.wbsed.toml`): scalars REPLACE, `[keys]` merged per chord
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test local config merging with defaults.

use std::fs;

use tempfile::TempDir;

use wbsed::application::{ExportFormat, KeyCommand, KeyMap};
use wbsed::config::{local_config_path, Settings};
use wbsed::util::testing;

fn project() -> TempDir {
    testing::init_test_setup();
    TempDir::new().unwrap()
}

// ============================================================
// Settings::load() local config tests
// ============================================================

#[test]
fn given_no_local_config_when_load_then_defaults() {
    let project = project();

    let settings = Settings::load(Some(project.path())).expect("load settings");

    assert_eq!(settings.root_name, "WBS");
    assert_eq!(settings.new_node_name, "New Node");
    assert_eq!(settings.file_extension, "wbs");
    assert_eq!(settings.export.indent_width, 2);
}

#[test]
fn given_local_config_when_load_then_scalars_override_defaults() {
    // Arrange
    let project = project();
    fs::write(
        local_config_path(project.path()),
        r#"
root_name = "Project X"
new_node_name = "Task"

[export]
format = "csv"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(project.path())).expect("load settings");

    // Assert
    assert_eq!(settings.root_name, "Project X");
    assert_eq!(settings.new_node_name, "Task");
    assert_eq!(settings.export.format, ExportFormat::Csv);
    assert_eq!(settings.export.indent_width, 2, "unset field keeps default");
}

#[test]
fn given_relative_document_dir_when_load_then_resolved_against_project() {
    let project = project();
    fs::write(
        local_config_path(project.path()),
        "document_dir = \"plans\"\n",
    )
    .unwrap();

    let settings = Settings::load(Some(project.path())).expect("load settings");

    assert_eq!(settings.document_dir, project.path().join("plans"));
}

#[test]
fn given_local_key_overrides_when_building_keymap_then_applied_on_defaults() {
    // Arrange
    let project = project();
    fs::write(
        local_config_path(project.path()),
        r#"
[keys]
"ctrl+k" = "shift-backward"
"delete" = "none"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(project.path())).expect("load settings");
    let keymap = KeyMap::with_overrides(&settings.keys).expect("keymap");

    // Assert
    assert_eq!(keymap.lookup("Ctrl+K"), Some(KeyCommand::ShiftBackward));
    assert_eq!(keymap.lookup("alt+up"), Some(KeyCommand::ShiftBackward));
    assert_eq!(keymap.lookup("delete"), None);
}

#[test]
fn given_malformed_local_config_when_load_then_error() {
    let project = project();
    fs::write(local_config_path(project.path()), "root_name = [unclosed").unwrap();

    assert!(Settings::load(Some(project.path())).is_err());
}

#[test]
fn given_unknown_export_format_when_load_then_error() {
    let project = project();
    fs::write(
        local_config_path(project.path()),
        "[export]\nformat = \"xlsx\"\n",
    )
    .unwrap();

    assert!(Settings::load(Some(project.path())).is_err());
}

#[test]
fn given_settings_when_rendering_toml_then_parsable_again() {
    let settings = Settings::default();

    let rendered = settings.to_toml().expect("serialize");
    let parsed: Settings = toml::from_str(&rendered).expect("parse");

    assert_eq!(parsed, settings);
}

#[test]
fn given_template_when_parsing_then_valid_toml() {
    let template = Settings::template();
    let parsed: Result<toml::Value, _> = toml::from_str(&template);
    assert!(parsed.is_ok());
}
