//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/wbsed/wbsed.toml`
//! 3. Local config: `<project_dir>/.wbsed.toml`
//! 4. Environment variables: `WBSED_*` prefix

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::{ApplicationError, ExportFormat};
use crate::util::path::expand_path;

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExportSettings {
    /// Spaces per level in text exports
    pub indent_width: usize,
    /// Format used when `--format` is not given
    pub format: ExportFormat,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            indent_width: 2,
            format: ExportFormat::Text,
        }
    }
}

/// Raw export config for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawExportSettings {
    pub indent_width: Option<usize>,
    pub format: Option<ExportFormat>,
}

/// Raw settings for intermediate parsing.
///
/// `None` means "not specified, inherit from the layer below".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub root_name: Option<String>,
    pub new_node_name: Option<String>,
    pub untitled_prefix: Option<String>,
    pub file_extension: Option<String>,
    pub document_dir: Option<PathBuf>,
    pub export: RawExportSettings,
    pub keys: Option<BTreeMap<String, String>>,
}

impl ExportSettings {
    fn merge(&self, overlay: &RawExportSettings) -> Self {
        Self {
            indent_width: overlay.indent_width.unwrap_or(self.indent_width),
            format: overlay.format.unwrap_or(self.format),
        }
    }
}

/// Unified configuration for wbsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Name of the root node of new documents
    pub root_name: String,
    /// Name of nodes created by add-child/add-sibling
    pub new_node_name: String,
    /// File stem of untitled documents (`untitled0.wbs`, ...)
    pub untitled_prefix: String,
    /// Extension of document files
    pub file_extension: String,
    /// Where untitled documents are placed
    pub document_dir: PathBuf,
    pub export: ExportSettings,
    /// Chord overrides, e.g. `"ctrl+up" = "shift-backward"`; `"none"` unbinds
    pub keys: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root_name: "WBS".into(),
            new_node_name: "New Node".into(),
            untitled_prefix: "untitled".into(),
            file_extension: "wbs".into(),
            document_dir: PathBuf::from("."),
            export: ExportSettings::default(),
            keys: BTreeMap::new(),
        }
    }
}

/// Get the XDG config directory for wbsed.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "wbsed").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("wbsed.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".wbsed.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        self.document_dir = expand_path(&self.document_dir);
    }

    /// Merge a local overlay: scalars win when given, key bindings are
    /// merged per chord.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let mut keys = self.keys.clone();
        if let Some(local) = &overlay.keys {
            keys.extend(local.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Self {
            keys,
            ..self.apply_scalars(overlay)
        }
    }

    /// Apply the global config onto defaults: a `keys` table replaces the
    /// default bindings entirely.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            keys: global.keys.clone().unwrap_or_else(|| self.keys.clone()),
            ..self.apply_scalars(global)
        }
    }

    fn apply_scalars(&self, overlay: &RawSettings) -> Self {
        Self {
            root_name: overlay
                .root_name
                .clone()
                .unwrap_or_else(|| self.root_name.clone()),
            new_node_name: overlay
                .new_node_name
                .clone()
                .unwrap_or_else(|| self.new_node_name.clone()),
            untitled_prefix: overlay
                .untitled_prefix
                .clone()
                .unwrap_or_else(|| self.untitled_prefix.clone()),
            file_extension: overlay
                .file_extension
                .clone()
                .unwrap_or_else(|| self.file_extension.clone()),
            document_dir: overlay
                .document_dir
                .clone()
                .unwrap_or_else(|| self.document_dir.clone()),
            export: self.export.merge(&overlay.export),
            keys: self.keys.clone(),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional directory holding a `.wbsed.toml`
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(dir) = project_dir {
            current = current.load_local(dir)?;
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        Ok(current)
    }

    /// Merge `<dir>/.wbsed.toml` onto self, if present.
    pub fn load_local(&self, dir: &Path) -> Result<Self, ApplicationError> {
        let local_path = local_config_path(dir);
        if !local_path.exists() {
            return Ok(self.clone());
        }
        let raw = load_raw_settings(&local_path)?;
        let mut merged = self.merge_with(&raw);
        if raw.document_dir.as_ref().is_some_and(|d| d.is_relative()) {
            merged.document_dir = dir.join(&merged.document_dir);
        }
        Ok(merged)
    }

    /// Apply WBSED_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("WBSED").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("root_name") {
            settings.root_name = val;
        }
        if let Ok(val) = config.get_string("new_node_name") {
            settings.new_node_name = val;
        }
        if let Ok(val) = config.get_string("untitled_prefix") {
            settings.untitled_prefix = val;
        }
        if let Ok(val) = config.get_string("file_extension") {
            settings.file_extension = val;
        }
        if let Ok(val) = config.get_string("document_dir") {
            settings.document_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("export.indent_width") {
            settings.export.indent_width = val.parse().map_err(|_| ApplicationError::Config {
                message: format!("WBSED_EXPORT__INDENT_WIDTH is not a number: {val}"),
            })?;
        }
        if let Ok(val) = config.get_string("export.format") {
            settings.export.format = val.parse()?;
        }
        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# wbsed configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/wbsed/wbsed.toml
#   Local:  <project>/.wbsed.toml
#   Env:    WBSED_* environment variables (WBSED_EXPORT__INDENT_WIDTH=4)

# Root name of new documents
# root_name = "WBS"

# Name of nodes created by add-child / add-sibling
# new_node_name = "New Node"

# Untitled documents are named <untitled_prefix><n>.<file_extension>
# untitled_prefix = "untitled"
# file_extension = "wbs"
# document_dir = "~/plans"

[export]
# indent_width = 2
# format = "text"   # or "csv"

[keys]
# "alt+up" = "shift-backward"
# "alt+down" = "shift-forward"
# "alt+left" = "shift-out"
# "alt+right" = "shift-in"
# "delete" = "delete-subtree"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
