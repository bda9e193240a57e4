//! Document persistence service
//!
//! Reads and writes `.wbs` JSON documents and flat exports through the
//! [`FileSystem`] boundary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::export::{export, ExportFormat};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{DocumentFile, WbsTree, FORMAT_VERSION};
use crate::infrastructure::traits::FileSystem;

/// Service for loading, saving and exporting documents.
pub struct PersistenceService {
    fs: Arc<dyn FileSystem>,
}

impl PersistenceService {
    /// Create a new persistence service.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Load a document. Any read, parse or validation failure yields an
    /// error and no tree.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<WbsTree> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read document", path)?;
        let file: DocumentFile =
            serde_json::from_str(&content).map_err(|e| ApplicationError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if file.version != FORMAT_VERSION {
            return Err(ApplicationError::UnsupportedVersion {
                path: path.to_path_buf(),
                version: file.version,
            });
        }
        let tree = file.into_tree()?;
        debug!("load: {} nodes from {}", tree.len(), path.display());
        Ok(tree)
    }

    /// Save a document and clear its dirty flag.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn save(&self, tree: &mut WbsTree, path: &Path) -> ApplicationResult<()> {
        let file = DocumentFile::from_tree(tree);
        let mut content =
            serde_json::to_string_pretty(&file).map_err(|e| ApplicationError::OperationFailed {
                context: format!("serialize document: {}", path.display()),
                source: Box::new(e),
            })?;
        content.push('\n');
        self.fs
            .write(path, &content)
            .with_path_context("write document", path)?;
        tree.clear_modified();
        debug!("save: {}", path.display());
        Ok(())
    }

    /// Write a flat export; the document's dirty flag is untouched.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn export(
        &self,
        tree: &mut WbsTree,
        path: &Path,
        format: ExportFormat,
        indent_width: usize,
    ) -> ApplicationResult<()> {
        let content = export(tree, format, indent_width);
        self.fs
            .write(path, &content)
            .with_path_context("write export", path)?;
        debug!("export: {} as {}", path.display(), format);
        Ok(())
    }

    /// First `<dir>/<prefix><n>.<ext>` with `n >= start` that does not exist.
    /// Returns the path and the number used.
    pub fn untitled_path(&self, dir: &Path, prefix: &str, ext: &str, start: u32) -> (PathBuf, u32) {
        let mut n = start;
        loop {
            let candidate = dir.join(format!("{prefix}{n}.{ext}"));
            if !self.fs.exists(&candidate) {
                return (candidate, n);
            }
            n += 1;
        }
    }
}
