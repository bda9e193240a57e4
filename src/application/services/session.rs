//! Open-document registry
//!
//! A session owns every open document together with its projection and
//! backing file. It routes edits through the [`EditEngine`], keeps the
//! projection in sync and reports title changes to its subscribers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::export::{export, ExportFormat};
use crate::application::keymap::KeyMap;
use crate::application::projection::{ClickModifiers, Projection, RowDescriptor};
use crate::application::services::PersistenceService;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{
    EditEngine, EditObserver, EditOp, FieldEdit, FieldStatus, NodeId, WbsTree,
};
use crate::infrastructure::traits::{Confirmation, FileSystem, Prompter};

/// Session-local handle of an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u32);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Opened(DocumentId),
    Closed(DocumentId),
    Focused(DocumentId),
    TitleChanged { document: DocumentId, title: String },
}

/// An open document: tree, view state and backing file.
#[derive(Debug)]
pub struct Document {
    tree: WbsTree,
    projection: Projection,
    path: PathBuf,
    untitled: bool,
    last_title: String,
}

impl Document {
    fn new(mut tree: WbsTree, path: PathBuf, untitled: bool) -> Self {
        let projection = Projection::new(&mut tree);
        Self {
            tree,
            projection,
            path,
            untitled,
            last_title: String::new(),
        }
    }

    pub fn tree(&self) -> &WbsTree {
        &self.tree
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Created by `new` and never saved under a chosen name.
    pub fn is_untitled(&self) -> bool {
        self.untitled
    }

    pub fn is_saved(&self) -> bool {
        !self.tree.is_modified()
    }

    /// File name, with `*` appended while there are unsaved changes.
    pub fn title(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        if self.is_saved() {
            name
        } else {
            format!("{name}*")
        }
    }

    /// Visible rows rendered for display.
    pub fn rows(&self) -> Vec<RowDescriptor> {
        self.projection.render(&self.tree)
    }
}

type Listener = Box<dyn Fn(&SessionEvent)>;

pub struct Session {
    settings: Arc<Settings>,
    persistence: PersistenceService,
    prompter: Arc<dyn Prompter>,
    engine: EditEngine,
    keymap: KeyMap,
    documents: BTreeMap<DocumentId, Document>,
    next_id: u32,
    untitled_counter: u32,
    focused: Option<DocumentId>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("documents", &self.documents.keys().collect::<Vec<_>>())
            .field("focused", &self.focused)
            .finish()
    }
}

impl Session {
    pub fn new(
        settings: Arc<Settings>,
        fs: Arc<dyn FileSystem>,
        prompter: Arc<dyn Prompter>,
    ) -> ApplicationResult<Self> {
        let keymap = KeyMap::with_overrides(&settings.keys)?;
        Ok(Self {
            engine: EditEngine::new(settings.new_node_name.as_str()),
            persistence: PersistenceService::new(fs),
            settings,
            prompter,
            keymap,
            documents: BTreeMap::new(),
            next_id: 1,
            untitled_counter: 0,
            focused: None,
            listeners: Vec::new(),
        })
    }

    pub fn subscribe(&mut self, listener: impl Fn(&SessionEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Observes every edit of every document.
    pub fn on_edit(&mut self, observer: impl EditObserver + 'static) {
        self.engine.subscribe(observer);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    fn emit(&self, event: SessionEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }

    /// Emits `TitleChanged` when the title differs from the last one reported.
    fn sync_title(&mut self, doc: DocumentId) {
        let Some(document) = self.documents.get_mut(&doc) else {
            return;
        };
        let title = document.title();
        if title == document.last_title {
            return;
        }
        document.last_title = title.clone();
        self.emit(SessionEvent::TitleChanged {
            document: doc,
            title,
        });
    }

    fn register(&mut self, document: Document) -> DocumentId {
        let doc = DocumentId(self.next_id);
        self.next_id += 1;
        info!("opened {}: {}", doc, document.path.display());
        self.documents.insert(doc, document);
        self.emit(SessionEvent::Opened(doc));
        self.sync_title(doc);
        self.focused = Some(doc);
        self.emit(SessionEvent::Focused(doc));
        doc
    }

    pub fn document(&self, doc: DocumentId) -> ApplicationResult<&Document> {
        self.documents
            .get(&doc)
            .ok_or(ApplicationError::DocumentNotFound(doc))
    }

    fn document_mut(&mut self, doc: DocumentId) -> ApplicationResult<&mut Document> {
        self.documents
            .get_mut(&doc)
            .ok_or(ApplicationError::DocumentNotFound(doc))
    }

    pub fn documents(&self) -> impl Iterator<Item = (DocumentId, &Document)> {
        self.documents.iter().map(|(id, d)| (*id, d))
    }

    /// Creates an untitled document named after the first free
    /// `<prefix><n>.<ext>` in the document directory.
    #[instrument(level = "debug", skip(self))]
    pub fn new_document(&mut self) -> DocumentId {
        let (path, n) = self.persistence.untitled_path(
            &self.settings.document_dir,
            &self.settings.untitled_prefix,
            &self.settings.file_extension,
            self.untitled_counter,
        );
        self.untitled_counter = n + 1;
        let tree = WbsTree::new(self.settings.root_name.as_str());
        self.register(Document::new(tree, path, true))
    }

    /// Opens a file; a file that is already open is focused instead.
    /// A failed load registers nothing.
    #[instrument(level = "debug", skip(self))]
    pub fn open(&mut self, path: &Path) -> ApplicationResult<DocumentId> {
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        if let Some(doc) = self
            .documents
            .iter()
            .find(|(_, d)| d.path == path)
            .map(|(id, _)| *id)
        {
            debug!("{} already open as {}", path.display(), doc);
            self.focus(doc)?;
            return Ok(doc);
        }
        let tree = self.persistence.load(&path)?;
        Ok(self.register(Document::new(tree, path, false)))
    }

    /// Saves to the backing file. Untitled documents need [`Self::save_as`].
    #[instrument(level = "debug", skip(self))]
    pub fn save(&mut self, doc: DocumentId) -> ApplicationResult<()> {
        let document = self
            .documents
            .get_mut(&doc)
            .ok_or(ApplicationError::DocumentNotFound(doc))?;
        if document.untitled {
            return Err(ApplicationError::NoBackingFile(document.title()));
        }
        self.persistence.save(&mut document.tree, &document.path)?;
        self.sync_title(doc);
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn save_as(&mut self, doc: DocumentId, path: &Path) -> ApplicationResult<()> {
        let document = self
            .documents
            .get_mut(&doc)
            .ok_or(ApplicationError::DocumentNotFound(doc))?;
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        self.persistence.save(&mut document.tree, &path)?;
        document.path = path;
        document.untitled = false;
        self.sync_title(doc);
        Ok(())
    }

    /// Closes a document, asking first when it has unsaved changes.
    /// Returns `false` when the user cancelled. Accepting the save writes an
    /// untitled document to its untitled path.
    #[instrument(level = "debug", skip(self))]
    pub fn close(&mut self, doc: DocumentId) -> ApplicationResult<bool> {
        let document = self.document(doc)?;
        if !document.is_saved() {
            let question = format!("Save changes to {}?", document.path.display());
            let path = document.path.clone();
            match self.prompter.confirm(&question) {
                Confirmation::Yes => self.save_as(doc, &path)?,
                Confirmation::No => {}
                Confirmation::Cancel => return Ok(false),
            }
        }
        self.documents.remove(&doc);
        if self.focused == Some(doc) {
            self.focused = self.documents.keys().next_back().copied();
        }
        info!("closed {}", doc);
        self.emit(SessionEvent::Closed(doc));
        if let Some(next) = self.focused {
            self.emit(SessionEvent::Focused(next));
        }
        Ok(true)
    }

    pub fn title(&self, doc: DocumentId) -> ApplicationResult<String> {
        Ok(self.document(doc)?.title())
    }

    pub fn is_saved(&self, doc: DocumentId) -> ApplicationResult<bool> {
        Ok(self.document(doc)?.is_saved())
    }

    pub fn focused(&self) -> Option<DocumentId> {
        self.focused
    }

    pub fn focus(&mut self, doc: DocumentId) -> ApplicationResult<()> {
        self.document(doc)?;
        self.focused = Some(doc);
        self.emit(SessionEvent::Focused(doc));
        Ok(())
    }

    /// Whether `op` would change anything; for disabling menu entries.
    pub fn is_enabled(&self, doc: DocumentId, op: EditOp, node: NodeId) -> ApplicationResult<bool> {
        let document = self.document(doc)?;
        Ok(self.engine.is_enabled(&document.tree, op, node))
    }

    /// Runs a structural edit. Destructive edits are confirmed first; any
    /// answer but yes leaves the document untouched. Returns the node that is
    /// selected afterwards.
    #[instrument(level = "debug", skip(self))]
    pub fn apply(
        &mut self,
        doc: DocumentId,
        op: EditOp,
        node: NodeId,
    ) -> ApplicationResult<Option<NodeId>> {
        self.document(doc)?;
        if op.is_destructive() && !self.confirm_destructive(op) {
            debug!("{} declined", op);
            return Ok(None);
        }
        let document = self
            .documents
            .get_mut(&doc)
            .ok_or(ApplicationError::DocumentNotFound(doc))?;
        let focus = self.engine.apply(&mut document.tree, op, node)?;
        document.projection.refresh(&mut document.tree);
        if let Some(focus) = focus {
            document.projection.select_only(focus);
        }
        self.sync_title(doc);
        Ok(focus)
    }

    fn confirm_destructive(&self, op: EditOp) -> bool {
        let question = format!("{}: this cannot be undone. Continue?", op.label());
        self.prompter.confirm(&question) == Confirmation::Yes
    }

    /// Moves `node` below `new_parent` (appended last).
    #[instrument(level = "debug", skip(self))]
    pub fn reparent(&mut self, doc: DocumentId, node: NodeId, new_parent: NodeId) -> ApplicationResult<bool> {
        let document = self
            .documents
            .get_mut(&doc)
            .ok_or(ApplicationError::DocumentNotFound(doc))?;
        let moved = self.engine.reparent(&mut document.tree, node, new_parent)?;
        document.projection.refresh(&mut document.tree);
        self.sync_title(doc);
        Ok(moved)
    }

    /// Copies the subtree at `node` below `target`.
    #[instrument(level = "debug", skip(self))]
    pub fn deep_copy(&mut self, doc: DocumentId, node: NodeId, target: NodeId) -> ApplicationResult<NodeId> {
        let document = self
            .documents
            .get_mut(&doc)
            .ok_or(ApplicationError::DocumentNotFound(doc))?;
        let copy = self.engine.deep_copy(&mut document.tree, node, target)?;
        document.projection.refresh(&mut document.tree);
        document.projection.select_only(copy);
        self.sync_title(doc);
        Ok(copy)
    }

    /// Assigns one field. Rejected predecessor text stays flagged on the row
    /// until a valid value is entered.
    #[instrument(level = "debug", skip(self))]
    pub fn set_field(&mut self, doc: DocumentId, node: NodeId, edit: FieldEdit) -> ApplicationResult<FieldStatus> {
        let document = self
            .documents
            .get_mut(&doc)
            .ok_or(ApplicationError::DocumentNotFound(doc))?;
        let predecessor_text = match &edit {
            FieldEdit::Predecessors(text) => Some(text.clone()),
            _ => None,
        };
        let status = self.engine.set_field(&mut document.tree, node, edit)?;
        if let Some(text) = predecessor_text {
            match status {
                FieldStatus::Valid => document.projection.clear_predecessor_flag(node),
                FieldStatus::Invalid => document.projection.flag_predecessors(node, text),
            }
        }
        document.projection.refresh(&mut document.tree);
        self.sync_title(doc);
        Ok(status)
    }

    pub fn click(&mut self, doc: DocumentId, node: NodeId, modifiers: ClickModifiers) -> ApplicationResult<()> {
        self.document_mut(doc)?.projection.click(node, modifiers);
        Ok(())
    }

    /// Returns the context-menu target, if exactly one node is selected.
    pub fn right_click(&mut self, doc: DocumentId, node: NodeId) -> ApplicationResult<Option<NodeId>> {
        Ok(self.document_mut(doc)?.projection.right_click(node))
    }

    pub fn set_scroll_offset(&mut self, doc: DocumentId, offset: usize) -> ApplicationResult<()> {
        self.document_mut(doc)?.projection.set_scroll_offset(offset);
        Ok(())
    }

    /// Expands or collapses a node; not a document modification.
    pub fn toggle_expanded(&mut self, doc: DocumentId, node: NodeId) -> ApplicationResult<bool> {
        let document = self.document_mut(doc)?;
        Ok(document.projection.toggle_expanded(&mut document.tree, node)?)
    }

    /// Runs the command bound to `chord` on the single selected node.
    ///
    /// Returns `false` when the chord is unbound, the selection is not
    /// exactly one node, or nothing changed. The scroll offset is restored
    /// and the node reselected if it still exists.
    #[instrument(level = "debug", skip(self))]
    pub fn handle_key(&mut self, doc: DocumentId, chord: &str) -> ApplicationResult<bool> {
        let Some(command) = self.keymap.lookup(chord) else {
            debug!("unbound chord {:?}", chord);
            return Ok(false);
        };
        let document = self.document(doc)?;
        let Some(node) = document.projection.single_selection() else {
            return Ok(false);
        };
        let offset = document.projection.scroll_offset();

        let changed = self.apply(doc, command.op(), node)?.is_some();

        let document = self.document_mut(doc)?;
        if document.tree.contains(node) {
            document.projection.select_only(node);
        } else {
            document.projection.clear_selection();
        }
        document.projection.set_scroll_offset(offset);
        Ok(changed)
    }

    /// Writes a flat export using the configured indent width.
    #[instrument(level = "debug", skip(self))]
    pub fn export(&mut self, doc: DocumentId, path: &Path, format: ExportFormat) -> ApplicationResult<()> {
        let indent_width = self.settings.export.indent_width;
        let document = self
            .documents
            .get_mut(&doc)
            .ok_or(ApplicationError::DocumentNotFound(doc))?;
        self.persistence
            .export(&mut document.tree, path, format, indent_width)
    }

    /// Export content as a string, for printing.
    pub fn render_export(&mut self, doc: DocumentId, format: ExportFormat) -> ApplicationResult<String> {
        let indent_width = self.settings.export.indent_width;
        let document = self.document_mut(doc)?;
        Ok(export(&mut document.tree, format, indent_width))
    }
}
