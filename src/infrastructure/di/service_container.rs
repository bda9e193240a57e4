//! Service container for dependency injection
//!
//! Wires up sessions with their dependencies.

use std::sync::Arc;

use crate::application::services::Session;
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, Prompter, RealFileSystem, TerminalPrompter};
use crate::infrastructure::InfraResult;

/// Container holding the shared dependencies of all services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Confirmation dialogs
    pub prompter: Arc<dyn Prompter>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem), Arc::new(TerminalPrompter))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            prompter,
        }
    }

    /// A fresh session with no open documents.
    pub fn session(&self) -> InfraResult<Session> {
        Ok(Session::new(
            self.settings.clone(),
            self.fs.clone(),
            self.prompter.clone(),
        )?)
    }
}
