//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Prompter)
//! but are themselves concrete structs, not traits.

mod persistence;
mod session;

pub use persistence::PersistenceService;
pub use session::{Document, DocumentId, Session, SessionEvent};
