//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod aggregate;
pub mod arena;
pub mod builder;
pub mod edit;
pub mod entities;
pub mod error;
pub mod predecessors;

pub use aggregate::{
    format_hours, person_duration, recompute_durations, resource_multiplier, resource_status,
    PersonDuration, ResourceError,
};
pub use arena::{Ancestors, PostOrderIterator, TreeIterator, TreeNode, WbsTree};
pub use builder::{DocumentFile, NodeRecord, FORMAT_VERSION};
pub use edit::{EditEngine, EditEvent, EditKind, EditObserver, EditOp, Field, FieldEdit};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use predecessors::{parse_predecessor_text, render_predecessors, PredecessorError};
