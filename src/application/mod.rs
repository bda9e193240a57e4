//! Application layer: services and use cases
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod export;
pub mod keymap;
pub mod projection;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use export::ExportFormat;
pub use keymap::{KeyCommand, KeyMap};
pub use projection::{render_row, ClickModifiers, Projection, RowDescriptor, COLUMNS};
