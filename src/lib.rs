//! wbsed: work breakdown structure editor
//!
//! Layers, innermost first:
//! - [`domain`]: the WBS tree, edit operations and duration roll-up
//! - [`application`]: table projection, key bindings, exports and the
//!   open-document session
//! - [`infrastructure`]: filesystem and prompt boundaries, service wiring
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
