//! Core domain library for SceneTree (scene model, history, buffers, selection).

/// Open script buffers bound to tree nodes.
pub mod buffers;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Scene error types.
pub mod error;
/// Undo/redo log.
pub mod history;
/// Node, path, and action models.
pub mod models;
/// Node naming helpers.
pub mod naming;
/// Script interpreter boundary.
pub mod runner;
/// Selection and rename-draft state.
pub mod selection;
/// Editing session orchestrating the other modules.
pub mod session;
/// Path-addressed scene tree store.
pub mod tree;

#[cfg(test)]
mod test_support;

pub use buffers::{BufferRegistry, OpenBuffer};
pub use config::Config;
pub use error::SceneError;
pub use history::{History, HistoryEntry, HistoryStatus};
pub use models::{Action, ActionKind, Direction, Node, NodeClass, NodeKind, NodePath};
pub use runner::{OutputKind, OutputLine, RunReport, ScriptFailure, ScriptInvocation, ScriptRunner};
pub use selection::SelectionState;
pub use session::{RenameOutcome, Session, SessionEvent};
pub use tree::{ChildEntry, Snapshot, Tree};
