//! Data models for scene nodes, paths, and recorded actions.

/// Recorded structural edits and their inverses.
pub mod action;
/// Scene node and class definitions.
pub mod node;
/// Typed node paths.
pub mod path;


pub use action::{Action, ActionKind, Direction, Effect};
pub use node::{Node, NodeClass, NodeKind};
pub use path::NodePath;
