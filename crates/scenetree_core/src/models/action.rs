//! Reversible structural edits.

use crate::models::{node::Node, path::NodePath};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way an [`Action`] is being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Inverse,
}

/// One recorded structural edit.
///
/// `path` is the segment list resolved when the action was built. For
/// `Rename` it is the node's path under `old_name`. `Add` and `Delete` own a
/// deep copy of the whole subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Add {
        path: NodePath,
        node: Node,
    },
    Delete {
        path: NodePath,
        node: Node,
    },
    Rename {
        path: NodePath,
        old_name: String,
        new_name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Add,
    Delete,
    Rename,
}

/// The concrete tree edit an action performs in a given direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect<'a> {
    Insert { path: &'a NodePath, node: &'a Node },
    Remove { path: &'a NodePath },
    Rename { from: NodePath, to: NodePath },
}

impl Action {
    /// Add `node` as a child of `parent`, keyed by the node's name.
    pub fn add(parent: &NodePath, node: Node) -> Self {
        Self::Add {
            path: parent.child(&node.name),
            node,
        }
    }

    /// Delete the node at `path`; `node` is the subtree captured before removal.
    pub fn delete(path: NodePath, node: Node) -> Self {
        Self::Delete { path, node }
    }

    /// Rename the node at `path` to `new_name`.
    ///
    /// # Returns
    /// `None` for the root path, which has no name to change.
    pub fn rename(path: NodePath, new_name: impl Into<String>) -> Option<Self> {
        let old_name = path.name()?.to_string();
        Some(Self::Rename {
            path,
            old_name,
            new_name: new_name.into(),
        })
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Add { .. } => ActionKind::Add,
            Self::Delete { .. } => ActionKind::Delete,
            Self::Rename { .. } => ActionKind::Rename,
        }
    }

    pub fn path(&self) -> &NodePath {
        match self {
            Self::Add { path, .. } | Self::Delete { path, .. } | Self::Rename { path, .. } => path,
        }
    }

    /// Resolve what this action does to the tree when applied in `direction`.
    pub fn effect(&self, direction: Direction) -> Effect<'_> {
        match (self, direction) {
            (Self::Add { path, node }, Direction::Forward)
            | (Self::Delete { path, node }, Direction::Inverse) => Effect::Insert { path, node },
            (Self::Add { path, .. }, Direction::Inverse)
            | (Self::Delete { path, .. }, Direction::Forward) => Effect::Remove { path },
            (
                Self::Rename {
                    path,
                    old_name,
                    new_name,
                },
                direction,
            ) => {
                let renamed = path.with_name(new_name).unwrap_or_default();
                match direction {
                    Direction::Forward => Effect::Rename {
                        from: path.clone(),
                        to: renamed,
                    },
                    Direction::Inverse => Effect::Rename {
                        from: renamed,
                        to: path.with_name(old_name).unwrap_or_default(),
                    },
                }
            }
        }
    }

    /// The action that undoes this one when applied forward.
    pub fn inverse(&self) -> Action {
        match self {
            Self::Add { path, node } => Self::Delete {
                path: path.clone(),
                node: node.clone(),
            },
            Self::Delete { path, node } => Self::Add {
                path: path.clone(),
                node: node.clone(),
            },
            Self::Rename {
                path,
                old_name,
                new_name,
            } => Self::Rename {
                path: path.with_name(new_name).unwrap_or_default(),
                old_name: new_name.clone(),
                new_name: old_name.clone(),
            },
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { path, node } => write!(f, "add {} {}", node.class(), path),
            Self::Delete { path, node } => write!(f, "delete {} {}", node.class(), path),
            Self::Rename {
                path,
                old_name,
                new_name,
            } => write!(f, "rename {} '{}' -> '{}'", path, old_name, new_name),
        }
    }
}
