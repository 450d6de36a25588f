//! Selection and rename-draft state machine.

use crate::error::SceneError;
use crate::models::{Action, Direction, Effect, NodeClass, NodePath};
use crate::tree::Tree;
use serde::Serialize;

/// Explorer selection state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SelectionState {
    #[default]
    Idle,
    Selected {
        path: NodePath,
    },
    Renaming {
        path: NodePath,
        draft: String,
    },
}

impl SelectionState {
    /// Selected path in either the `Selected` or `Renaming` state.
    pub fn path(&self) -> Option<&NodePath> {
        match self {
            Self::Idle => None,
            Self::Selected { path } | Self::Renaming { path, .. } => Some(path),
        }
    }

    pub fn is_renaming(&self) -> bool {
        matches!(self, Self::Renaming { .. })
    }

    /// Handle a click on `path`.
    ///
    /// Clicking the already-selected node of a renameable class starts a
    /// rename; any other click selects.
    ///
    /// # Errors
    /// Returns [`SceneError::InvalidOperation`] for the root.
    pub fn select(&mut self, path: &NodePath, class: NodeClass) -> Result<(), SceneError> {
        if path.is_root() {
            return Err(SceneError::InvalidOperation(
                "the root cannot be selected".to_string(),
            ));
        }
        let reselect = matches!(&*self, Self::Selected { path: current } if current == path);
        *self = if reselect && class.is_renameable() {
            Self::Renaming {
                path: path.clone(),
                draft: path.name().unwrap_or_default().to_string(),
            }
        } else {
            Self::Selected { path: path.clone() }
        };
        Ok(())
    }

    /// Start renaming the current selection.
    ///
    /// # Errors
    /// Returns [`SceneError::InvalidOperation`] when nothing is selected or
    /// `class` is not renameable.
    pub fn begin_rename(&mut self, class: NodeClass) -> Result<(), SceneError> {
        let Self::Selected { path } = self else {
            return Err(SceneError::InvalidOperation(
                "select a node before renaming".to_string(),
            ));
        };
        if !class.is_renameable() {
            return Err(SceneError::InvalidOperation(format!(
                "{} nodes cannot be renamed",
                class
            )));
        }
        let path = path.clone();
        let draft = path.name().unwrap_or_default().to_string();
        *self = Self::Renaming { path, draft };
        Ok(())
    }

    /// Replace the in-progress rename text.
    ///
    /// # Errors
    /// Returns [`SceneError::InvalidOperation`] outside the `Renaming` state.
    pub fn set_draft(&mut self, text: impl Into<String>) -> Result<(), SceneError> {
        match self {
            Self::Renaming { draft, .. } => {
                *draft = text.into();
                Ok(())
            }
            _ => Err(SceneError::InvalidOperation(
                "no rename in progress".to_string(),
            )),
        }
    }

    /// Leave `Renaming` without changes.
    ///
    /// # Returns
    /// `true` when a rename was cancelled.
    pub fn cancel(&mut self) -> bool {
        let Self::Renaming { path, .. } = self else {
            return false;
        };
        *self = Self::Selected { path: path.clone() };
        true
    }

    pub fn clear(&mut self) {
        *self = Self::Idle;
    }

    /// Follow `action` applied in `direction`: removals under the selection
    /// clear it and renames move it. Anything left dangling is cleared.
    ///
    /// # Returns
    /// `true` when the state changed.
    pub fn reconcile(&mut self, tree: &Tree, action: &Action, direction: Direction) -> bool {
        let before = self.clone();
        match action.effect(direction) {
            Effect::Remove { path: removed } => {
                if self.path().is_some_and(|path| path.starts_with(removed)) {
                    self.clear();
                }
            }
            Effect::Rename { from, to } => {
                if let Some(rebased) = self.path().and_then(|path| path.rebase(&from, &to)) {
                    match self {
                        Self::Selected { path } | Self::Renaming { path, .. } => *path = rebased,
                        Self::Idle => {}
                    }
                }
            }
            Effect::Insert { .. } => {}
        }
        self.retain_valid(tree);
        *self != before
    }

    /// Clear the selection when its path no longer resolves.
    pub fn retain_valid(&mut self, tree: &Tree) {
        if self.path().is_some_and(|path| !tree.contains(path)) {
            self.clear();
        }
    }
}
