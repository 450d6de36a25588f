//! Error types for tree, history, and buffer operations.
use crate::models::path::NodePath;
use thiserror::Error;

/// Top-level scene error type.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Path not found: {0}")]
    PathNotFound(NodePath),

    #[error("An item named '{name}' already exists under {parent}")]
    NameCollision { parent: NodePath, name: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Not a script: {0}")]
    NotAScript(NodePath),

    #[error("Open buffer no longer resolves to a script: {0}")]
    BufferIntegrityViolation(NodePath),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Interpreter error: {0}")]
    Interpreter(String),
}

impl SceneError {
    /// Return `true` for conditions the user can correct (name clashes, bad
    /// targets, unreadable import files).
    ///
    /// # Returns
    /// `false` only for internal failures: buffer integrity violations and
    /// interpreter errors.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::PathNotFound(_)
                | Self::NameCollision { .. }
                | Self::InvalidOperation(_)
                | Self::NotAScript(_)
                | Self::InvalidSnapshot(_)
                | Self::Serialization(_)
        )
    }
}
