//! Typed node paths.

use crate::constants::ROOT_NAME;
use crate::error::SceneError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Location of a node as the ordered names from the root down to it.
///
/// The root is the empty path. A path names a node's *current* location;
/// renaming a node (or any ancestor) changes its path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    /// The root path (`game`).
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from name segments, root first.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the dotted display form (`game.Workspace.Part1`).
    ///
    /// The leading `game` segment is optional, and `game` or an empty string
    /// both name the root.
    ///
    /// # Errors
    /// Returns [`SceneError::InvalidOperation`] when a segment is empty.
    pub fn parse(raw: &str) -> Result<Self, SceneError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == ROOT_NAME {
            return Ok(Self::root());
        }
        let body = trimmed
            .strip_prefix(ROOT_NAME)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(trimmed);
        let mut segments = Vec::new();
        for segment in body.split('.') {
            if segment.is_empty() {
                return Err(SceneError::InvalidOperation(format!(
                    "path '{}' contains an empty segment",
                    raw
                )));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments below the root (services sit at depth 1).
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Path with the last segment removed, or `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        let (_, parent) = self.segments.split_last()?;
        Some(Self {
            segments: parent.to_vec(),
        })
    }

    /// Path of a direct child named `name`.
    pub fn child(&self, name: &str) -> NodePath {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Sibling path that differs only in the last segment.
    pub fn with_name(&self, name: &str) -> Option<NodePath> {
        self.parent().map(|parent| parent.child(name))
    }

    /// `true` when `self` equals `prefix` or lies underneath it.
    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Swap the `from` prefix for `to`.
    ///
    /// # Returns
    /// The rewritten path, or `None` when `self` is not at or under `from`.
    pub fn rebase(&self, from: &NodePath, to: &NodePath) -> Option<NodePath> {
        let rest = self.segments.strip_prefix(from.segments.as_slice())?;
        let mut segments = to.segments.clone();
        segments.extend(rest.iter().cloned());
        Some(Self { segments })
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT_NAME)?;
        for segment in &self.segments {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::NodePath;

    #[test]
    fn parse_accepts_prefixed_and_bare_forms() {
        let prefixed = NodePath::parse("game.Workspace.Part1").expect("parse");
        let bare = NodePath::parse("Workspace.Part1").expect("parse");
        assert_eq!(prefixed, bare);
        assert_eq!(prefixed.segments(), ["Workspace", "Part1"]);
        assert_eq!(prefixed.to_string(), "game.Workspace.Part1");
        assert!(NodePath::parse("game").expect("root").is_root());
        assert!(NodePath::parse("  ").expect("root").is_root());
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert!(NodePath::parse("game..Part").is_err());
        assert!(NodePath::parse("Workspace.").is_err());
    }

    #[test]
    fn parent_and_child_are_inverse() {
        let path = NodePath::from_segments(["Workspace", "Model1", "Part2"]);
        let parent = path.parent().expect("parent");
        assert_eq!(parent.child("Part2"), path);
        assert_eq!(path.name(), Some("Part2"));
        assert_eq!(path.depth(), 3);
        assert!(NodePath::root().parent().is_none());
        assert!(NodePath::root().name().is_none());
    }

    #[test]
    fn rebase_rewrites_prefix_only_for_descendants() {
        let from = NodePath::from_segments(["Workspace", "Model1"]);
        let to = NodePath::from_segments(["Workspace", "Car"]);
        let inner = from.child("Script1");

        assert_eq!(inner.rebase(&from, &to), Some(to.child("Script1")));
        assert_eq!(from.rebase(&from, &to), Some(to.clone()));

        let sibling = NodePath::from_segments(["Workspace", "Model10"]);
        assert_eq!(sibling.rebase(&from, &to), None);
        assert!(!sibling.starts_with(&from));
    }
}
