//! Path-addressed scene tree store.

use crate::error::SceneError;
use crate::models::{Action, Direction, Effect, Node, NodeClass, NodeKind, NodePath};
use crate::naming::is_canonical_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One row of a child listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildEntry {
    pub name: String,
    pub class: NodeClass,
    pub path: NodePath,
}

/// A Script node located in the tree, copied out for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRef {
    pub path: NodePath,
    pub name: String,
    pub source: String,
}

/// The live node graph, rooted at a `DataModel` node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree {
    root: Node,
}

impl Default for Tree {
    /// `game` with the three standard services.
    fn default() -> Self {
        let mut root = Node::data_model();
        for kind in [
            NodeKind::Workspace,
            NodeKind::ServerScriptService,
            NodeKind::ReplicatedStorage,
        ] {
            let service = Node::new(kind.class().as_str(), kind);
            if let Some(children) = root.children_mut() {
                children.insert(service.name.clone(), service);
            }
        }
        Self { root }
    }
}

impl Tree {
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Follow `path` from the root through each children map.
    ///
    /// # Errors
    /// Returns [`SceneError::PathNotFound`] when any segment is missing.
    pub fn resolve(&self, path: &NodePath) -> Result<&Node, SceneError> {
        let mut current = &self.root;
        for segment in path.segments() {
            current = current
                .child(segment)
                .ok_or_else(|| SceneError::PathNotFound(path.clone()))?;
        }
        Ok(current)
    }

    pub(crate) fn resolve_mut(&mut self, path: &NodePath) -> Result<&mut Node, SceneError> {
        let mut current = &mut self.root;
        for segment in path.segments() {
            current = current
                .child_mut(segment)
                .ok_or_else(|| SceneError::PathNotFound(path.clone()))?;
        }
        Ok(current)
    }

    /// Resolve the parent of `path`.
    ///
    /// # Errors
    /// Returns [`SceneError::PathNotFound`] for the root or a missing parent.
    pub fn parent_of(&self, path: &NodePath) -> Result<&Node, SceneError> {
        let parent = path
            .parent()
            .ok_or_else(|| SceneError::PathNotFound(path.clone()))?;
        self.resolve(&parent)
    }

    pub fn contains(&self, path: &NodePath) -> bool {
        self.resolve(path).is_ok()
    }

    /// List the direct children of `path` in name order.
    ///
    /// Leaf nodes list as empty.
    ///
    /// # Errors
    /// Returns [`SceneError::PathNotFound`] when `path` does not resolve.
    pub fn list_children(&self, path: &NodePath) -> Result<Vec<ChildEntry>, SceneError> {
        let node = self.resolve(path)?;
        Ok(node
            .children()
            .map(|children| {
                children
                    .values()
                    .map(|child| ChildEntry {
                        name: child.name.clone(),
                        class: child.class(),
                        path: path.child(&child.name),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Every node in pre-order (parents before children, siblings by name).
    pub fn walk(&self) -> Vec<(NodePath, &Node)> {
        let mut out = Vec::new();
        let mut stack = vec![(NodePath::root(), &self.root)];
        while let Some((path, node)) = stack.pop() {
            if let Some(children) = node.children() {
                for child in children.values().rev() {
                    stack.push((path.child(&child.name), child));
                }
            }
            out.push((path, node));
        }
        out
    }

    /// Collect every Script at or below `path`, in pre-order.
    ///
    /// # Errors
    /// Returns [`SceneError::PathNotFound`] when `path` does not resolve.
    pub fn scripts_under(&self, path: &NodePath) -> Result<Vec<ScriptRef>, SceneError> {
        self.resolve(path)?;
        Ok(self
            .walk()
            .into_iter()
            .filter(|(node_path, _)| node_path.starts_with(path))
            .filter_map(|(node_path, node)| {
                node.source().map(|source| ScriptRef {
                    name: node.name.clone(),
                    source: source.to_string(),
                    path: node_path,
                })
            })
            .collect())
    }

    /// Apply the structural edit of `action` in `direction`.
    ///
    /// All checks run before the single mutation, so a failed apply leaves
    /// the tree untouched.
    ///
    /// # Errors
    /// - [`SceneError::PathNotFound`] when the parent or the target is missing.
    /// - [`SceneError::InvalidOperation`] when the parent cannot hold children
    ///   or an inserted subtree is malformed.
    /// - [`SceneError::NameCollision`] when the inserted or renamed-to name is
    ///   already used by a sibling.
    pub fn apply(&mut self, action: &Action, direction: Direction) -> Result<(), SceneError> {
        match action.effect(direction) {
            Effect::Insert { path, node } => self.insert_at(path, node)?,
            Effect::Remove { path } => self.remove_at(path)?,
            Effect::Rename { from, to } => self.rename_at(&from, &to)?,
        }
        debug!(action = %action, ?direction, "applied action");
        Ok(())
    }

    fn split(path: &NodePath) -> Result<(NodePath, &str), SceneError> {
        match (path.parent(), path.name()) {
            (Some(parent), Some(name)) => Ok((parent, name)),
            _ => Err(SceneError::InvalidOperation(
                "the root itself cannot be edited".to_string(),
            )),
        }
    }

    fn container_mut<'a>(
        &'a mut self,
        parent_path: &NodePath,
    ) -> Result<&'a mut BTreeMap<String, Node>, SceneError> {
        let parent = self.resolve_mut(parent_path)?;
        let class = parent.class();
        parent.children_mut().ok_or_else(|| {
            SceneError::InvalidOperation(format!(
                "{} at {} cannot contain children",
                class, parent_path
            ))
        })
    }

    fn insert_at(&mut self, path: &NodePath, node: &Node) -> Result<(), SceneError> {
        let (parent_path, name) = Self::split(path)?;
        if node.name != name {
            return Err(SceneError::InvalidOperation(format!(
                "subtree named '{}' cannot be inserted at {}",
                node.name, path
            )));
        }
        validate_subtree(node, path)?;
        let children = self.container_mut(&parent_path)?;
        if children.contains_key(name) {
            return Err(SceneError::NameCollision {
                parent: parent_path,
                name: name.to_string(),
            });
        }
        children.insert(name.to_string(), node.clone());
        Ok(())
    }

    fn remove_at(&mut self, path: &NodePath) -> Result<(), SceneError> {
        let (parent_path, name) = Self::split(path)?;
        let children = self.container_mut(&parent_path)?;
        children
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SceneError::PathNotFound(path.clone()))
    }

    fn rename_at(&mut self, from: &NodePath, to: &NodePath) -> Result<(), SceneError> {
        let (parent_path, old_name) = Self::split(from)?;
        let (_, new_name) = Self::split(to)?;
        let children = self.container_mut(&parent_path)?;
        if !children.contains_key(old_name) {
            return Err(SceneError::PathNotFound(from.clone()));
        }
        if old_name == new_name {
            return Ok(());
        }
        if children.contains_key(new_name) {
            return Err(SceneError::NameCollision {
                parent: parent_path,
                name: new_name.to_string(),
            });
        }
        if let Some(mut node) = children.remove(old_name) {
            node.name = new_name.to_string();
            children.insert(new_name.to_string(), node);
        }
        Ok(())
    }

    /// Overwrite the stored source of the Script at `path`.
    ///
    /// Not recorded in history.
    ///
    /// # Errors
    /// Returns [`SceneError::PathNotFound`] or [`SceneError::NotAScript`].
    pub(crate) fn set_script_source(
        &mut self,
        path: &NodePath,
        text: &str,
    ) -> Result<(), SceneError> {
        match &mut self.resolve_mut(path)?.kind {
            NodeKind::Script { source } => {
                source.clear();
                source.push_str(text);
                Ok(())
            }
            _ => Err(SceneError::NotAScript(path.clone())),
        }
    }

    /// Check the structural invariants of the whole tree.
    ///
    /// # Errors
    /// Returns [`SceneError::InvalidSnapshot`] describing the first violation.
    pub fn validate(&self) -> Result<(), SceneError> {
        if self.root.class() != NodeClass::DataModel {
            return Err(SceneError::InvalidSnapshot(format!(
                "root must be a DataModel, found {}",
                self.root.class()
            )));
        }
        validate_subtree(&self.root, &NodePath::root())
            .map_err(|err| SceneError::InvalidSnapshot(err.to_string()))
    }

    /// Deep copy for an external reader; edits to it never reach `self`.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot { tree: self.clone() }
    }
}

fn validate_subtree(node: &Node, path: &NodePath) -> Result<(), SceneError> {
    if !is_canonical_name(&node.name) {
        return Err(SceneError::InvalidOperation(format!(
            "node under {} has invalid name '{}'",
            path.parent().unwrap_or_else(NodePath::root),
            node.name
        )));
    }
    let class = node.class();
    if !path.is_root() && class == NodeClass::DataModel {
        return Err(SceneError::InvalidOperation(format!(
            "DataModel may only appear at the root, found at {}",
            path
        )));
    }
    if class.is_service() && path.depth() != 1 {
        return Err(SceneError::InvalidOperation(format!(
            "{} may only sit directly under the root, found at {}",
            class, path
        )));
    }
    match (node.children(), class.can_contain()) {
        (Some(children), true) => {
            for (key, child) in children {
                if key != &child.name {
                    return Err(SceneError::InvalidOperation(format!(
                        "child keyed '{}' under {} is named '{}'",
                        key, path, child.name
                    )));
                }
                validate_subtree(child, &path.child(key))?;
            }
            Ok(())
        }
        (None, false) => Ok(()),
        (Some(_), false) => Err(SceneError::InvalidOperation(format!(
            "{} at {} cannot have children",
            class, path
        ))),
        (None, true) => Err(SceneError::InvalidOperation(format!(
            "{} at {} is missing its children map",
            class, path
        ))),
    }
}

/// Immutable deep copy of a [`Tree`] handed to the script interpreter.
///
/// A runner may edit its own copy through [`Snapshot::tree_mut`]; the copy is
/// only adopted by the session through an explicit import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    tree: Tree,
}

impl Snapshot {
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Encode as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns [`SceneError::Serialization`] when encoding fails.
    pub fn to_json_pretty(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode and validate a JSON snapshot.
    ///
    /// # Errors
    /// Returns [`SceneError::Serialization`] for malformed JSON and
    /// [`SceneError::InvalidSnapshot`] for a structurally invalid tree.
    pub fn from_json(raw: &str) -> Result<Self, SceneError> {
        let snapshot: Self = serde_json::from_str(raw)?;
        snapshot.tree.validate()?;
        Ok(snapshot)
    }
}
