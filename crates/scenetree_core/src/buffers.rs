//! Open script buffers bound to tree nodes by path.

use crate::error::SceneError;
use crate::models::{Action, Direction, Effect, NodePath};
use crate::tree::Tree;
use serde::Serialize;
use tracing::{debug, error};

/// Editable text for one open Script node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenBuffer {
    path: NodePath,
    display_name: String,
    text: String,
}

impl OpenBuffer {
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Buffer changes made while reconciling against a mutated tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Buffers dropped because their node was removed.
    pub closed: Vec<NodePath>,
    /// `(old, new)` paths of buffers that followed a rename.
    pub retargeted: Vec<(NodePath, NodePath)>,
    /// Buffers dropped by the integrity sweep.
    pub dropped: Vec<NodePath>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.closed.is_empty() && self.retargeted.is_empty() && self.dropped.is_empty()
    }
}

/// The set of open buffers (editor tabs) and which one is active.
///
/// Every buffer path resolves to a live Script once [`BufferRegistry::reconcile`]
/// or [`BufferRegistry::verify`] returns.
#[derive(Debug, Clone, Default)]
pub struct BufferRegistry {
    buffers: Vec<OpenBuffer>,
    active: Option<usize>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffers(&self) -> &[OpenBuffer] {
        &self.buffers
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&OpenBuffer> {
        self.buffers.get(self.active?)
    }

    fn index_of(&self, path: &NodePath) -> Option<usize> {
        self.buffers.iter().position(|buffer| &buffer.path == path)
    }

    pub fn get(&self, path: &NodePath) -> Option<&OpenBuffer> {
        self.buffers.iter().find(|buffer| &buffer.path == path)
    }

    pub fn text(&self, path: &NodePath) -> Option<&str> {
        self.get(path).map(OpenBuffer::text)
    }

    /// Open (or re-focus) the buffer for the Script at `path` and make it active.
    ///
    /// # Errors
    /// Returns [`SceneError::PathNotFound`] when the node is missing and
    /// [`SceneError::NotAScript`] for any other kind.
    pub fn open(&mut self, tree: &Tree, path: &NodePath) -> Result<&OpenBuffer, SceneError> {
        let index = match self.index_of(path) {
            Some(index) => index,
            None => {
                let node = tree.resolve(path)?;
                let source = node
                    .source()
                    .ok_or_else(|| SceneError::NotAScript(path.clone()))?;
                self.buffers.push(OpenBuffer {
                    path: path.clone(),
                    display_name: node.name.clone(),
                    text: source.to_string(),
                });
                debug!(path = %path, "opened buffer");
                self.buffers.len() - 1
            }
        };
        self.active = Some(index);
        Ok(&self.buffers[index])
    }

    /// Make the open buffer at `path` active.
    ///
    /// # Errors
    /// Returns [`SceneError::PathNotFound`] when no buffer is open for `path`.
    pub fn activate(&mut self, path: &NodePath) -> Result<(), SceneError> {
        let index = self
            .index_of(path)
            .ok_or_else(|| SceneError::PathNotFound(path.clone()))?;
        self.active = Some(index);
        Ok(())
    }

    /// Replace a buffer's text. Edits are not recorded in history.
    ///
    /// # Errors
    /// Returns [`SceneError::PathNotFound`] when no buffer is open for `path`.
    pub fn set_text(&mut self, path: &NodePath, text: impl Into<String>) -> Result<(), SceneError> {
        let index = self
            .index_of(path)
            .ok_or_else(|| SceneError::PathNotFound(path.clone()))?;
        self.buffers[index].text = text.into();
        Ok(())
    }

    /// Flush the buffer into its Script node (when it still exists) and close it.
    ///
    /// # Returns
    /// `true` when a buffer was open for `path`.
    pub fn close(&mut self, tree: &mut Tree, path: &NodePath) -> bool {
        let Some(index) = self.index_of(path) else {
            return false;
        };
        let buffer = self.remove_at(index);
        if let Err(err) = tree.set_script_source(&buffer.path, &buffer.text) {
            debug!(path = %buffer.path, error = %err, "closed buffer without flushing");
        }
        true
    }

    /// Write every buffer's text into its Script node.
    pub fn flush_all(&self, tree: &mut Tree) {
        for buffer in &self.buffers {
            if let Err(err) = tree.set_script_source(&buffer.path, &buffer.text) {
                debug!(path = %buffer.path, error = %err, "skipped flush");
            }
        }
    }

    fn remove_at(&mut self, index: usize) -> OpenBuffer {
        let removed = self.buffers.remove(index);
        self.active = match self.active {
            Some(active) if active == index => (!self.buffers.is_empty()).then_some(0),
            Some(active) if active > index => Some(active - 1),
            other => other,
        };
        removed
    }

    /// Bring buffers in line with `tree` after `action` was applied in `direction`.
    ///
    /// Removed nodes close their buffers (and those of descendants) without
    /// flushing. Renames rewrite buffer paths, and the display name of the
    /// renamed node's own buffer. Inserts never open buffers. An integrity
    /// sweep follows.
    pub fn reconcile(
        &mut self,
        tree: &Tree,
        action: &Action,
        direction: Direction,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        match action.effect(direction) {
            Effect::Insert { .. } => {}
            Effect::Remove { path } => {
                let mut index = 0;
                while index < self.buffers.len() {
                    if self.buffers[index].path.starts_with(path) {
                        let buffer = self.remove_at(index);
                        debug!(path = %buffer.path, "closed buffer of removed node");
                        report.closed.push(buffer.path);
                    } else {
                        index += 1;
                    }
                }
            }
            Effect::Rename { from, to } => {
                for buffer in &mut self.buffers {
                    let Some(rebased) = buffer.path.rebase(&from, &to) else {
                        continue;
                    };
                    if buffer.path == from {
                        if let Some(name) = to.name() {
                            buffer.display_name = name.to_string();
                        }
                    }
                    let old = std::mem::replace(&mut buffer.path, rebased);
                    report.retargeted.push((old, buffer.path.clone()));
                }
            }
        }
        report.dropped = self.verify(tree);
        report
    }

    /// Drop every buffer whose path no longer resolves to a Script.
    ///
    /// A hit here means reconciliation missed a case; it is logged, not
    /// surfaced to the user.
    ///
    /// # Returns
    /// Paths of the dropped buffers.
    pub fn verify(&mut self, tree: &Tree) -> Vec<NodePath> {
        let dropped = self.drop_unresolved(tree);
        for path in &dropped {
            let violation = SceneError::BufferIntegrityViolation(path.clone());
            error!(error = %violation, "dropped orphaned buffer");
        }
        dropped
    }

    /// Close buffers whose Script is absent from a freshly imported tree.
    ///
    /// Unlike [`BufferRegistry::verify`] this is expected after an import and
    /// only logged at debug level.
    pub fn close_missing(&mut self, tree: &Tree) -> Vec<NodePath> {
        let closed = self.drop_unresolved(tree);
        for path in &closed {
            debug!(path = %path, "closed buffer missing from imported tree");
        }
        closed
    }

    fn drop_unresolved(&mut self, tree: &Tree) -> Vec<NodePath> {
        let mut dropped = Vec::new();
        let mut index = 0;
        while index < self.buffers.len() {
            let live = tree
                .resolve(&self.buffers[index].path)
                .map(|node| node.is_script())
                .unwrap_or(false);
            if live {
                index += 1;
            } else {
                dropped.push(self.remove_at(index).path);
            }
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Node, NodeKind};

    fn sss() -> NodePath {
        NodePath::from_segments(["ServerScriptService"])
    }

    fn tree_with_scripts(names: &[&str]) -> Tree {
        let mut tree = Tree::default();
        for name in names {
            tree.apply(
                &Action::add(&sss(), Node::script(*name, format!("-- {}", name))),
                Direction::Forward,
            )
            .expect("add script");
        }
        tree
    }

    #[test]
    fn open_seeds_from_source_and_reuses_existing_buffer() {
        let tree = tree_with_scripts(&["Main"]);
        let mut buffers = BufferRegistry::new();
        let path = sss().child("Main");

        let opened = buffers.open(&tree, &path).expect("open");
        assert_eq!(opened.text(), "-- Main");
        assert_eq!(opened.display_name(), "Main");

        buffers.set_text(&path, "edited").expect("edit");
        let again = buffers.open(&tree, &path).expect("reopen");
        assert_eq!(again.text(), "edited");
        assert_eq!(buffers.len(), 1);
    }

    #[test]
    fn open_rejects_non_scripts_and_missing_nodes() {
        let tree = Tree::default();
        let mut buffers = BufferRegistry::new();
        assert!(matches!(
            buffers.open(&tree, &sss()),
            Err(SceneError::NotAScript(_))
        ));
        assert!(matches!(
            buffers.open(&tree, &sss().child("Ghost")),
            Err(SceneError::PathNotFound(_))
        ));
        assert!(buffers.is_empty());
    }

    #[test]
    fn close_flushes_text_into_node() {
        let mut tree = tree_with_scripts(&["Main"]);
        let mut buffers = BufferRegistry::new();
        let path = sss().child("Main");
        buffers.open(&tree, &path).expect("open");
        buffers.set_text(&path, "print('saved')").expect("edit");

        assert!(buffers.close(&mut tree, &path));
        assert!(!buffers.close(&mut tree, &path));
        assert_eq!(
            tree.resolve(&path).expect("script").source(),
            Some("print('saved')")
        );
        assert!(buffers.active().is_none());
    }

    #[test]
    fn closing_active_falls_back_to_first_and_shifts_later_active() {
        let mut tree = tree_with_scripts(&["A", "B", "C"]);
        let mut buffers = BufferRegistry::new();
        for name in ["A", "B", "C"] {
            buffers.open(&tree, &sss().child(name)).expect("open");
        }
        assert_eq!(buffers.active_index(), Some(2));

        buffers.close(&mut tree, &sss().child("A"));
        assert_eq!(buffers.active().map(OpenBuffer::display_name), Some("C"));

        buffers.close(&mut tree, &sss().child("C"));
        assert_eq!(buffers.active().map(OpenBuffer::display_name), Some("B"));
    }

    #[test]
    fn reconcile_remove_closes_nested_buffers_without_flush() {
        let mut tree = Tree::default();
        let folder = Node::new("Folder1", NodeKind::Folder)
            .with_child(Node::script("Inner", "original"))
            .expect("folder");
        let add = Action::add(&sss(), folder.clone());
        tree.apply(&add, Direction::Forward).expect("add");

        let mut buffers = BufferRegistry::new();
        let inner = sss().child("Folder1").child("Inner");
        buffers.open(&tree, &inner).expect("open");
        buffers.set_text(&inner, "unsaved").expect("edit");

        let delete = Action::delete(sss().child("Folder1"), folder);
        tree.apply(&delete, Direction::Forward).expect("delete");
        let report = buffers.reconcile(&tree, &delete, Direction::Forward);

        assert_eq!(report.closed, vec![inner.clone()]);
        assert!(report.dropped.is_empty());
        assert!(buffers.is_empty());
        assert!(buffers.active().is_none());

        tree.apply(&delete, Direction::Inverse).expect("restore");
        let report = buffers.reconcile(&tree, &delete, Direction::Inverse);
        assert!(report.is_empty(), "restoring must not reopen buffers");
        assert_eq!(tree.resolve(&inner).expect("inner").source(), Some("original"));
    }

    #[test]
    fn reconcile_rename_retargets_buffers_and_keeps_text() {
        let mut tree = tree_with_scripts(&["Main"]);
        let mut buffers = BufferRegistry::new();
        let path = sss().child("Main");
        buffers.open(&tree, &path).expect("open");
        buffers.set_text(&path, "draft").expect("edit");

        let rename = Action::rename(path.clone(), "Entry").expect("rename");
        tree.apply(&rename, Direction::Forward).expect("rename");
        let report = buffers.reconcile(&tree, &rename, Direction::Forward);
        assert_eq!(report.retargeted, vec![(path.clone(), sss().child("Entry"))]);

        let buffer = buffers.active().expect("active");
        assert_eq!(buffer.path(), &sss().child("Entry"));
        assert_eq!(buffer.display_name(), "Entry");
        assert_eq!(buffer.text(), "draft");

        tree.apply(&rename, Direction::Inverse).expect("rename back");
        buffers.reconcile(&tree, &rename, Direction::Inverse);
        let buffer = buffers.active().expect("active");
        assert_eq!(buffer.path(), &path);
        assert_eq!(buffer.display_name(), "Main");
    }

    #[test]
    fn verify_drops_orphaned_buffers() {
        let tree = tree_with_scripts(&["Main"]);
        let mut buffers = BufferRegistry::new();
        buffers.open(&tree, &sss().child("Main")).expect("open");

        let dropped = buffers.verify(&Tree::default());
        assert_eq!(dropped, vec![sss().child("Main")]);
        assert!(buffers.is_empty());
    }
}
