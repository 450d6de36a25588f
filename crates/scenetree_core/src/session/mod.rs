//! Editing session: the single owner of tree, history, buffers, and selection.
//!
//! Every public mutation runs validate, apply, record, reconcile, and notify
//! to completion before returning, so readers never see a half-applied edit.

use crate::buffers::{BufferRegistry, OpenBuffer};
use crate::config::Config;
use crate::constants::SAMPLE_SCRIPTS;
use crate::error::SceneError;
use crate::history::{History, HistoryRow, HistoryStatus};
use crate::models::{Action, ActionKind, Direction, Node, NodeClass, NodePath};
use crate::naming;
use crate::runner::{OutputKind, RunReport, ScriptFailure, ScriptInvocation, ScriptRunner};
use crate::selection::SelectionState;
use crate::tree::{ChildEntry, Snapshot, Tree};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{error, info, warn};

/// Change notifications for the view layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// An action was applied (recorded, undone, or redone).
    TreeChanged {
        kind: ActionKind,
        direction: Direction,
        path: NodePath,
    },
    /// The whole tree was replaced by an imported snapshot.
    TreeReplaced,
    HistoryChanged(HistoryStatus),
    BuffersChanged,
    SelectionChanged(Option<NodePath>),
}

/// Result of a rename request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// A rename was recorded; holds the node's new path.
    Renamed(NodePath),
    /// The sanitized name matched the current one; nothing was recorded.
    Unchanged(NodePath),
}

impl RenameOutcome {
    pub fn path(&self) -> &NodePath {
        match self {
            Self::Renamed(path) | Self::Unchanged(path) => path,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    config: Config,
    tree: Tree,
    history: History,
    buffers: BufferRegistry,
    selection: SelectionState,
    item_counter: u64,
    subscribers: Vec<Sender<SessionEvent>>,
}

impl Session {
    /// Start a session on the default scene, seeding sample scripts when
    /// configured and opening the first of them.
    pub fn new(config: Config) -> Self {
        let seed = config.seed_samples;
        let mut session = Self::with_tree(config, Tree::default());
        if seed {
            session.seed_samples();
        }
        session
    }

    /// [`Session::new`] with [`Config::from_env`].
    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    /// Start a session on an existing tree with empty history and no buffers.
    pub fn with_tree(config: Config, tree: Tree) -> Self {
        Self {
            history: History::new(config.history_limit),
            config,
            tree,
            buffers: BufferRegistry::new(),
            selection: SelectionState::default(),
            item_counter: 1,
            subscribers: Vec::new(),
        }
    }

    fn seed_samples(&mut self) {
        let service = self.script_service_path();
        let mut first = None;
        for (name, source) in SAMPLE_SCRIPTS {
            let action = Action::add(&service, Node::script(*name, *source));
            match self.tree.apply(&action, Direction::Forward) {
                Ok(()) => {
                    first.get_or_insert_with(|| action.path().clone());
                }
                Err(err) => warn!(error = %err, "could not seed sample script"),
            }
        }
        if let Some(path) = first {
            if let Err(err) = self.buffers.open(&self.tree, &path) {
                warn!(error = %err, "could not open sample script");
            }
        }
    }

    fn script_service_path(&self) -> NodePath {
        NodePath::root().child(&self.config.script_service)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn buffers(&self) -> &BufferRegistry {
        &self.buffers
    }

    pub fn selection_state(&self) -> &SelectionState {
        &self.selection
    }

    /// Register a view-layer listener.
    ///
    /// # Returns
    /// A receiver that gets every later [`SessionEvent`]. Dropping it
    /// unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: SessionEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // --- view-layer reads ---

    /// # Errors
    /// Returns [`SceneError::PathNotFound`] when `path` does not resolve.
    pub fn list_children(&self, path: &NodePath) -> Result<Vec<ChildEntry>, SceneError> {
        self.tree.list_children(path)
    }

    pub fn current_selection(&self) -> Option<&NodePath> {
        self.selection.path()
    }

    pub fn history_status(&self) -> HistoryStatus {
        self.history.status()
    }

    pub fn history_rows(&self) -> Vec<HistoryRow<'_>> {
        self.history.rows()
    }

    // --- command/history engine ---

    /// Apply `action` forward and record it.
    ///
    /// Nothing is recorded when the apply fails, and the tree is untouched.
    /// Undone entries after the cursor are discarded on success.
    ///
    /// # Errors
    /// Any [`Tree::apply`] error.
    pub fn record(&mut self, action: Action) -> Result<(), SceneError> {
        if let Err(err) = self.tree.apply(&action, Direction::Forward) {
            warn!(action = %action, error = %err, "rejected action");
            return Err(err);
        }
        self.after_apply(&action, Direction::Forward);
        self.history.push(action);
        self.notify(SessionEvent::HistoryChanged(self.history.status()));
        Ok(())
    }

    /// Invert the most recent applied action.
    ///
    /// # Returns
    /// `false` when there was nothing to undo.
    ///
    /// # Errors
    /// Returns the apply error if the recorded action no longer fits the
    /// tree; the cursor is not moved in that case.
    pub fn undo(&mut self) -> Result<bool, SceneError> {
        let Some(action) = self.history.undo_target().cloned() else {
            return Ok(false);
        };
        if let Err(err) = self.tree.apply(&action, Direction::Inverse) {
            error!(action = %action, error = %err, "undo failed");
            return Err(err);
        }
        self.history.step_back();
        self.after_apply(&action, Direction::Inverse);
        self.notify(SessionEvent::HistoryChanged(self.history.status()));
        Ok(true)
    }

    /// Re-apply the next undone action.
    ///
    /// # Returns
    /// `false` when there was nothing to redo.
    ///
    /// # Errors
    /// Returns the apply error if the recorded action no longer fits the
    /// tree; the cursor is not moved in that case.
    pub fn redo(&mut self) -> Result<bool, SceneError> {
        let Some(action) = self.history.redo_target().cloned() else {
            return Ok(false);
        };
        if let Err(err) = self.tree.apply(&action, Direction::Forward) {
            error!(action = %action, error = %err, "redo failed");
            return Err(err);
        }
        self.history.step_forward();
        self.after_apply(&action, Direction::Forward);
        self.notify(SessionEvent::HistoryChanged(self.history.status()));
        Ok(true)
    }

    fn after_apply(&mut self, action: &Action, direction: Direction) {
        let report = self.buffers.reconcile(&self.tree, action, direction);
        let selection_changed = self.selection.reconcile(&self.tree, action, direction);
        self.notify(SessionEvent::TreeChanged {
            kind: action.kind(),
            direction,
            path: action.path().clone(),
        });
        if !report.is_empty() {
            self.notify(SessionEvent::BuffersChanged);
        }
        if selection_changed {
            self.notify(SessionEvent::SelectionChanged(self.selection.path().cloned()));
        }
    }

    // --- structural intents ---

    /// Add a new node of `class` under `parent` with an auto-generated
    /// `<Class><n>` name.
    ///
    /// # Returns
    /// Path of the new node.
    ///
    /// # Errors
    /// - [`SceneError::InvalidOperation`] for non-creatable classes or a leaf parent.
    /// - [`SceneError::PathNotFound`] when `parent` does not resolve.
    pub fn add_child(
        &mut self,
        parent: &NodePath,
        class: NodeClass,
    ) -> Result<NodePath, SceneError> {
        if !class.is_creatable() {
            return Err(not_creatable(class));
        }
        let parent_node = self.tree.resolve(parent)?;
        if !parent_node.class().can_contain() {
            return Err(SceneError::InvalidOperation(format!(
                "{} at {} cannot contain children",
                parent_node.class(),
                parent
            )));
        }
        let name = naming::next_default_name(class.as_str(), &mut self.item_counter, |candidate| {
            parent_node.child(candidate).is_some()
        });
        let kind = class.new_kind(&name).ok_or_else(|| not_creatable(class))?;
        self.add_node(parent, Node::new(name, kind))
    }

    /// Add a new node of `class` named `name` (sanitized) under `parent`.
    ///
    /// # Errors
    /// - [`SceneError::NameCollision`] when a sibling already uses the name.
    /// - [`SceneError::InvalidOperation`] for blank names or non-creatable classes.
    pub fn add_named(
        &mut self,
        parent: &NodePath,
        name: &str,
        class: NodeClass,
    ) -> Result<NodePath, SceneError> {
        let name = naming::sanitize_name(name).ok_or_else(|| {
            SceneError::InvalidOperation("a node name cannot be blank".to_string())
        })?;
        let kind = class.new_kind(&name).ok_or_else(|| not_creatable(class))?;
        self.add_node(parent, Node::new(name, kind))
    }

    /// Record the addition of a prepared subtree under `parent`.
    ///
    /// Every node in the subtree must be of a creatable class and carry a
    /// name that is already a single sanitized path segment.
    ///
    /// # Errors
    /// [`SceneError::InvalidOperation`] for a non-creatable class or a
    /// non-canonical name anywhere in the subtree, plus any [`Tree::apply`] error.
    pub fn add_node(&mut self, parent: &NodePath, node: Node) -> Result<NodePath, SceneError> {
        check_addable(&node)?;
        let action = Action::add(parent, node);
        let path = action.path().clone();
        self.record(action)?;
        Ok(path)
    }

    /// Delete the node at `path` (and its subtree).
    ///
    /// # Returns
    /// The removed subtree as captured in history.
    ///
    /// # Errors
    /// - [`SceneError::PathNotFound`] when `path` does not resolve.
    /// - [`SceneError::InvalidOperation`] for the root and services.
    pub fn delete(&mut self, path: &NodePath) -> Result<Node, SceneError> {
        let node = self.tree.resolve(path)?;
        if !node.class().is_deletable() {
            return Err(SceneError::InvalidOperation(format!(
                "{} nodes cannot be deleted",
                node.class()
            )));
        }
        let captured = node.clone();
        self.record(Action::delete(path.clone(), captured.clone()))?;
        Ok(captured)
    }

    /// Rename the node at `path` to the sanitized form of `name`.
    ///
    /// Blank or unchanged names record nothing.
    ///
    /// # Errors
    /// - [`SceneError::PathNotFound`] when `path` does not resolve.
    /// - [`SceneError::InvalidOperation`] for the root and services.
    /// - [`SceneError::NameCollision`] when a sibling already uses the name.
    pub fn rename(&mut self, path: &NodePath, name: &str) -> Result<RenameOutcome, SceneError> {
        let node = self.tree.resolve(path)?;
        if !node.class().is_renameable() {
            return Err(SceneError::InvalidOperation(format!(
                "{} nodes cannot be renamed",
                node.class()
            )));
        }
        let Some(new_name) = naming::sanitize_name(name) else {
            return Ok(RenameOutcome::Unchanged(path.clone()));
        };
        if node.name == new_name {
            return Ok(RenameOutcome::Unchanged(path.clone()));
        }
        if self.tree.parent_of(path)?.child(&new_name).is_some() {
            let parent = path.parent().unwrap_or_default();
            warn!(parent = %parent, name = %new_name, "rename collides with sibling");
            return Err(SceneError::NameCollision {
                parent,
                name: new_name,
            });
        }
        let action = Action::rename(path.clone(), new_name.as_str()).ok_or_else(|| {
            SceneError::InvalidOperation("the root cannot be renamed".to_string())
        })?;
        let new_path = path.with_name(&new_name).unwrap_or_default();
        self.record(action)?;
        Ok(RenameOutcome::Renamed(new_path))
    }

    // --- selection / rename controller ---

    /// Click on `path` in the explorer.
    ///
    /// # Errors
    /// [`SceneError::PathNotFound`] for missing nodes and
    /// [`SceneError::InvalidOperation`] for the root.
    pub fn select(&mut self, path: &NodePath) -> Result<&SelectionState, SceneError> {
        let class = self.tree.resolve(path)?.class();
        let before = self.selection.clone();
        self.selection.select(path, class)?;
        self.notify_selection_if_changed(&before);
        Ok(&self.selection)
    }

    /// Enter rename mode for the selected node.
    ///
    /// # Errors
    /// [`SceneError::InvalidOperation`] without a renameable selection.
    pub fn begin_rename(&mut self) -> Result<(), SceneError> {
        let path = self
            .selection
            .path()
            .cloned()
            .ok_or_else(|| SceneError::InvalidOperation("nothing is selected".to_string()))?;
        let class = self.tree.resolve(&path)?.class();
        let before = self.selection.clone();
        self.selection.begin_rename(class)?;
        self.notify_selection_if_changed(&before);
        Ok(())
    }

    /// # Errors
    /// [`SceneError::InvalidOperation`] outside rename mode.
    pub fn set_rename_draft(&mut self, text: &str) -> Result<(), SceneError> {
        self.selection.set_draft(text)
    }

    /// Commit the rename draft.
    ///
    /// On success (or an unchanged name) the controller returns to
    /// `Selected` at the node's current path. On a collision it stays in
    /// `Renaming` so the user can correct the draft.
    ///
    /// # Errors
    /// [`SceneError::InvalidOperation`] outside rename mode, or any
    /// [`Session::rename`] error.
    pub fn commit_rename(&mut self) -> Result<RenameOutcome, SceneError> {
        let SelectionState::Renaming { path, draft } = &self.selection else {
            return Err(SceneError::InvalidOperation(
                "no rename in progress".to_string(),
            ));
        };
        let (path, draft) = (path.clone(), draft.clone());
        let outcome = self.rename(&path, &draft)?;
        let before = self.selection.clone();
        self.selection = SelectionState::Selected {
            path: outcome.path().clone(),
        };
        self.notify_selection_if_changed(&before);
        Ok(outcome)
    }

    /// Abandon the rename draft.
    ///
    /// # Returns
    /// `true` when a rename was in progress.
    pub fn cancel_rename(&mut self) -> bool {
        let before = self.selection.clone();
        let cancelled = self.selection.cancel();
        self.notify_selection_if_changed(&before);
        cancelled
    }

    /// Delete the selected node; the selection becomes `Idle`.
    ///
    /// # Returns
    /// Path of the deleted node.
    ///
    /// # Errors
    /// [`SceneError::InvalidOperation`] when nothing deletable is selected.
    pub fn delete_selected(&mut self) -> Result<NodePath, SceneError> {
        let path = self
            .selection
            .path()
            .cloned()
            .ok_or_else(|| SceneError::InvalidOperation("nothing is selected".to_string()))?;
        self.delete(&path)?;
        Ok(path)
    }

    fn notify_selection_if_changed(&mut self, before: &SelectionState) {
        if &self.selection != before {
            self.notify(SessionEvent::SelectionChanged(self.selection.path().cloned()));
        }
    }

    // --- buffers ---

    /// Open (or focus) the editor buffer for the Script at `path`.
    ///
    /// # Errors
    /// [`SceneError::PathNotFound`] or [`SceneError::NotAScript`].
    pub fn open_script(&mut self, path: &NodePath) -> Result<&OpenBuffer, SceneError> {
        self.buffers.open(&self.tree, path)?;
        self.notify(SessionEvent::BuffersChanged);
        self.buffers
            .get(path)
            .ok_or_else(|| SceneError::PathNotFound(path.clone()))
    }

    /// Flush and close the buffer for `path`.
    ///
    /// # Returns
    /// `true` when a buffer was open.
    pub fn close_script(&mut self, path: &NodePath) -> bool {
        let closed = self.buffers.close(&mut self.tree, path);
        if closed {
            self.notify(SessionEvent::BuffersChanged);
        }
        closed
    }

    /// # Errors
    /// [`SceneError::PathNotFound`] when no buffer is open for `path`.
    pub fn activate_script(&mut self, path: &NodePath) -> Result<(), SceneError> {
        self.buffers.activate(path)?;
        self.notify(SessionEvent::BuffersChanged);
        Ok(())
    }

    pub fn active_buffer(&self) -> Option<&OpenBuffer> {
        self.buffers.active()
    }

    pub fn script_text(&self, path: &NodePath) -> Option<&str> {
        self.buffers.text(path)
    }

    /// Replace a buffer's text (keystroke edits; not historied).
    ///
    /// # Errors
    /// [`SceneError::PathNotFound`] when no buffer is open for `path`.
    pub fn set_script_text(&mut self, path: &NodePath, text: &str) -> Result<(), SceneError> {
        self.buffers.set_text(path, text)
    }

    // --- interpreter boundary ---

    /// Deep copy of the live tree.
    pub fn export_snapshot(&self) -> Snapshot {
        self.tree.snapshot()
    }

    /// Replace the whole tree with `snapshot`.
    ///
    /// History is cleared because recorded paths are only valid against the
    /// tree they were recorded on. Buffers whose Script disappeared are
    /// closed and a dangling selection is cleared.
    ///
    /// # Errors
    /// [`SceneError::InvalidSnapshot`] when the snapshot is malformed; the
    /// session is unchanged in that case.
    pub fn import_snapshot(&mut self, snapshot: Snapshot) -> Result<(), SceneError> {
        snapshot.tree().validate()?;
        self.tree = snapshot.into_tree();
        let discarded = self.history.len();
        self.history.clear();
        let closed = self.buffers.close_missing(&self.tree);
        let before = self.selection.clone();
        self.selection.retain_valid(&self.tree);
        info!(
            discarded_history = discarded,
            closed_buffers = closed.len(),
            "imported snapshot"
        );

        self.notify(SessionEvent::TreeReplaced);
        self.notify(SessionEvent::HistoryChanged(self.history.status()));
        if !closed.is_empty() {
            self.notify(SessionEvent::BuffersChanged);
        }
        self.notify_selection_if_changed(&before);
        Ok(())
    }

    /// Run every Script under the configured script service.
    ///
    /// Open buffers are flushed into a detached copy of the tree, each script
    /// runs against that copy, and the copy is imported when the run
    /// completes. Runtime errors are reported per script.
    ///
    /// # Errors
    /// [`SceneError::PathNotFound`] when the script service is missing and
    /// [`SceneError::Interpreter`] for a fatal runner failure. The session is
    /// unchanged in both cases.
    pub fn run_scripts<R>(&mut self, runner: &mut R) -> Result<RunReport, SceneError>
    where
        R: ScriptRunner + ?Sized,
    {
        let mut working = self.tree.snapshot();
        self.buffers.flush_all(working.tree_mut());
        let scripts = working.tree().scripts_under(&self.script_service_path())?;

        let mut report = RunReport::default();
        report.push(OutputKind::Info, "> Starting execution...");
        for script in &scripts {
            report.push(OutputKind::Info, format!("--- Running {} ---", script.name));
            report.scripts_run += 1;
            let invocation = ScriptInvocation {
                path: &script.path,
                name: &script.name,
                source: &script.source,
            };
            match runner.run(working.tree_mut(), invocation) {
                Ok(lines) => {
                    for line in lines {
                        report.push(OutputKind::Print, line);
                    }
                }
                Err(ScriptFailure::Runtime(message)) => {
                    report.failures += 1;
                    report.push(
                        OutputKind::Error,
                        format!("[ERROR] in {}: {}", script.name, message),
                    );
                }
                Err(ScriptFailure::Fatal(message)) => {
                    warn!(script = %script.path, error = %message, "run aborted");
                    return Err(SceneError::Interpreter(message));
                }
            }
        }
        report.push(OutputKind::Success, "> Execution finished.");

        self.import_snapshot(working)?;
        Ok(report)
    }
}

fn not_creatable(class: NodeClass) -> SceneError {
    SceneError::InvalidOperation(format!("{} nodes cannot be created", class))
}

fn check_addable(node: &Node) -> Result<(), SceneError> {
    if !node.class().is_creatable() {
        return Err(not_creatable(node.class()));
    }
    if !naming::is_canonical_name(&node.name) {
        return Err(SceneError::InvalidOperation(format!(
            "'{}' is not a valid node name",
            node.name
        )));
    }
    node.children()
        .into_iter()
        .flat_map(|children| children.values())
        .try_for_each(check_addable)
}

#[cfg(test)]
mod tests;
