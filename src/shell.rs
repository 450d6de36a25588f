//! Line-oriented command shell over a [`Session`].
//!
//! Each input line is tokenized, parsed with clap, executed against the
//! session, and rendered as text or JSON.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use scenetree_core::constants::NO_SCRIPT_OPEN_TEXT;
use scenetree_core::{
    NodeClass, NodePath, RenameOutcome, SceneError, SelectionState, Session, Snapshot,
};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, error};

/// One parsed shell line.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Print the whole tree
    Tree,
    /// List the children of a node (default: the root)
    Ls { path: Option<NodePath> },
    /// Add a node; without NAME a `<Class><n>` name is generated
    Add {
        parent: NodePath,
        class: NodeClass,
        name: Option<String>,
    },
    /// Delete a node and its subtree
    Rm { path: NodePath },
    /// Rename a node
    Rename { path: NodePath, name: String },
    /// Click a node in the explorer
    Select { path: NodePath },
    /// Start renaming the selected node
    BeginRename,
    /// Replace the rename draft
    Draft { text: String },
    /// Commit the rename draft
    Commit,
    /// Abandon the rename draft
    Cancel,
    /// Delete the selected node
    DeleteSelected,
    Undo,
    Redo,
    /// Open a script buffer
    Open { path: NodePath },
    /// Flush and close a script buffer
    Close { path: NodePath },
    /// Print a script's current text
    Cat { path: NodePath },
    /// Replace a script buffer's text, opening it if needed
    Write { path: NodePath, text: String },
    /// List open buffers
    Tabs,
    /// List recorded actions
    History,
    /// Show undo/redo availability, selection, and the active buffer
    Status,
    /// Print the tree as snapshot JSON
    Export,
    /// Replace the tree with a snapshot JSON file
    Import { file: PathBuf },
}

impl ShellCommand {
    /// Parse one non-blank line.
    ///
    /// # Errors
    /// Returns an error for unbalanced quotes or arguments clap rejects.
    pub fn parse_line(line: &str) -> anyhow::Result<Self> {
        let tokens = tokenize(line)?;
        Ok(ShellLine::try_parse_from(tokens)?.command)
    }
}

/// Split a line into words, honouring double quotes and the `\n`, `\t`,
/// `\"` and `\\` escapes inside them. Any other backslash is kept as is.
///
/// # Errors
/// Returns an error when a quote is left open.
pub fn tokenize(line: &str) -> anyhow::Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            '\\' if quoted => match chars.peek() {
                Some('n') => {
                    chars.next();
                    current.push('\n');
                }
                Some('t') => {
                    chars.next();
                    current.push('\t');
                }
                Some(&escaped @ ('"' | '\\')) => {
                    chars.next();
                    current.push(escaped);
                }
                _ => current.push('\\'),
            },
            ch if ch.is_whitespace() && !quoted => {
                if in_word {
                    tokens.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            ch => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if quoted {
        bail!("unterminated quote");
    }
    if in_word {
        tokens.push(current);
    }
    Ok(tokens)
}

/// A session plus output mode.
pub struct CommandShell {
    session: Session,
    json: bool,
}

impl CommandShell {
    pub fn new(session: Session, json: bool) -> Self {
        Self { session, json }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Execute every line of `input`, writing results to `out` and errors to
    /// `err`. Failed lines do not stop the shell.
    ///
    /// # Returns
    /// Number of lines that failed.
    ///
    /// # Errors
    /// Only I/O errors on the streams themselves.
    pub fn run_lines<R, W, E>(&mut self, input: R, out: &mut W, err: &mut E) -> io::Result<usize>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let mut failures = 0;
        for (index, line) in input.lines().enumerate() {
            let line = line?;
            match self.run_line(&line) {
                Ok(Some(text)) if !text.is_empty() => writeln!(out, "{}", text)?,
                Ok(_) => {}
                Err(error) => {
                    failures += 1;
                    let command = line.split_whitespace().next().unwrap_or_default();
                    if is_internal(&error) {
                        error!(line = index + 1, command, "internal failure: {:#}", error);
                        writeln!(
                            err,
                            "line {}: {}: internal error: {:#}",
                            index + 1,
                            command,
                            error
                        )?;
                    } else {
                        writeln!(err, "line {}: {}: {:#}", index + 1, command, error)?;
                    }
                }
            }
        }
        Ok(failures)
    }

    /// Execute one line.
    ///
    /// # Returns
    /// `None` for blank lines and `#` comments.
    ///
    /// # Errors
    /// Parse failures and any session error.
    pub fn run_line(&mut self, line: &str) -> anyhow::Result<Option<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        let command = ShellCommand::parse_line(trimmed)?;
        debug!(?command, "executing shell command");
        self.execute(command).map(Some)
    }

    /// Execute a parsed command and render its result.
    ///
    /// # Errors
    /// Any session error, plus file errors for `import`.
    pub fn execute(&mut self, command: ShellCommand) -> anyhow::Result<String> {
        let session = &mut self.session;
        let (text, value) = match command {
            ShellCommand::Tree => (render_tree(session), tree_json(session)?),
            ShellCommand::Ls { path } => {
                let path = path.unwrap_or_default();
                let entries = session.list_children(&path)?;
                let text = entries
                    .iter()
                    .map(|entry| format!("{:<28} {}", entry.name, entry.class))
                    .collect::<Vec<_>>()
                    .join("\n");
                (text, serde_json::to_value(&entries)?)
            }
            ShellCommand::Add {
                parent,
                class,
                name,
            } => {
                let path = match name {
                    Some(name) => session.add_named(&parent, &name, class)?,
                    None => session.add_child(&parent, class)?,
                };
                (format!("Added {}", path), json!({ "added": path }))
            }
            ShellCommand::Rm { path } => {
                let removed = session.delete(&path)?;
                (
                    format!("Deleted {} ({} nodes)", path, removed.subtree_len()),
                    json!({ "deleted": path, "nodes": removed.subtree_len() }),
                )
            }
            ShellCommand::Rename { path, name } => {
                let outcome = session.rename(&path, &name)?;
                (render_rename(&outcome), rename_json(&outcome))
            }
            ShellCommand::Select { path } => {
                let state = session.select(&path)?.clone();
                (render_selection(&state), serde_json::to_value(&state)?)
            }
            ShellCommand::BeginRename => {
                session.begin_rename()?;
                selection_reply(session)?
            }
            ShellCommand::Draft { text } => {
                session.set_rename_draft(&text)?;
                selection_reply(session)?
            }
            ShellCommand::Commit => {
                let outcome = session.commit_rename()?;
                (render_rename(&outcome), rename_json(&outcome))
            }
            ShellCommand::Cancel => {
                let cancelled = session.cancel_rename();
                let text = if cancelled {
                    "Rename cancelled"
                } else {
                    "No rename in progress"
                };
                (text.to_string(), json!({ "cancelled": cancelled }))
            }
            ShellCommand::DeleteSelected => {
                let path = session.delete_selected()?;
                (format!("Deleted {}", path), json!({ "deleted": path }))
            }
            ShellCommand::Undo => {
                let target = session.history().undo_target().map(ToString::to_string);
                let undone = session.undo()?;
                let text = match (undone, &target) {
                    (true, Some(action)) => format!("Undid {}", action),
                    _ => "Nothing to undo".to_string(),
                };
                (text, json!({ "undone": undone.then_some(target).flatten() }))
            }
            ShellCommand::Redo => {
                let target = session.history().redo_target().map(ToString::to_string);
                let redone = session.redo()?;
                let text = match (redone, &target) {
                    (true, Some(action)) => format!("Redid {}", action),
                    _ => "Nothing to redo".to_string(),
                };
                (text, json!({ "redone": redone.then_some(target).flatten() }))
            }
            ShellCommand::Open { path } => {
                let buffer = session.open_script(&path)?;
                (
                    format!("Opened {}", buffer.display_name()),
                    serde_json::to_value(buffer)?,
                )
            }
            ShellCommand::Close { path } => {
                let closed = session.close_script(&path);
                let text = if closed {
                    format!("Closed {}", path)
                } else {
                    format!("No buffer open for {}", path)
                };
                (text, json!({ "closed": closed }))
            }
            ShellCommand::Cat { path } => {
                let text = match session.script_text(&path) {
                    Some(text) => text.to_string(),
                    None => session
                        .tree()
                        .resolve(&path)?
                        .source()
                        .ok_or_else(|| SceneError::NotAScript(path.clone()))?
                        .to_string(),
                };
                let value = json!({ "path": path, "text": text });
                (text, value)
            }
            ShellCommand::Write { path, text } => {
                session.open_script(&path)?;
                session.set_script_text(&path, &text)?;
                (
                    format!("Wrote {} bytes to {}", text.len(), path),
                    json!({ "path": path, "bytes": text.len() }),
                )
            }
            ShellCommand::Tabs => {
                let active = session.buffers().active_index();
                let buffers = session.buffers().buffers();
                let text = if buffers.is_empty() {
                    NO_SCRIPT_OPEN_TEXT.to_string()
                } else {
                    buffers
                        .iter()
                        .enumerate()
                        .map(|(index, buffer)| {
                            let marker = if Some(index) == active { '*' } else { ' ' };
                            format!("{} {:<24} {}", marker, buffer.display_name(), buffer.path())
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                (text, json!({ "active": active, "buffers": buffers }))
            }
            ShellCommand::History => {
                let rows = session.history_rows();
                let text = rows
                    .iter()
                    .map(|row| {
                        format!(
                            "{:>3} [{}] {}  {}",
                            row.index,
                            if row.applied { 'x' } else { ' ' },
                            row.entry.action,
                            row.entry.recorded_at.format("%H:%M:%S")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                (text, serde_json::to_value(&rows)?)
            }
            ShellCommand::Status => {
                let status = session.history_status();
                let selection = session.selection_state();
                let active = session.active_buffer().map(|buffer| buffer.path().to_string());
                let text = format!(
                    "undo: {}  redo: {}\nselection: {}\nactive: {}",
                    status.can_undo,
                    status.can_redo,
                    render_selection(selection),
                    active.as_deref().unwrap_or("none")
                );
                let value = json!({
                    "history": status,
                    "selection": selection,
                    "active": active,
                });
                (text, value)
            }
            ShellCommand::Export => {
                let raw = session.export_snapshot().to_json_pretty()?;
                let value = serde_json::from_str(&raw)?;
                (raw, value)
            }
            ShellCommand::Import { file } => {
                let raw = std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?;
                let snapshot = Snapshot::from_json(&raw)?;
                session.import_snapshot(snapshot)?;
                (
                    format!("Imported {}", file.display()),
                    json!({ "imported": file }),
                )
            }
        };

        if self.json {
            Ok(serde_json::to_string_pretty(&value)?)
        } else {
            Ok(text)
        }
    }
}

/// `true` when a failed line hit a scene error the user cannot fix by
/// changing their input.
fn is_internal(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<SceneError>(),
        Some(scene) if !scene.is_user_correctable()
    )
}

fn render_tree(session: &Session) -> String {
    session
        .tree()
        .walk()
        .into_iter()
        .map(|(path, node)| {
            format!(
                "{}{} ({})",
                "  ".repeat(path.depth()),
                node.name,
                node.class()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tree_json(session: &Session) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(session.tree())?)
}

fn render_rename(outcome: &RenameOutcome) -> String {
    match outcome {
        RenameOutcome::Renamed(path) => format!("Renamed to {}", path),
        RenameOutcome::Unchanged(path) => format!("Unchanged {}", path),
    }
}

fn rename_json(outcome: &RenameOutcome) -> Value {
    match outcome {
        RenameOutcome::Renamed(path) => json!({ "renamed": true, "path": path }),
        RenameOutcome::Unchanged(path) => json!({ "renamed": false, "path": path }),
    }
}

fn render_selection(state: &SelectionState) -> String {
    match state {
        SelectionState::Idle => "nothing selected".to_string(),
        SelectionState::Selected { path } => format!("selected {}", path),
        SelectionState::Renaming { path, draft } => format!("renaming {} -> {}", path, draft),
    }
}

fn selection_reply(session: &Session) -> anyhow::Result<(String, Value)> {
    let state = session.selection_state();
    Ok((render_selection(state), serde_json::to_value(state)?))
}
