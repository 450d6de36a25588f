//! Boundary to the external script interpreter.

use crate::models::NodePath;
use crate::tree::Tree;
use serde::Serialize;
use thiserror::Error;

/// One script handed to a [`ScriptRunner`].
#[derive(Debug, Clone, Copy)]
pub struct ScriptInvocation<'a> {
    pub path: &'a NodePath,
    pub name: &'a str,
    pub source: &'a str,
}

/// Failure reported by a runner for a single script.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptFailure {
    /// The script raised an error; the run continues with the next script.
    #[error("{0}")]
    Runtime(String),
    /// The interpreter itself broke; the whole run is abandoned.
    #[error("{0}")]
    Fatal(String),
}

/// An interpreter that executes script source against a detached tree copy.
///
/// `world` is the run's private copy. Edits made to it are adopted as the new
/// session tree only when every script has finished without a
/// [`ScriptFailure::Fatal`].
pub trait ScriptRunner {
    /// Execute one script.
    ///
    /// # Returns
    /// Lines the script printed.
    ///
    /// # Errors
    /// Returns a [`ScriptFailure`] when the script or interpreter fails.
    fn run(
        &mut self,
        world: &mut Tree,
        script: ScriptInvocation<'_>,
    ) -> Result<Vec<String>, ScriptFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Info,
    Print,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    pub kind: OutputKind,
    pub text: String,
}

/// Output panel contents produced by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub lines: Vec<OutputLine>,
    pub scripts_run: usize,
    pub failures: usize,
}

impl RunReport {
    pub(crate) fn push(&mut self, kind: OutputKind, text: impl Into<String>) {
        self.lines.push(OutputLine {
            kind,
            text: text.into(),
        });
    }

    /// Lines of one kind, in order.
    pub fn lines_of(&self, kind: OutputKind) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .filter(move |line| line.kind == kind)
            .map(|line| line.text.as_str())
    }
}
