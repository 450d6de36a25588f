//! Linear undo/redo log of recorded actions.

use crate::models::Action;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One recorded action with the time it was first applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub action: Action,
    pub recorded_at: DateTime<Utc>,
}

/// What the undo/redo affordances should show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStatus {
    pub can_undo: bool,
    pub can_redo: bool,
}

/// A history row for display, with whether it is currently applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow<'a> {
    pub index: usize,
    pub applied: bool,
    #[serde(flatten)]
    pub entry: &'a HistoryEntry,
}

/// Ordered action log plus a cursor.
///
/// Entries `[0, applied)` are applied; the rest were undone and are kept only
/// until the next push. The log never branches.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    applied: usize,
    limit: usize,
}

impl History {
    /// Create an empty history holding at most `limit` entries (`0` = unbounded).
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            applied: 0,
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the last applied entry, or `None` when nothing is applied.
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    pub fn status(&self) -> HistoryStatus {
        HistoryStatus {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// Append an already-applied action.
    ///
    /// Undone entries after the cursor are discarded first. When the limit is
    /// exceeded the oldest entry is dropped.
    pub fn push(&mut self, action: Action) {
        self.entries.truncate(self.applied);
        self.entries.push(HistoryEntry {
            action,
            recorded_at: Utc::now(),
        });
        if self.limit > 0 && self.entries.len() > self.limit {
            let overflow = self.entries.len() - self.limit;
            self.entries.drain(..overflow);
        }
        self.applied = self.entries.len();
    }

    /// The action `undo` would invert next.
    pub fn undo_target(&self) -> Option<&Action> {
        let index = self.cursor()?;
        self.entries.get(index).map(|entry| &entry.action)
    }

    /// The action `redo` would re-apply next.
    pub fn redo_target(&self) -> Option<&Action> {
        self.entries.get(self.applied).map(|entry| &entry.action)
    }

    /// Move the cursor back after the undo target has been inverted.
    pub fn step_back(&mut self) {
        self.applied = self.applied.saturating_sub(1);
    }

    /// Move the cursor forward after the redo target has been applied.
    pub fn step_forward(&mut self) {
        if self.can_redo() {
            self.applied += 1;
        }
    }

    pub fn rows(&self) -> Vec<HistoryRow<'_>> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| HistoryRow {
                index,
                applied: index < self.applied,
                entry,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Node, NodeKind, NodePath};

    fn add(name: &str) -> Action {
        Action::add(
            &NodePath::from_segments(["Workspace"]),
            Node::new(name, NodeKind::Part),
        )
    }

    #[test]
    fn empty_history_has_no_targets() {
        let history = History::new(0);
        assert_eq!(history.cursor(), None);
        assert!(history.undo_target().is_none());
        assert!(history.redo_target().is_none());
        assert_eq!(history.status(), HistoryStatus::default());
    }

    #[test]
    fn cursor_tracks_undo_and_redo() {
        let mut history = History::new(0);
        history.push(add("Part1"));
        history.push(add("Part2"));
        assert_eq!(history.cursor(), Some(1));
        assert_eq!(history.undo_target(), Some(&add("Part2")));

        history.step_back();
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(history.redo_target(), Some(&add("Part2")));
        assert_eq!(
            history.status(),
            HistoryStatus {
                can_undo: true,
                can_redo: true
            }
        );

        history.step_forward();
        history.step_forward();
        assert_eq!(history.cursor(), Some(1));
        assert!(!history.can_redo());
    }

    #[test]
    fn push_after_undo_discards_retained_tail() {
        let mut history = History::new(0);
        history.push(add("Part1"));
        history.push(add("Part2"));
        history.push(add("Part3"));
        history.step_back();
        history.step_back();

        history.push(add("Part4"));
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        let names: Vec<String> = history
            .rows()
            .iter()
            .map(|row| row.entry.action.path().to_string())
            .collect();
        assert_eq!(names, ["game.Workspace.Part1", "game.Workspace.Part4"]);
    }

    #[test]
    fn limit_drops_oldest_entries() {
        let mut history = History::new(2);
        for name in ["Part1", "Part2", "Part3"] {
            history.push(add(name));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), Some(1));
        assert_eq!(history.rows()[0].entry.action, add("Part2"));
        assert!(history.rows().iter().all(|row| row.applied));
    }
}
