use std::collections::VecDeque;

use crate::{
    edit::change::{Change, ChangeTarget},
    foundation::error::CamtrackResult,
};

/// Undo/redo history of applied [`Change`]s.
///
/// Pushing a new change discards every redoable change. With a limit set, the oldest undoable
/// changes are dropped once the undo stack grows past it.
#[derive(Debug, Default)]
pub struct ChangeList {
    undo: VecDeque<Change>,
    redo: Vec<Change>,
    limit: Option<usize>,
}

impl ChangeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// History that keeps at most `limit` undoable changes. `None` keeps everything.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Record a change the caller already applied.
    pub fn push(&mut self, change: Change) {
        if !change.is_applied() {
            tracing::warn!("pushing a change that is not applied");
        }
        self.redo.clear();
        self.undo.push_back(change);
        if let Some(limit) = self.limit {
            while self.undo.len() > limit {
                self.undo.pop_front();
            }
        }
    }

    /// Apply `change` to `target`, then record it. Nothing is recorded if the apply fails.
    pub fn apply_and_push<T: ChangeTarget + ?Sized>(
        &mut self,
        target: &mut T,
        mut change: Change,
    ) -> CamtrackResult<()> {
        change.apply(target)?;
        self.push(change);
        Ok(())
    }

    /// Undo the most recent change and move it to the redo stack.
    ///
    /// Returns `None` when there is nothing to undo. A failing undo leaves both stacks as they
    /// were.
    pub fn undo<T: ChangeTarget + ?Sized>(
        &mut self,
        target: &mut T,
    ) -> CamtrackResult<Option<&Change>> {
        let Some(mut change) = self.undo.pop_back() else {
            return Ok(None);
        };
        if let Err(err) = change.undo(target) {
            self.undo.push_back(change);
            return Err(err);
        }
        tracing::debug!(undo = self.undo.len(), redo = self.redo.len() + 1, "undo");
        self.redo.push(change);
        Ok(self.redo.last())
    }

    /// Redo the most recently undone change and move it back to the undo stack.
    pub fn redo<T: ChangeTarget + ?Sized>(
        &mut self,
        target: &mut T,
    ) -> CamtrackResult<Option<&Change>> {
        let Some(mut change) = self.redo.pop() else {
            return Ok(None);
        };
        if let Err(err) = change.redo(target) {
            self.redo.push(change);
            return Err(err);
        }
        tracing::debug!(undo = self.undo.len() + 1, redo = self.redo.len(), "redo");
        self.undo.push_back(change);
        Ok(self.undo.back())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Forget all history. Curves are left as they are.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/edit/history.rs"]
mod tests;
