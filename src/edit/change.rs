use crate::{
    animation::attribute::Channel,
    animation::curve::Curve,
    animation::keyframe::Keyframe,
    foundation::core::FrameIndex,
    foundation::error::CamtrackResult,
};

/// State a [`Change`] reads and writes.
///
/// Implemented by [`Animation`](crate::Animation) (curves only) and by the editor session, which
/// also owns the current-frame cursor.
pub trait ChangeTarget {
    /// Borrow the curve behind `channel`.
    fn curve(&self, channel: Channel) -> &Curve;

    /// Make the key at `frame` on `channel` equal to `key`: insert/replace when `Some`, remove
    /// when `None`. Fails without mutating when the channel refuses edits.
    fn write_keyframe(
        &mut self,
        channel: Channel,
        frame: FrameIndex,
        key: Option<Keyframe>,
    ) -> CamtrackResult<()>;

    /// Move the editing cursor. Targets without a cursor ignore this.
    fn set_active_frame(&mut self, _frame: FrameIndex) {}
}

/// What a [`Change`] edits, together with the state needed to reverse it.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeKind {
    /// Presence/value of one key on one channel.
    Keyframe {
        channel: Channel,
        frame: FrameIndex,
        /// Key at `frame` before the edit.
        before: Option<Keyframe>,
        /// Key at `frame` after the edit.
        after: Option<Keyframe>,
    },
    /// Editing cursor position.
    ActiveFrame {
        before: FrameIndex,
        after: FrameIndex,
    },
    /// Ordered children applied as one unit.
    Group(Vec<Change>),
}

/// Reversible edit with an explicit applied/undone flag.
///
/// The edit payload is fixed at construction; only the flag moves. `apply` and `redo` are no-ops
/// on an applied change and `undo` is a no-op on one that is not applied.
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    kind: ChangeKind,
    applied: bool,
}

impl Change {
    fn pending(kind: ChangeKind) -> Self {
        Self {
            kind,
            applied: false,
        }
    }

    /// Edit that leaves `channel` with `key` at `key.frame`, capturing the current key there.
    pub fn set_keyframe<T: ChangeTarget + ?Sized>(target: &T, channel: Channel, key: Keyframe) -> Self {
        Self::pending(ChangeKind::Keyframe {
            channel,
            frame: key.frame,
            before: target.curve(channel).keyframe_at(key.frame).copied(),
            after: Some(key),
        })
    }

    /// Edit that removes the key at `frame` from `channel`, capturing it for undo.
    pub fn remove_keyframe<T: ChangeTarget + ?Sized>(
        target: &T,
        channel: Channel,
        frame: FrameIndex,
    ) -> Self {
        Self::pending(ChangeKind::Keyframe {
            channel,
            frame,
            before: target.curve(channel).keyframe_at(frame).copied(),
            after: None,
        })
    }

    /// Cursor move from `before` to `after`.
    pub fn active_frame(before: FrameIndex, after: FrameIndex) -> Self {
        Self::pending(ChangeKind::ActiveFrame { before, after })
    }

    /// Group of `children`, applied in order and undone in reverse order.
    pub fn group(children: Vec<Change>) -> Self {
        Self::pending(ChangeKind::Group(children))
    }

    /// Mark a change whose effect the caller already produced by other means.
    pub fn into_applied(mut self) -> Self {
        self.mark(true);
        self
    }

    fn mark(&mut self, applied: bool) {
        self.applied = applied;
        if let ChangeKind::Group(children) = &mut self.kind {
            for c in children {
                c.mark(applied);
            }
        }
    }

    pub fn kind(&self) -> &ChangeKind {
        &self.kind
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Children of a group; empty for leaf changes.
    pub fn children(&self) -> &[Change] {
        match &self.kind {
            ChangeKind::Group(children) => children,
            _ => &[],
        }
    }

    /// Perform the edit.
    pub fn apply<T: ChangeTarget + ?Sized>(&mut self, target: &mut T) -> CamtrackResult<()> {
        if self.applied {
            return Ok(());
        }
        self.forward(target)?;
        self.applied = true;
        Ok(())
    }

    /// Restore the state captured before the edit.
    pub fn undo<T: ChangeTarget + ?Sized>(&mut self, target: &mut T) -> CamtrackResult<()> {
        if !self.applied {
            return Ok(());
        }
        self.backward(target)?;
        self.applied = false;
        Ok(())
    }

    /// Re-apply an undone edit.
    pub fn redo<T: ChangeTarget + ?Sized>(&mut self, target: &mut T) -> CamtrackResult<()> {
        self.apply(target)
    }

    fn forward<T: ChangeTarget + ?Sized>(&mut self, target: &mut T) -> CamtrackResult<()> {
        match &mut self.kind {
            ChangeKind::Keyframe {
                channel,
                frame,
                after,
                ..
            } => target.write_keyframe(*channel, *frame, *after),
            ChangeKind::ActiveFrame { after, .. } => {
                target.set_active_frame(*after);
                Ok(())
            }
            ChangeKind::Group(children) => {
                for i in 0..children.len() {
                    if let Err(err) = children[i].apply(target) {
                        for done in children[..i].iter_mut().rev() {
                            if let Err(rollback) = done.undo(target) {
                                tracing::error!(%rollback, "change group rollback failed");
                            }
                        }
                        return Err(err);
                    }
                }
                Ok(())
            }
        }
    }

    fn backward<T: ChangeTarget + ?Sized>(&mut self, target: &mut T) -> CamtrackResult<()> {
        match &mut self.kind {
            ChangeKind::Keyframe {
                channel,
                frame,
                before,
                ..
            } => target.write_keyframe(*channel, *frame, *before),
            ChangeKind::ActiveFrame { before, .. } => {
                target.set_active_frame(*before);
                Ok(())
            }
            ChangeKind::Group(children) => {
                for i in (0..children.len()).rev() {
                    if let Err(err) = children[i].undo(target) {
                        for undone in children[i + 1..].iter_mut() {
                            if let Err(rollback) = undone.apply(target) {
                                tracing::error!(%rollback, "change group rollback failed");
                            }
                        }
                        return Err(err);
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/edit/change.rs"]
mod tests;
