use std::collections::BTreeMap;

use crate::{
    animation::attribute::{AttributeId, Channel, CompositeAttribute},
    animation::curve::Curve,
    animation::keyframe::Keyframe,
    animation::model::Animation,
    config::EditorOpts,
    edit::change::{Change, ChangeTarget},
    edit::history::ChangeList,
    foundation::core::FrameIndex,
    foundation::error::CamtrackResult,
};

/// Frame step used when the coarse modifier is held.
pub const COARSE_FRAME_STEP: i64 = 10;

/// Animation plus the editing cursor; the target every editor [`Change`] runs against.
#[derive(Clone, Debug)]
pub struct EditState {
    animation: Animation,
    current_frame: FrameIndex,
}

impl EditState {
    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn current_frame(&self) -> FrameIndex {
        self.current_frame
    }
}

impl ChangeTarget for EditState {
    fn curve(&self, channel: Channel) -> &Curve {
        self.animation.curve(channel)
    }

    fn write_keyframe(
        &mut self,
        channel: Channel,
        frame: FrameIndex,
        key: Option<Keyframe>,
    ) -> CamtrackResult<()> {
        self.animation.write_keyframe(channel, frame, key)
    }

    fn set_active_frame(&mut self, frame: FrameIndex) {
        self.current_frame = frame;
    }
}

/// One authoring session over an [`Animation`].
///
/// Owns the cursor, the undo history and un-keyed value overrides. Overrides hold values the user
/// typed at a frame without a keyframe; they are dropped whenever the cursor moves or history
/// changes the curves.
pub struct EditorContext {
    state: EditState,
    history: ChangeList,
    opts: EditorOpts,
    overrides: BTreeMap<Channel, f64>,
}

impl EditorContext {
    pub fn new(animation: Animation, opts: EditorOpts) -> Self {
        let current_frame = animation.settings().range.start;
        Self {
            state: EditState {
                animation,
                current_frame,
            },
            history: ChangeList::with_limit(opts.history_limit),
            opts,
            overrides: BTreeMap::new(),
        }
    }

    pub fn animation(&self) -> &Animation {
        &self.state.animation
    }

    pub fn into_animation(self) -> Animation {
        self.state.animation
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn history(&self) -> &ChangeList {
        &self.history
    }

    pub fn opts(&self) -> &EditorOpts {
        &self.opts
    }

    pub fn current_frame(&self) -> FrameIndex {
        self.state.current_frame
    }

    pub fn set_current_frame(&mut self, frame: FrameIndex) {
        if frame != self.state.current_frame {
            self.overrides.clear();
        }
        self.state.current_frame = frame;
    }

    /// Move the cursor by `delta` frames.
    pub fn step_frames(&mut self, delta: i64) -> FrameIndex {
        let frame = self.state.current_frame.offset(delta);
        self.set_current_frame(frame);
        frame
    }

    pub fn next_frame(&mut self, coarse: bool) -> FrameIndex {
        self.step_frames(if coarse { COARSE_FRAME_STEP } else { 1 })
    }

    pub fn prev_frame(&mut self, coarse: bool) -> FrameIndex {
        self.step_frames(if coarse { -COARSE_FRAME_STEP } else { -1 })
    }

    /// Jump to the nearest keyframe of `id` before the cursor. `None` leaves the cursor alone.
    pub fn jump_to_prev_keyframe(&mut self, id: AttributeId) -> Option<FrameIndex> {
        let frame = CompositeAttribute::from(id).prev_keyframe(&self.state, self.current_frame())?;
        self.set_current_frame(frame);
        Some(frame)
    }

    pub fn jump_to_next_keyframe(&mut self, id: AttributeId) -> Option<FrameIndex> {
        let frame = CompositeAttribute::from(id).next_keyframe(&self.state, self.current_frame())?;
        self.set_current_frame(frame);
        Some(frame)
    }

    /// Value shown for `channel` at the cursor: the pending override, else the evaluated curve.
    pub fn channel_value(&self, channel: Channel) -> f64 {
        match self.overrides.get(&channel) {
            Some(v) => *v,
            None => self
                .state
                .animation
                .channel_value(channel, self.current_frame().as_time()),
        }
    }

    pub fn has_override(&self, channel: Channel) -> bool {
        self.overrides.contains_key(&channel)
    }

    /// Edit the value of `channel` at the cursor.
    ///
    /// Updates the keyframe at the cursor when one exists, creates one when auto-keying is on,
    /// and otherwise keeps the value as an override until the cursor moves.
    pub fn set_channel_value(&mut self, channel: Channel, value: f64) -> CamtrackResult<()> {
        let frame = self.current_frame();
        let existing = self.state.curve(channel).keyframe_at(frame).copied();
        let key = match existing {
            Some(k) => k.with_value(value),
            None if self.opts.auto_keyframe => {
                Keyframe::new(frame, value, self.opts.default_interp)
            }
            None => {
                self.overrides.insert(channel, value);
                return Ok(());
            }
        };
        let change = Change::set_keyframe(&self.state, channel, key);
        self.history.apply_and_push(&mut self.state, change)?;
        self.overrides.remove(&channel);
        Ok(())
    }

    pub fn has_keyframe(&self, id: AttributeId) -> bool {
        CompositeAttribute::from(id).has_keyframe_at(&self.state, self.current_frame())
    }

    /// Key every channel of `id` at the cursor. Returns `false` when nothing needed keying.
    pub fn set_keyframe(&mut self, id: AttributeId) -> CamtrackResult<bool> {
        let Some(change) = self.key_attribute(id)? else {
            return Ok(false);
        };
        self.history.push(change);
        Ok(true)
    }

    /// Remove the keys of `id` at the cursor. Returns `false` when there were none.
    pub fn clear_keyframe(&mut self, id: AttributeId) -> CamtrackResult<bool> {
        let frame = self.current_frame();
        let attr = CompositeAttribute::from(id);
        let Some(change) = attr.clear_keyframe_at(&mut self.state, frame)? else {
            return Ok(false);
        };
        self.history.push(change);
        Ok(true)
    }

    /// Clear `id` at the cursor when fully keyed, key it otherwise.
    ///
    /// Recorded together with the cursor position so undo returns to this frame.
    pub fn toggle_keyframe(&mut self, id: AttributeId) -> CamtrackResult<bool> {
        let frame = self.current_frame();
        let edit = if self.has_keyframe(id) {
            CompositeAttribute::from(id).clear_keyframe_at(&mut self.state, frame)?
        } else {
            self.key_attribute(id)?
        };
        let Some(edit) = edit else {
            return Ok(false);
        };
        let group = Change::group(vec![Change::active_frame(frame, frame), edit]).into_applied();
        self.history.push(group);
        Ok(true)
    }

    pub fn set_channel_locked(&mut self, channel: Channel, locked: bool) {
        self.state.animation.set_channel_locked(channel, locked);
    }

    pub fn auto_keyframe(&self) -> bool {
        self.opts.auto_keyframe
    }

    pub fn set_auto_keyframe(&mut self, enabled: bool) {
        self.opts.auto_keyframe = enabled;
    }

    /// Flip auto-keying and return the new setting.
    pub fn toggle_auto_keyframe(&mut self) -> bool {
        self.opts.auto_keyframe = !self.opts.auto_keyframe;
        tracing::debug!(enabled = self.opts.auto_keyframe, "auto keyframe toggled");
        self.opts.auto_keyframe
    }

    /// Undo the last edit. Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> CamtrackResult<bool> {
        let undone = self.history.undo(&mut self.state)?.is_some();
        if undone {
            self.overrides.clear();
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> CamtrackResult<bool> {
        let redone = self.history.redo(&mut self.state)?.is_some();
        if redone {
            self.overrides.clear();
        }
        Ok(redone)
    }

    fn key_attribute(&mut self, id: AttributeId) -> CamtrackResult<Option<Change>> {
        let frame = self.current_frame();
        let overrides = &self.overrides;
        let change = CompositeAttribute::from(id).set_keyframe_at_with(
            &mut self.state,
            frame,
            self.opts.default_interp,
            |ch, curve| match overrides.get(&ch) {
                Some(v) => *v,
                None => curve.value_or(frame.as_time(), ch.base_value()),
            },
        )?;
        for ch in id.channels() {
            self.overrides.remove(ch);
        }
        Ok(change)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/edit/context.rs"]
mod tests;
