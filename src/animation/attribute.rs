use crate::{
    animation::curve::Curve,
    animation::keyframe::{Interp, Keyframe},
    edit::change::{Change, ChangeTarget},
    foundation::core::FrameIndex,
    foundation::error::{CamtrackError, CamtrackResult},
};

/// Stable handle for one scalar channel of an [`Animation`](crate::Animation).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    PosX,
    PosY,
    PosZ,
    RotPitch,
    RotYaw,
    RotRoll,
    Fov,
    Aperture,
    FocusDistance,
}

impl Channel {
    pub const COUNT: usize = 9;

    pub const ALL: [Channel; Self::COUNT] = [
        Self::PosX,
        Self::PosY,
        Self::PosZ,
        Self::RotPitch,
        Self::RotYaw,
        Self::RotRoll,
        Self::Fov,
        Self::Aperture,
        Self::FocusDistance,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Persistence key.
    pub fn name(self) -> &'static str {
        match self {
            Self::PosX => "pos_x",
            Self::PosY => "pos_y",
            Self::PosZ => "pos_z",
            Self::RotPitch => "rot_pitch",
            Self::RotYaw => "rot_yaw",
            Self::RotRoll => "rot_roll",
            Self::Fov => "fov",
            Self::Aperture => "aperture",
            Self::FocusDistance => "focus_distance",
        }
    }

    /// Value used for the camera when the channel has no keyframes.
    pub fn base_value(self) -> f64 {
        match self {
            Self::Fov => 90.0,
            Self::Aperture => 2.8,
            Self::FocusDistance => 100_000.0,
            _ => 0.0,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in composite attributes exposed by every animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeId {
    /// Every channel.
    All,
    Position,
    Rotation,
    Fov,
    Aperture,
    FocusDistance,
}

impl AttributeId {
    pub fn channels(self) -> &'static [Channel] {
        match self {
            Self::All => &Channel::ALL,
            Self::Position => &[Channel::PosX, Channel::PosY, Channel::PosZ],
            Self::Rotation => &[Channel::RotPitch, Channel::RotYaw, Channel::RotRoll],
            Self::Fov => &[Channel::Fov],
            Self::Aperture => &[Channel::Aperture],
            Self::FocusDistance => &[Channel::FocusDistance],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Position => "position",
            Self::Rotation => "rotation",
            Self::Fov => "fov",
            Self::Aperture => "aperture",
            Self::FocusDistance => "focus_distance",
        }
    }
}

/// Named group of channels edited as one keyframe unit.
///
/// Children are handles resolved through a [`ChangeTarget`] at call time; the attribute owns no
/// curve data. A grouped keyframe at frame `F` means every child has a key at `F`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeAttribute {
    name: String,
    channels: Vec<Channel>,
}

impl CompositeAttribute {
    pub fn new(name: impl Into<String>, channels: impl IntoIterator<Item = Channel>) -> Self {
        let mut out = Vec::new();
        for ch in channels {
            if !out.contains(&ch) {
                out.push(ch);
            }
        }
        Self {
            name: name.into(),
            channels: out,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// `true` iff every child has a key at `frame`. An attribute without children has none.
    pub fn has_keyframe_at<T: ChangeTarget + ?Sized>(&self, target: &T, frame: FrameIndex) -> bool {
        !self.channels.is_empty()
            && self
                .channels
                .iter()
                .all(|&ch| target.curve(ch).has_keyframe_at(frame))
    }

    /// Key every child that lacks a key at `frame` with its currently evaluated value.
    ///
    /// See [`CompositeAttribute::set_keyframe_at_with`].
    pub fn set_keyframe_at<T: ChangeTarget + ?Sized>(
        &self,
        target: &mut T,
        frame: FrameIndex,
        interp: Interp,
    ) -> CamtrackResult<Option<Change>> {
        self.set_keyframe_at_with(target, frame, interp, |_, curve| {
            curve.value_at(frame)
        })
    }

    /// Key every child that lacks a key at `frame`, taking each new value from `value_of`.
    ///
    /// All-or-nothing: every affected child is checked for writability before any curve is
    /// touched, and a write that still fails rolls back the children already written. On success
    /// returns the applied group, ready for [`ChangeList::push`](crate::ChangeList::push);
    /// `None` when every child was already keyed.
    pub fn set_keyframe_at_with<T, F>(
        &self,
        target: &mut T,
        frame: FrameIndex,
        interp: Interp,
        value_of: F,
    ) -> CamtrackResult<Option<Change>>
    where
        T: ChangeTarget + ?Sized,
        F: Fn(Channel, &Curve) -> f64,
    {
        let missing: Vec<Channel> = self
            .channels
            .iter()
            .copied()
            .filter(|&ch| !target.curve(ch).has_keyframe_at(frame))
            .collect();
        if missing.is_empty() {
            return Ok(None);
        }
        self.ensure_writable(&*target, &missing)?;

        let children = missing
            .into_iter()
            .map(|ch| {
                let curve = target.curve(ch);
                let key = Keyframe::new(frame, value_of(ch, curve), interp);
                Change::set_keyframe(&*target, ch, key)
            })
            .collect();
        let mut group = Change::group(children);
        group.apply(target)?;
        tracing::debug!(attribute = %self.name, frame = frame.0, "keyed composite attribute");
        Ok(Some(group))
    }

    /// Remove the key at `frame` from every child that has one. Same atomicity as
    /// [`CompositeAttribute::set_keyframe_at_with`].
    pub fn clear_keyframe_at<T: ChangeTarget + ?Sized>(
        &self,
        target: &mut T,
        frame: FrameIndex,
    ) -> CamtrackResult<Option<Change>> {
        let keyed: Vec<Channel> = self
            .channels
            .iter()
            .copied()
            .filter(|&ch| target.curve(ch).has_keyframe_at(frame))
            .collect();
        if keyed.is_empty() {
            return Ok(None);
        }
        self.ensure_writable(&*target, &keyed)?;

        let children = keyed
            .into_iter()
            .map(|ch| Change::remove_keyframe(&*target, ch, frame))
            .collect();
        let mut group = Change::group(children);
        group.apply(target)?;
        tracing::debug!(attribute = %self.name, frame = frame.0, "cleared composite attribute");
        Ok(Some(group))
    }

    /// Nearest frame strictly before `frame` at which any child has a key.
    pub fn prev_keyframe<T: ChangeTarget + ?Sized>(
        &self,
        target: &T,
        frame: FrameIndex,
    ) -> Option<FrameIndex> {
        self.channels
            .iter()
            .filter_map(|&ch| target.curve(ch).prev_keyframe(frame).map(|k| k.frame))
            .max()
    }

    /// Nearest frame strictly after `frame` at which any child has a key.
    pub fn next_keyframe<T: ChangeTarget + ?Sized>(
        &self,
        target: &T,
        frame: FrameIndex,
    ) -> Option<FrameIndex> {
        self.channels
            .iter()
            .filter_map(|&ch| target.curve(ch).next_keyframe(frame).map(|k| k.frame))
            .min()
    }

    fn ensure_writable<T: ChangeTarget + ?Sized>(
        &self,
        target: &T,
        channels: &[Channel],
    ) -> CamtrackResult<()> {
        if let Some(ch) = channels.iter().find(|&&ch| target.curve(ch).is_locked()) {
            return Err(CamtrackError::edit(format!(
                "attribute '{}': channel '{ch}' is locked",
                self.name
            )));
        }
        Ok(())
    }
}

impl From<AttributeId> for CompositeAttribute {
    fn from(id: AttributeId) -> Self {
        Self::new(id.name(), id.channels().iter().copied())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/attribute.rs"]
mod tests;
