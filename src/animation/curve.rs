use crate::{
    animation::keyframe::{Interp, Keyframe},
    animation::spline::{hermite, lerp},
    foundation::core::{FrameIndex, FrameTime},
    foundation::error::{CamtrackError, CamtrackResult},
};

/// Value returned when a curve has no keyframes.
pub const NEUTRAL_VALUE: f64 = 0.0;

/// Keyframe track for one scalar channel.
///
/// Keys are kept sorted by strictly increasing frame; a frame identifies at most one key.
/// Serialized as an ordered list of `[frame, value, interp]` tuples.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct Curve {
    keys: Vec<Keyframe>,
    locked: bool,
}

impl Curve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a curve from keys in any order. Duplicate frames are rejected.
    pub fn from_keys(keys: impl IntoIterator<Item = Keyframe>) -> CamtrackResult<Self> {
        let mut keys: Vec<Keyframe> = keys.into_iter().collect();
        keys.sort_by_key(|k| k.frame);
        if let Some(w) = keys.windows(2).find(|w| w[0].frame == w[1].frame) {
            return Err(CamtrackError::animation(format!(
                "duplicate keyframe at frame {}",
                w[0].frame
            )));
        }
        if let Some(k) = keys.iter().find(|k| !k.value.is_finite()) {
            return Err(CamtrackError::animation(format!(
                "keyframe at frame {} has a non-finite value",
                k.frame
            )));
        }
        Ok(Self {
            keys,
            locked: false,
        })
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn first(&self) -> Option<&Keyframe> {
        self.keys.first()
    }

    pub fn last(&self) -> Option<&Keyframe> {
        self.keys.last()
    }

    /// Locked curves refuse edits routed through [`ChangeTarget`](crate::ChangeTarget).
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    fn search(&self, frame: FrameIndex) -> Result<usize, usize> {
        self.keys.binary_search_by_key(&frame, |k| k.frame)
    }

    pub fn keyframe_at(&self, frame: FrameIndex) -> Option<&Keyframe> {
        self.search(frame).ok().map(|i| &self.keys[i])
    }

    pub fn has_keyframe_at(&self, frame: FrameIndex) -> bool {
        self.search(frame).is_ok()
    }

    /// Insert `key`, replacing any key at the same frame. Returns the replaced key.
    pub fn add_or_replace_keyframe(&mut self, key: Keyframe) -> Option<Keyframe> {
        match self.search(key.frame) {
            Ok(i) => Some(std::mem::replace(&mut self.keys[i], key)),
            Err(i) => {
                self.keys.insert(i, key);
                None
            }
        }
    }

    /// Remove the key at exactly `frame`. No-op (returns `None`) when absent.
    pub fn remove_keyframe(&mut self, frame: FrameIndex) -> Option<Keyframe> {
        self.search(frame).ok().map(|i| self.keys.remove(i))
    }

    /// Nearest key strictly before `frame`.
    pub fn prev_keyframe(&self, frame: FrameIndex) -> Option<&Keyframe> {
        let idx = self.keys.partition_point(|k| k.frame < frame);
        idx.checked_sub(1).map(|i| &self.keys[i])
    }

    /// Nearest key strictly after `frame`.
    pub fn next_keyframe(&self, frame: FrameIndex) -> Option<&Keyframe> {
        let idx = self.keys.partition_point(|k| k.frame <= frame);
        self.keys.get(idx)
    }

    /// Evaluate at an integer frame.
    pub fn value_at(&self, frame: FrameIndex) -> f64 {
        self.sample(frame.as_time())
    }

    /// Evaluate at `frame`, using `base` instead of [`NEUTRAL_VALUE`] when empty.
    pub fn value_or(&self, frame: FrameTime, base: f64) -> f64 {
        if self.keys.is_empty() {
            base
        } else {
            self.sample(frame)
        }
    }

    /// Evaluate at a fractional frame.
    ///
    /// Empty curves yield [`NEUTRAL_VALUE`]; frames outside the keyed span hold the first/last
    /// value. Inside, the right-hand key's [`Interp`] selects the blend.
    pub fn sample(&self, frame: FrameTime) -> f64 {
        let Some(first) = self.keys.first() else {
            return NEUTRAL_VALUE;
        };
        if frame.is_nan() {
            return first.value;
        }

        let idx = self.keys.partition_point(|k| (k.frame.0 as f64) <= frame);
        if idx == 0 {
            return first.value;
        }
        if idx >= self.keys.len() {
            return self.keys[self.keys.len() - 1].value;
        }

        let a = &self.keys[idx - 1];
        let b = &self.keys[idx];
        let span = b.frame.0 as f64 - a.frame.0 as f64;
        let t = (frame - a.frame.0 as f64) / span;

        match b.interp {
            Interp::Constant => a.value,
            Interp::Linear => lerp(a.value, b.value, t),
            Interp::Smooth => {
                let m0 = self.slope(idx - 1) * span;
                let m1 = self.slope(idx) * span;
                hermite(a.value, b.value, m0, m1, t)
            }
        }
    }

    /// Finite-difference slope (value per frame) at key `i`: centred across both neighbours
    /// inside the curve, one-sided at either end.
    fn slope(&self, i: usize) -> f64 {
        let n = self.keys.len();
        if n < 2 {
            return 0.0;
        }
        let (lo, hi) = match i {
            0 => (0, 1),
            _ if i + 1 >= n => (n - 2, n - 1),
            _ => (i - 1, i + 1),
        };
        let a = &self.keys[lo];
        let b = &self.keys[hi];
        (b.value - a.value) / (b.frame.0 as f64 - a.frame.0 as f64)
    }
}

impl TryFrom<Vec<Keyframe>> for Curve {
    type Error = CamtrackError;

    fn try_from(keys: Vec<Keyframe>) -> Result<Self, Self::Error> {
        Self::from_keys(keys)
    }
}

impl From<Curve> for Vec<Keyframe> {
    fn from(curve: Curve) -> Self {
        curve.keys
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/curve.rs"]
mod tests;
