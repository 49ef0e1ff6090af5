use crate::foundation::core::FrameIndex;

/// Interpolation strategy for the segment that ends at a keyframe.
///
/// The mode stored on the right-hand keyframe of a segment governs that segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interp {
    /// Hold the previous key value until this keyframe is reached.
    Constant,
    /// Straight-line blend from the previous key value.
    Linear,
    /// Cubic Hermite blend with tangents estimated from neighbouring keys.
    #[default]
    Smooth,
}

/// One `(frame, value, interpolation)` anchor of a [`Curve`](crate::Curve).
///
/// Serialized as a `[frame, value, interp]` tuple.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "KeyframeRepr", into = "KeyframeRepr")]
pub struct Keyframe {
    pub frame: FrameIndex,
    pub value: f64,
    pub interp: Interp,
}

impl Keyframe {
    pub fn new(frame: FrameIndex, value: f64, interp: Interp) -> Self {
        Self {
            frame,
            value,
            interp,
        }
    }

    /// Same key moved to a different value, keeping frame and mode.
    pub fn with_value(self, value: f64) -> Self {
        Self { value, ..self }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct KeyframeRepr(FrameIndex, f64, Interp);

impl From<KeyframeRepr> for Keyframe {
    fn from(r: KeyframeRepr) -> Self {
        Self::new(r.0, r.1, r.2)
    }
}

impl From<Keyframe> for KeyframeRepr {
    fn from(k: Keyframe) -> Self {
        Self(k.frame, k.value, k.interp)
    }
}
