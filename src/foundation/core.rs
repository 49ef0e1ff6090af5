use crate::foundation::error::{CamtrackError, CamtrackResult};

/// Integer index into an animation timeline.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct FrameIndex(pub i64);

impl FrameIndex {
    /// Offset by `delta` frames, saturating at the `i64` bounds.
    pub fn offset(self, delta: i64) -> Self {
        Self(self.0.saturating_add(delta))
    }

    /// Fractional timeline position of this frame.
    pub fn as_time(self) -> FrameTime {
        self.0 as f64
    }
}

impl std::fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fractional timeline position measured in frames.
///
/// Curves are sampled at fractional frames during preview playback, where the frame is derived
/// from wall-clock seconds.
pub type FrameTime = f64;

/// Half-open frame range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    pub start: FrameIndex,
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    pub fn new(start: FrameIndex, end: FrameIndex) -> CamtrackResult<Self> {
        if start.0 > end.0 {
            return Err(CamtrackError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Build a range from second boundaries, rounding each to the nearest frame.
    pub fn from_secs(fps: Fps, start_secs: f64, end_secs: f64) -> CamtrackResult<Self> {
        if !start_secs.is_finite() || !end_secs.is_finite() {
            return Err(CamtrackError::validation(
                "FrameRange seconds must be finite",
            ));
        }
        Self::new(
            FrameIndex((start_secs * fps.as_f64()).round() as i64),
            FrameIndex((end_secs * fps.as_f64()).round() as i64),
        )
    }

    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0).max(0) as u64
    }

    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    pub fn start_secs(self, fps: Fps) -> f64 {
        fps.frames_to_secs(self.start.0)
    }

    pub fn end_secs(self, fps: Fps) -> f64 {
        fps.frames_to_secs(self.end.0)
    }

    pub fn iter(self) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..self.end.0).map(FrameIndex)
    }
}

/// Integer frame rate (frames per second, `> 0`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Fps(pub u32);

impl Fps {
    pub fn new(per_sec: u32) -> CamtrackResult<Self> {
        if per_sec == 0 {
            return Err(CamtrackError::validation("Fps must be > 0"));
        }
        Ok(Self(per_sec))
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }

    pub fn frame_duration_secs(self) -> f64 {
        1.0 / self.as_f64()
    }

    pub fn frames_to_secs(self, frames: i64) -> f64 {
        (frames as f64) / self.as_f64()
    }

    pub fn secs_to_frame_time(self, secs: f64) -> FrameTime {
        secs * self.as_f64()
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self(30)
    }
}

/// Output image size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> CamtrackResult<Self> {
        if width == 0 || height == 0 {
            return Err(CamtrackError::validation(
                "Resolution width/height must be > 0",
            ));
        }
        Ok(Self { width, height })
    }

    /// Byte length of a tightly packed RGBA8 buffer at this size.
    pub fn rgba_len(self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Physical sensor size of a cinematic camera, in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SensorSize {
    pub width: f64,
    pub height: f64,
}

impl SensorSize {
    pub fn validate(self) -> CamtrackResult<()> {
        let ok = |v: f64| v.is_finite() && v >= 0.0;
        if !ok(self.width) || !ok(self.height) {
            return Err(CamtrackError::validation(
                "SensorSize width/height must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

impl Default for SensorSize {
    fn default() -> Self {
        // Super 35 gate.
        Self {
            width: 24.89,
            height: 18.67,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
