//! Keyframes, curves and the camera animation model.

/// Channels and composite attributes.
pub mod attribute;
/// Per-channel keyframe tracks.
pub mod curve;
/// Keyframe records and interpolation modes.
pub mod keyframe;
/// Animation settings and persistence.
pub mod model;
pub(crate) mod spline;
