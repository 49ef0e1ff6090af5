//! camtrack authors and plays back keyframed camera motion.
//!
//! - Build an [`Animation`] from per-channel [`Curve`]s
//! - Edit it through an [`EditorContext`], with grouped [`Change`]s recorded in a [`ChangeList`]
//! - Play it back with an [`AnimationSampler`], either as real-time preview or as a frame-locked
//!   image sequence
#![forbid(unsafe_code)]

mod foundation;

pub mod animation;
/// Session configuration.
pub mod config;
pub mod edit;
pub mod playback;

pub use crate::foundation::core::{Fps, FrameIndex, FrameRange, FrameTime, Resolution, SensorSize};
pub use crate::foundation::error::{CamtrackError, CamtrackResult};

pub use crate::animation::attribute::{AttributeId, Channel, CompositeAttribute};
pub use crate::animation::curve::{Curve, NEUTRAL_VALUE};
pub use crate::animation::keyframe::{Interp, Keyframe};
pub use crate::animation::model::{Animation, AnimationSettings};
pub use crate::config::{CamtrackConfig, EditorOpts, ImageFormat, SamplerOpts, WriteMode};
pub use crate::edit::change::{Change, ChangeKind, ChangeTarget};
pub use crate::edit::context::{COARSE_FRAME_STEP, EditState, EditorContext};
pub use crate::edit::history::ChangeList;
pub use crate::playback::pose::{BakeOpts, BakedPose, CameraPose, Lens, Rotator, bake_poses};
pub use crate::playback::sampler::{
    AnimationSampler, MIN_TIME_DILATION, PlaybackHost, PlaybackMode, TickOutcome,
};
pub use crate::playback::sink::{CapturedFrame, FrameWriter, ImageFileSink, ImageSink, WriteTicket};
