use glam::DVec3;
use rayon::prelude::*;

use crate::{
    animation::attribute::Channel,
    animation::model::Animation,
    foundation::core::{FrameIndex, FrameTime, SensorSize},
    foundation::error::{CamtrackError, CamtrackResult},
};

/// Euler rotation in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rotator {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Physical lens state, driven only for cinematic animations.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Lens {
    pub sensor: SensorSize,
    pub aperture: f64,
    pub focus_distance: f64,
}

/// Camera state evaluated from every channel of an [`Animation`] at one timeline position.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraPose {
    pub position: DVec3,
    pub rotation: Rotator,
    /// Horizontal field of view in degrees.
    pub fov: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens: Option<Lens>,
}

impl CameraPose {
    /// Evaluate `anim` at fractional `frame`. Empty channels use their base value.
    pub fn sample(anim: &Animation, frame: FrameTime) -> Self {
        let v = |ch: Channel| anim.channel_value(ch, frame);
        let settings = anim.settings();
        Self {
            position: DVec3::new(v(Channel::PosX), v(Channel::PosY), v(Channel::PosZ)),
            rotation: Rotator {
                pitch: v(Channel::RotPitch),
                yaw: v(Channel::RotYaw),
                roll: v(Channel::RotRoll),
            },
            fov: v(Channel::Fov),
            lens: settings.cinematic.then(|| Lens {
                sensor: settings.sensor,
                aperture: v(Channel::Aperture),
                focus_distance: v(Channel::FocusDistance),
            }),
        }
    }

    pub fn at_frame(anim: &Animation, frame: FrameIndex) -> Self {
        Self::sample(anim, frame.as_time())
    }
}

/// Pose of one frame in a baked range.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BakedPose {
    pub frame: FrameIndex,
    pub pose: CameraPose,
}

#[derive(Clone, Debug, Default)]
pub struct BakeOpts {
    pub parallel: bool,
    /// Worker count for parallel bakes; `None` uses rayon's default.
    pub threads: Option<usize>,
}

/// Evaluate the pose of every frame in the animation's range, in frame order.
#[tracing::instrument(skip(anim), fields(animation = anim.name()))]
pub fn bake_poses(anim: &Animation, opts: &BakeOpts) -> CamtrackResult<Vec<BakedPose>> {
    let range = anim.settings().range;
    let bake_one = |frame: FrameIndex| BakedPose {
        frame,
        pose: CameraPose::at_frame(anim, frame),
    };

    let out: Vec<BakedPose> = if opts.parallel {
        let pool = build_thread_pool(opts.threads)?;
        pool.install(|| {
            (range.start.0..range.end.0)
                .into_par_iter()
                .map(|f| bake_one(FrameIndex(f)))
                .collect()
        })
    } else {
        range.iter().map(bake_one).collect()
    };

    tracing::debug!(frames = out.len(), "baked poses");
    Ok(out)
}

fn build_thread_pool(threads: Option<usize>) -> CamtrackResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(CamtrackError::validation(
            "bake 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| CamtrackError::animation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/playback/pose.rs"]
mod tests;
