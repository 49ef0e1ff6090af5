use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::{
    animation::attribute::{AttributeId, Channel, CompositeAttribute},
    animation::curve::Curve,
    animation::keyframe::Keyframe,
    edit::change::ChangeTarget,
    foundation::core::{Fps, FrameIndex, FrameRange, FrameTime, Resolution, SensorSize},
    foundation::error::{CamtrackError, CamtrackResult},
};

/// Scalar playback configuration of an [`Animation`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationSettings {
    pub fps: Fps,
    pub resolution: Resolution,
    pub sensor: SensorSize,
    /// Frames played back; the end frame is not captured.
    pub range: FrameRange,
    /// Drive lens parameters (sensor, aperture, focus) in addition to the transform.
    pub cinematic: bool,
    /// Freeze world simulation while the camera keeps moving.
    pub bullet_time: bool,
}

impl AnimationSettings {
    pub fn validate(&self) -> CamtrackResult<()> {
        if self.fps.0 == 0 {
            return Err(CamtrackError::validation("fps must be > 0"));
        }
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(CamtrackError::validation(
                "resolution width/height must be > 0",
            ));
        }
        self.sensor.validate()?;
        if self.range.start > self.range.end {
            return Err(CamtrackError::validation(
                "start_frame must be <= end_frame",
            ));
        }
        Ok(())
    }

    /// Start boundary in seconds.
    pub fn start_secs(&self) -> f64 {
        self.range.start_secs(self.fps)
    }

    /// End boundary in seconds.
    pub fn end_secs(&self) -> f64 {
        self.range.end_secs(self.fps)
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            resolution: Resolution::default(),
            sensor: SensorSize::default(),
            range: FrameRange {
                start: FrameIndex(0),
                end: FrameIndex(300),
            },
            cinematic: false,
            bullet_time: false,
        }
    }
}

/// Camera animation: one [`Curve`] per [`Channel`] plus playback settings.
///
/// Serialized as a flat JSON object with an `attributes` map from channel name to keyframe tuple
/// lists. Channels without keys may be omitted.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "AnimationDef", into = "AnimationDef")]
pub struct Animation {
    name: String,
    settings: AnimationSettings,
    curves: [Curve; Channel::COUNT],
}

impl Animation {
    /// Empty animation. `name` doubles as the output directory name during render playback.
    pub fn new(name: impl Into<String>, settings: AnimationSettings) -> CamtrackResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        settings.validate()?;
        Ok(Self {
            name,
            settings,
            curves: Default::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AnimationSettings) -> CamtrackResult<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn curve(&self, channel: Channel) -> &Curve {
        &self.curves[channel.index()]
    }

    /// Direct access for programmatic setup. Bypasses the channel lock and records no history.
    pub fn curve_mut(&mut self, channel: Channel) -> &mut Curve {
        &mut self.curves[channel.index()]
    }

    pub fn set_channel_locked(&mut self, channel: Channel, locked: bool) {
        self.curves[channel.index()].set_locked(locked);
    }

    pub fn attribute(&self, id: AttributeId) -> CompositeAttribute {
        CompositeAttribute::from(id)
    }

    /// Channel value at `frame`, falling back to the channel's base value when it has no keys.
    pub fn channel_value(&self, channel: Channel, frame: FrameTime) -> f64 {
        self.curve(channel).value_or(frame, channel.base_value())
    }

    /// Total keyframe count over every channel.
    pub fn keyframe_count(&self) -> usize {
        self.curves.iter().map(Curve::len).sum()
    }

    pub fn from_reader<R: std::io::Read>(r: R) -> CamtrackResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| CamtrackError::serde(format!("parse animation JSON: {e}")))
    }

    pub fn from_json_str(s: &str) -> CamtrackResult<Self> {
        serde_json::from_str(s)
            .map_err(|e| CamtrackError::serde(format!("parse animation JSON: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> CamtrackResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CamtrackError::validation(format!("open animation JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn to_json_string(&self) -> CamtrackResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CamtrackError::serde(format!("serialize animation JSON: {e}")))
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> CamtrackResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(anyhow::Error::from)?;
        }
        let f = File::create(path).map_err(|e| {
            CamtrackError::validation(format!("create animation JSON '{}': {e}", path.display()))
        })?;
        serde_json::to_writer_pretty(BufWriter::new(f), self)
            .map_err(|e| CamtrackError::serde(format!("write animation JSON: {e}")))
    }
}

impl ChangeTarget for Animation {
    fn curve(&self, channel: Channel) -> &Curve {
        Animation::curve(self, channel)
    }

    fn write_keyframe(
        &mut self,
        channel: Channel,
        frame: FrameIndex,
        key: Option<Keyframe>,
    ) -> CamtrackResult<()> {
        let curve = &mut self.curves[channel.index()];
        if curve.is_locked() {
            return Err(CamtrackError::edit(format!("channel '{channel}' is locked")));
        }
        match key {
            Some(k) => {
                if k.frame != frame {
                    return Err(CamtrackError::edit(format!(
                        "keyframe for frame {frame} carries frame {}",
                        k.frame
                    )));
                }
                if !k.value.is_finite() {
                    return Err(CamtrackError::edit(format!(
                        "channel '{channel}': non-finite value at frame {frame}"
                    )));
                }
                curve.add_or_replace_keyframe(k);
            }
            None => {
                curve.remove_keyframe(frame);
            }
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> CamtrackResult<()> {
    if name.trim().is_empty() {
        return Err(CamtrackError::validation("animation name must be non-empty"));
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(CamtrackError::validation(format!(
            "animation name '{name}' must be a plain directory name"
        )));
    }
    Ok(())
}

fn default_fps() -> u32 {
    Fps::default().0
}

fn default_width() -> u32 {
    Resolution::default().width
}

fn default_height() -> u32 {
    Resolution::default().height
}

fn default_sensor_width() -> f64 {
    SensorSize::default().width
}

fn default_sensor_height() -> f64 {
    SensorSize::default().height
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct AnimationDef {
    name: String,
    #[serde(default = "default_fps")]
    fps: u32,
    #[serde(default = "default_width")]
    resolution_width: u32,
    #[serde(default = "default_height")]
    resolution_height: u32,
    #[serde(default = "default_sensor_width")]
    sensor_width: f64,
    #[serde(default = "default_sensor_height")]
    sensor_height: f64,
    start_frame: i64,
    end_frame: i64,
    #[serde(default)]
    cinematic: bool,
    #[serde(default)]
    bullet_time: bool,
    #[serde(default)]
    attributes: BTreeMap<Channel, Curve>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    locked: Vec<Channel>,
}

impl TryFrom<AnimationDef> for Animation {
    type Error = CamtrackError;

    fn try_from(def: AnimationDef) -> Result<Self, Self::Error> {
        let settings = AnimationSettings {
            fps: Fps::new(def.fps)?,
            resolution: Resolution::new(def.resolution_width, def.resolution_height)?,
            sensor: SensorSize {
                width: def.sensor_width,
                height: def.sensor_height,
            },
            range: FrameRange::new(FrameIndex(def.start_frame), FrameIndex(def.end_frame))?,
            cinematic: def.cinematic,
            bullet_time: def.bullet_time,
        };
        let mut anim = Animation::new(def.name, settings)?;
        for (channel, curve) in def.attributes {
            anim.curves[channel.index()] = curve;
        }
        for channel in def.locked {
            anim.set_channel_locked(channel, true);
        }
        Ok(anim)
    }
}

impl From<Animation> for AnimationDef {
    fn from(anim: Animation) -> Self {
        let s = anim.settings;
        let locked = Channel::ALL
            .into_iter()
            .filter(|&ch| anim.curves[ch.index()].is_locked())
            .collect();
        let attributes = Channel::ALL
            .into_iter()
            .zip(anim.curves)
            .filter(|(_, curve)| !curve.is_empty())
            .collect();
        Self {
            name: anim.name,
            fps: s.fps.0,
            resolution_width: s.resolution.width,
            resolution_height: s.resolution.height,
            sensor_width: s.sensor.width,
            sensor_height: s.sensor.height,
            start_frame: s.range.start.0,
            end_frame: s.range.end.0,
            cinematic: s.cinematic,
            bullet_time: s.bullet_time,
            attributes,
            locked,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/model.rs"]
mod tests;
