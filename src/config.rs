use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::{
    animation::keyframe::Interp,
    foundation::error::{CamtrackError, CamtrackResult},
};

/// Session configuration, loaded from JSON. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CamtrackConfig {
    pub editor: EditorOpts,
    pub sampler: SamplerOpts,
}

impl CamtrackConfig {
    pub fn from_reader<R: std::io::Read>(r: R) -> CamtrackResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| CamtrackError::serde(format!("parse config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> CamtrackResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CamtrackError::validation(format!("open config JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> CamtrackResult<()> {
        if self.editor.history_limit == Some(0) {
            return Err(CamtrackError::validation(
                "editor.history_limit must be >= 1 when set",
            ));
        }
        if self.sampler.output_root.as_os_str().is_empty() {
            return Err(CamtrackError::validation(
                "sampler.output_root must be non-empty",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorOpts {
    /// Maximum undo depth; `None` keeps every change.
    pub history_limit: Option<usize>,
    /// Mode for keyframes created by grouped toggles and auto-keying.
    pub default_interp: Interp,
    /// Value edits at an un-keyed frame create a keyframe instead of a temporary override.
    pub auto_keyframe: bool,
}

impl Default for EditorOpts {
    fn default() -> Self {
        Self {
            history_limit: None,
            default_interp: Interp::Smooth,
            auto_keyframe: false,
        }
    }
}

/// Image encoding used for render captures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Where render captures are encoded and written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// On the tick that captured the frame.
    Inline,
    /// On a dedicated writer thread.
    #[default]
    Background,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerOpts {
    /// Render captures go to `<output_root>/<animation name>/<frame>.<ext>`.
    pub output_root: PathBuf,
    pub image_format: ImageFormat,
    pub write_mode: WriteMode,
    /// Consecutive failed writes of one frame tolerated before the render aborts.
    pub max_write_retries: u32,
}

impl Default for SamplerOpts {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("captures"),
            image_format: ImageFormat::Jpeg,
            write_mode: WriteMode::Background,
            max_write_retries: 3,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
