/// Convenience result type used across camtrack.
pub type CamtrackResult<T> = Result<T, CamtrackError>;

/// Top-level error taxonomy used by library APIs.
#[derive(thiserror::Error, Debug)]
pub enum CamtrackError {
    /// Invalid user-provided animation or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while building or sampling curves.
    #[error("animation error: {0}")]
    Animation(String),

    /// An edit could not be applied, undone or redone.
    #[error("edit error: {0}")]
    Edit(String),

    /// Frame capture or image persistence failed during playback.
    #[error("capture error: {0}")]
    Capture(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CamtrackError {
    /// Build a [`CamtrackError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CamtrackError::Animation`] value.
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    /// Build a [`CamtrackError::Edit`] value.
    pub fn edit(msg: impl Into<String>) -> Self {
        Self::Edit(msg.into())
    }

    /// Build a [`CamtrackError::Capture`] value.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Build a [`CamtrackError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
