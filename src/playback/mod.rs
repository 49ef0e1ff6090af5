//! Driving a camera from an animation: preview, render capture and pose baking.

/// Camera poses and baking.
pub mod pose;
/// Preview/render state machine.
pub mod sampler;
/// Image sinks and the capture writer.
pub mod sink;
