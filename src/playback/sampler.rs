use std::sync::Arc;

use crate::{
    animation::model::{Animation, AnimationSettings},
    config::SamplerOpts,
    foundation::core::{FrameIndex, FrameTime, Resolution},
    foundation::error::{CamtrackError, CamtrackResult},
    playback::pose::CameraPose,
    playback::sink::{CapturedFrame, FrameWriter, ImageFileSink, ImageSink, WriteTicket},
};

/// Lowest time dilation ever requested from the host.
pub const MIN_TIME_DILATION: f64 = 1e-4;

/// Application side of playback: the camera, the renderer and the world clock.
pub trait PlaybackHost {
    /// Take over the camera for the duration of a run.
    fn acquire_camera(&mut self, settings: &AnimationSettings);

    fn apply_pose(&mut self, pose: &CameraPose);

    /// Render the current camera view into an owned RGBA8 buffer.
    fn capture_frame(&mut self, resolution: Resolution) -> CamtrackResult<CapturedFrame>;

    /// Hand the camera (and input) back to the application.
    fn release_camera(&mut self);

    /// Scale applied to the world clock from now on. Render runs set it every tick: one frame's
    /// worth after a capture, [`MIN_TIME_DILATION`] otherwise.
    fn set_time_dilation(&mut self, _dilation: f64) {}

    /// `false` while the world is still streaming in; render ticks wait for it.
    fn world_ready(&self) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Real-time playback driven by wall-clock deltas.
    Preview,
    /// One captured and persisted image per frame.
    Render,
}

/// What a single [`AnimationSampler::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// No run is active.
    Idle,
    Previewed { frame: FrameTime },
    /// `frame` was captured and its image written.
    Captured { frame: FrameIndex },
    /// The image of `frame` is still being written.
    WriteInFlight { frame: FrameIndex },
    /// Capturing or writing `frame` failed; it is retried on the next tick.
    WriteFailed { frame: FrameIndex, attempt: u32 },
    WorldNotReady,
    /// The run reached its end boundary and the sampler is idle again.
    Finished,
}

struct RenderState {
    frame: FrameIndex,
    pending: Option<WriteTicket>,
    failures: u32,
}

enum Settled {
    Advanced { done: bool },
    Retry { attempt: u32 },
}

impl RenderState {
    fn settle(&mut self, ok: bool, end: FrameIndex, max_retries: u32) -> CamtrackResult<Settled> {
        if ok {
            tracing::debug!(frame = self.frame.0, "frame written");
            self.failures = 0;
            self.frame = self.frame.offset(1);
            return Ok(Settled::Advanced {
                done: self.frame >= end,
            });
        }
        self.failures += 1;
        if self.failures > max_retries {
            return Err(CamtrackError::capture(format!(
                "frame {} failed {} times; aborting render",
                self.frame, self.failures
            )));
        }
        tracing::warn!(frame = self.frame.0, attempt = self.failures, "frame write failed; retrying");
        Ok(Settled::Retry {
            attempt: self.failures,
        })
    }
}

enum Phase {
    Preview { progress_secs: f64 },
    Render(RenderState),
}

struct Run {
    anim: Arc<Animation>,
    phase: Phase,
}

/// Drives a camera from an [`Animation`] in preview or render mode.
///
/// `Idle -> Active(Preview | Render) -> Idle`. Render mode never captures a new frame while the
/// previous one is still being written, and [`AnimationSampler::stop`] discards the outcome of a
/// write that is still in flight.
pub struct AnimationSampler {
    opts: SamplerOpts,
    writer: FrameWriter,
    run: Option<Run>,
    idle_progress: f64,
}

impl AnimationSampler {
    /// Sampler writing captures to disk in `opts.image_format`.
    pub fn new(opts: SamplerOpts) -> CamtrackResult<Self> {
        let sink = ImageFileSink::new(opts.image_format);
        Self::with_sink(opts, Box::new(sink))
    }

    pub fn with_sink(opts: SamplerOpts, sink: Box<dyn ImageSink>) -> CamtrackResult<Self> {
        let writer = FrameWriter::new(opts.write_mode, sink)?;
        Ok(Self {
            opts,
            writer,
            run: None,
            idle_progress: 0.0,
        })
    }

    pub fn opts(&self) -> &SamplerOpts {
        &self.opts
    }

    pub fn is_active(&self) -> bool {
        self.run.is_some()
    }

    pub fn mode(&self) -> Option<PlaybackMode> {
        self.run.as_ref().map(|r| match r.phase {
            Phase::Preview { .. } => PlaybackMode::Preview,
            Phase::Render(_) => PlaybackMode::Render,
        })
    }

    pub fn animation(&self) -> Option<&Arc<Animation>> {
        self.run.as_ref().map(|r| &r.anim)
    }

    /// Seconds into the timeline in preview mode, the next frame to capture in render mode.
    /// When idle, the start boundary of the last run.
    pub fn progress(&self) -> f64 {
        match self.run.as_ref().map(|r| &r.phase) {
            None => self.idle_progress,
            Some(Phase::Preview { progress_secs }) => *progress_secs,
            Some(Phase::Render(state)) => state.frame.as_time(),
        }
    }

    pub fn write_in_flight(&self) -> bool {
        matches!(
            self.run.as_ref().map(|r| &r.phase),
            Some(Phase::Render(RenderState {
                pending: Some(_),
                ..
            }))
        )
    }

    /// Block until the in-flight write (if any) finishes. The next tick consumes its outcome.
    pub fn wait_for_write(&mut self) -> CamtrackResult<Option<bool>> {
        let pending = match self.run.as_ref().map(|r| &r.phase) {
            Some(Phase::Render(state)) => state.pending,
            _ => None,
        };
        pending.map(|t| self.writer.wait(t)).transpose()
    }

    /// Begin playing `anim`. An active run is stopped first.
    #[tracing::instrument(skip(self, anim, host), fields(animation = anim.name()))]
    pub fn start<H: PlaybackHost + ?Sized>(
        &mut self,
        anim: Arc<Animation>,
        mode: PlaybackMode,
        host: &mut H,
    ) -> CamtrackResult<()> {
        if self.stop(host) {
            tracing::info!("stopped previous run");
        }

        let settings = *anim.settings();
        settings.validate()?;
        host.acquire_camera(&settings);

        let phase = match mode {
            PlaybackMode::Preview => Phase::Preview {
                progress_secs: settings.start_secs(),
            },
            PlaybackMode::Render => {
                if settings.bullet_time {
                    host.set_time_dilation(MIN_TIME_DILATION);
                }
                Phase::Render(RenderState {
                    frame: settings.range.start,
                    pending: None,
                    failures: 0,
                })
            }
        };
        tracing::info!(
            ?mode,
            start = settings.range.start.0,
            end = settings.range.end.0,
            "sampler started"
        );
        self.run = Some(Run { anim, phase });
        Ok(())
    }

    /// Advance the active run by one host update of `dt` seconds.
    ///
    /// A render run that exhausts its write retries is stopped and reported as
    /// [`CamtrackError::Capture`].
    pub fn tick<H: PlaybackHost + ?Sized>(
        &mut self,
        dt: f64,
        host: &mut H,
    ) -> CamtrackResult<TickOutcome> {
        let Some(run) = self.run.as_mut() else {
            return Ok(TickOutcome::Idle);
        };

        let step = match &mut run.phase {
            Phase::Preview { progress_secs } => Ok(preview_tick(&run.anim, progress_secs, dt, host)),
            Phase::Render(state) => {
                render_tick(&run.anim, state, &mut self.writer, &self.opts, dt, host)
            }
        };

        match step {
            Ok((_, true)) => {
                self.stop(host);
                tracing::info!("animation finished");
                Ok(TickOutcome::Finished)
            }
            Ok((outcome, false)) => Ok(outcome),
            Err(err) => {
                tracing::error!(%err, "render aborted");
                self.stop(host);
                Err(err)
            }
        }
    }

    /// End the active run. Returns `false` (and does nothing) when already idle.
    ///
    /// Releases the camera, restores normal time dilation after a render and rewinds progress to
    /// the start boundary.
    pub fn stop<H: PlaybackHost + ?Sized>(&mut self, host: &mut H) -> bool {
        let Some(run) = self.run.take() else {
            return false;
        };
        let settings = run.anim.settings();
        match run.phase {
            Phase::Preview { .. } => {
                self.idle_progress = settings.start_secs();
            }
            Phase::Render(state) => {
                if let Some(ticket) = state.pending {
                    self.writer.forget(ticket);
                }
                host.set_time_dilation(1.0);
                self.idle_progress = settings.range.start.as_time();
            }
        }
        host.release_camera();
        tracing::info!(animation = run.anim.name(), "sampler stopped");
        true
    }
}

fn preview_tick<H: PlaybackHost + ?Sized>(
    anim: &Animation,
    progress_secs: &mut f64,
    dt: f64,
    host: &mut H,
) -> (TickOutcome, bool) {
    if dt.is_finite() && dt > 0.0 {
        *progress_secs += dt;
    }
    let settings = anim.settings();
    let frame = settings.fps.secs_to_frame_time(*progress_secs);
    host.apply_pose(&CameraPose::sample(anim, frame));
    (
        TickOutcome::Previewed { frame },
        *progress_secs >= settings.end_secs(),
    )
}

/// Result of one render tick before the world clock is paced.
struct RenderStep {
    outcome: TickOutcome,
    done: bool,
    /// A new frame was captured and handed to the writer.
    captured: bool,
}

impl RenderStep {
    fn idle(outcome: TickOutcome) -> Self {
        Self {
            outcome,
            done: false,
            captured: false,
        }
    }
}

fn render_tick<H: PlaybackHost + ?Sized>(
    anim: &Animation,
    state: &mut RenderState,
    writer: &mut FrameWriter,
    opts: &SamplerOpts,
    dt: f64,
    host: &mut H,
) -> CamtrackResult<(TickOutcome, bool)> {
    let settings = anim.settings();
    let step = render_step(anim, state, writer, opts, host)?;

    // One simulated frame per captured image: the world only moves after a capture.
    if !settings.bullet_time && step.outcome != TickOutcome::Finished {
        let dilation = if step.captured && dt.is_finite() && dt > 0.0 {
            (1.0 / (settings.fps.as_f64() * dt)).max(MIN_TIME_DILATION)
        } else {
            MIN_TIME_DILATION
        };
        host.set_time_dilation(dilation);
    }
    Ok((step.outcome, step.done))
}

fn render_step<H: PlaybackHost + ?Sized>(
    anim: &Animation,
    state: &mut RenderState,
    writer: &mut FrameWriter,
    opts: &SamplerOpts,
    host: &mut H,
) -> CamtrackResult<RenderStep> {
    let settings = anim.settings();
    let end = settings.range.end;

    if !host.world_ready() {
        return Ok(RenderStep::idle(TickOutcome::WorldNotReady));
    }

    if let Some(ticket) = state.pending {
        let Some(ok) = writer.poll(ticket) else {
            return Ok(RenderStep::idle(TickOutcome::WriteInFlight { frame: state.frame }));
        };
        state.pending = None;
        let frame = state.frame;
        match state.settle(ok, end, opts.max_write_retries)? {
            Settled::Advanced { done: true } => {
                return Ok(RenderStep {
                    outcome: TickOutcome::Captured { frame },
                    done: true,
                    captured: false,
                });
            }
            Settled::Advanced { done: false } => {}
            Settled::Retry { attempt } => {
                return Ok(RenderStep::idle(TickOutcome::WriteFailed { frame, attempt }));
            }
        }
    }

    if state.frame >= end {
        return Ok(RenderStep {
            outcome: TickOutcome::Finished,
            done: true,
            captured: false,
        });
    }

    let frame = state.frame;
    host.apply_pose(&CameraPose::at_frame(anim, frame));
    let captured = match host.capture_frame(settings.resolution) {
        Ok(captured) => captured,
        Err(err) => {
            tracing::warn!(frame = frame.0, %err, "frame capture failed");
            return Ok(match state.settle(false, end, opts.max_write_retries)? {
                Settled::Retry { attempt } => {
                    RenderStep::idle(TickOutcome::WriteFailed { frame, attempt })
                }
                Settled::Advanced { done } => RenderStep {
                    outcome: TickOutcome::Captured { frame },
                    done,
                    captured: true,
                },
            });
        }
    };

    let path = opts
        .output_root
        .join(anim.name())
        .join(format!("{}.{}", frame.0, opts.image_format.extension()));
    let ticket = writer.submit(captured, path)?;

    Ok(match writer.poll(ticket) {
        None => {
            state.pending = Some(ticket);
            RenderStep {
                outcome: TickOutcome::WriteInFlight { frame },
                done: false,
                captured: true,
            }
        }
        Some(ok) => match state.settle(ok, end, opts.max_write_retries)? {
            Settled::Advanced { done } => RenderStep {
                outcome: TickOutcome::Captured { frame },
                done,
                captured: true,
            },
            // The frame is captured again, so the world must not move in between.
            Settled::Retry { attempt } => {
                RenderStep::idle(TickOutcome::WriteFailed { frame, attempt })
            }
        },
    })
}

#[cfg(test)]
#[path = "../../tests/unit/playback/sampler.rs"]
mod tests;
