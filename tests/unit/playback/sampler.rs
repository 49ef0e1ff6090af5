use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, mpsc};

use super::*;
use crate::animation::attribute::Channel;
use crate::animation::keyframe::{Interp, Keyframe};
use crate::config::{ImageFormat, WriteMode};
use crate::foundation::core::{Fps, FrameRange};

#[derive(Default)]
struct Host {
    acquired: u32,
    released: u32,
    poses: Vec<CameraPose>,
    dilation: Vec<f64>,
    captures: u32,
    fail_captures: u32,
    not_ready: bool,
}

impl PlaybackHost for Host {
    fn acquire_camera(&mut self, _settings: &AnimationSettings) {
        self.acquired += 1;
    }

    fn apply_pose(&mut self, pose: &CameraPose) {
        self.poses.push(*pose);
    }

    fn capture_frame(&mut self, resolution: Resolution) -> CamtrackResult<CapturedFrame> {
        self.captures += 1;
        if self.fail_captures > 0 {
            self.fail_captures -= 1;
            return Err(CamtrackError::capture("render target unavailable"));
        }
        CapturedFrame::new(
            resolution.width,
            resolution.height,
            vec![0; resolution.rgba_len()],
        )
    }

    fn release_camera(&mut self) {
        self.released += 1;
    }

    fn set_time_dilation(&mut self, dilation: f64) {
        self.dilation.push(dilation);
    }

    fn world_ready(&self) -> bool {
        !self.not_ready
    }
}

/// Records written paths; fails the writes listed in `fail`.
#[derive(Clone, Default)]
struct Recorder {
    written: Arc<Mutex<Vec<PathBuf>>>,
    fail: Arc<Mutex<Vec<bool>>>,
}

impl ImageSink for Recorder {
    fn save_frame(&mut self, _pixels: &[u8], _w: u32, _h: u32, path: &Path) -> bool {
        let fail = {
            let mut f = self.fail.lock().unwrap();
            !f.is_empty() && f.remove(0)
        };
        if fail {
            return false;
        }
        self.written.lock().unwrap().push(path.to_path_buf());
        true
    }
}

struct Gate(mpsc::Receiver<bool>);

impl ImageSink for Gate {
    fn save_frame(&mut self, _pixels: &[u8], _w: u32, _h: u32, _path: &Path) -> bool {
        self.0.recv().unwrap_or(false)
    }
}

fn anim(end: i64, bullet_time: bool) -> Arc<Animation> {
    let settings = AnimationSettings {
        fps: Fps(10),
        resolution: Resolution::new(4, 2).unwrap(),
        range: FrameRange::new(FrameIndex(0), FrameIndex(end)).unwrap(),
        bullet_time,
        ..AnimationSettings::default()
    };
    let mut a = Animation::new("shot", settings).unwrap();
    let c = a.curve_mut(Channel::PosX);
    c.add_or_replace_keyframe(Keyframe::new(FrameIndex(0), 0.0, Interp::Linear));
    c.add_or_replace_keyframe(Keyframe::new(FrameIndex(10), 100.0, Interp::Linear));
    Arc::new(a)
}

fn opts(mode: WriteMode) -> SamplerOpts {
    SamplerOpts {
        output_root: PathBuf::from("out"),
        image_format: ImageFormat::Png,
        write_mode: mode,
        max_write_retries: 2,
    }
}

fn inline_sampler() -> (AnimationSampler, Recorder) {
    let rec = Recorder::default();
    let s = AnimationSampler::with_sink(opts(WriteMode::Inline), Box::new(rec.clone())).unwrap();
    (s, rec)
}

#[test]
fn idle_tick_and_stop_are_noops() {
    let (mut s, _) = inline_sampler();
    let mut host = Host::default();
    assert_eq!(s.tick(0.1, &mut host).unwrap(), TickOutcome::Idle);
    assert!(!s.stop(&mut host));
    assert_eq!(host.released, 0);
    assert_eq!(s.progress(), 0.0);
}

#[test]
fn preview_advances_with_wall_clock_and_finishes() {
    let (mut s, _) = inline_sampler();
    let mut host = Host::default();
    s.start(anim(10, false), PlaybackMode::Preview, &mut host).unwrap();
    assert_eq!(s.mode(), Some(PlaybackMode::Preview));
    assert_eq!(host.acquired, 1);

    assert_eq!(
        s.tick(0.25, &mut host).unwrap(),
        TickOutcome::Previewed { frame: 2.5 }
    );
    assert_eq!(host.poses[0].position.x, 25.0);
    assert_eq!(s.progress(), 0.25);

    for _ in 0..2 {
        assert!(matches!(
            s.tick(0.25, &mut host).unwrap(),
            TickOutcome::Previewed { .. }
        ));
    }
    assert_eq!(s.tick(0.25, &mut host).unwrap(), TickOutcome::Finished);
    assert!(!s.is_active());
    assert_eq!(host.released, 1);
    assert_eq!(s.progress(), 0.0);
    // Preview never touches the world clock.
    assert!(host.dilation.is_empty());
}

#[test]
fn render_captures_each_frame_once_and_names_files_by_frame() {
    let (mut s, rec) = inline_sampler();
    let mut host = Host::default();
    s.start(anim(5, false), PlaybackMode::Render, &mut host).unwrap();

    let mut outcomes = Vec::new();
    loop {
        let o = s.tick(1.0 / 60.0, &mut host).unwrap();
        outcomes.push(o);
        if o == TickOutcome::Finished {
            break;
        }
    }
    assert_eq!(outcomes.len(), 5);
    assert_eq!(outcomes[0], TickOutcome::Captured { frame: FrameIndex(0) });

    let written = rec.written.lock().unwrap().clone();
    let expected: Vec<PathBuf> = (0..5)
        .map(|f| PathBuf::from("out").join("shot").join(format!("{f}.png")))
        .collect();
    assert_eq!(written, expected);
    assert_eq!(host.captures, 5);
    assert_eq!(host.poses[4].position.x, 40.0);

    // 1 / (10 fps * 1/60 s) = 6, then restored on stop.
    assert!((host.dilation[0] - 6.0).abs() < 1e-9);
    assert_eq!(host.dilation.last(), Some(&1.0));
}

#[test]
fn bullet_time_pins_dilation_to_floor() {
    let (mut s, _) = inline_sampler();
    let mut host = Host::default();
    s.start(anim(2, true), PlaybackMode::Render, &mut host).unwrap();
    while s.tick(0.016, &mut host).unwrap() != TickOutcome::Finished {}
    assert_eq!(host.dilation, vec![MIN_TIME_DILATION, 1.0]);
}

#[test]
fn render_waits_for_world() {
    let (mut s, rec) = inline_sampler();
    let mut host = Host {
        not_ready: true,
        ..Host::default()
    };
    s.start(anim(3, false), PlaybackMode::Render, &mut host).unwrap();
    assert_eq!(s.tick(0.1, &mut host).unwrap(), TickOutcome::WorldNotReady);
    assert_eq!(host.captures, 0);
    assert_eq!(host.dilation, vec![MIN_TIME_DILATION]);

    host.not_ready = false;
    assert_eq!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::Captured { frame: FrameIndex(0) }
    );
    assert_eq!(rec.written.lock().unwrap().len(), 1);
}

#[test]
fn failed_write_retries_same_frame() {
    let (mut s, rec) = inline_sampler();
    rec.fail.lock().unwrap().extend([false, true, true]);
    let mut host = Host::default();
    s.start(anim(3, false), PlaybackMode::Render, &mut host).unwrap();

    assert_eq!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::Captured { frame: FrameIndex(0) }
    );
    assert_eq!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::WriteFailed {
            frame: FrameIndex(1),
            attempt: 1
        }
    );
    assert_eq!(s.progress(), 1.0);
    assert_eq!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::WriteFailed {
            frame: FrameIndex(1),
            attempt: 2
        }
    );
    assert_eq!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::Captured { frame: FrameIndex(1) }
    );
    assert_eq!(s.tick(0.1, &mut host).unwrap(), TickOutcome::Finished);
    assert_eq!(rec.written.lock().unwrap().len(), 3);
}

#[test]
fn persistent_failure_aborts_render() {
    let (mut s, rec) = inline_sampler();
    rec.fail.lock().unwrap().extend([true; 8]);
    let mut host = Host::default();
    s.start(anim(3, false), PlaybackMode::Render, &mut host).unwrap();

    assert!(matches!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::WriteFailed { attempt: 1, .. }
    ));
    assert!(matches!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::WriteFailed { attempt: 2, .. }
    ));
    let err = s.tick(0.1, &mut host).unwrap_err();
    assert!(err.to_string().starts_with("capture error:"), "{err}");
    assert!(!s.is_active());
    assert_eq!(host.released, 1);
    assert_eq!(s.progress(), 0.0);
}

#[test]
fn capture_failure_counts_as_failed_attempt() {
    let (mut s, rec) = inline_sampler();
    let mut host = Host {
        fail_captures: 1,
        ..Host::default()
    };
    s.start(anim(1, false), PlaybackMode::Render, &mut host).unwrap();
    assert!(matches!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::WriteFailed { attempt: 1, .. }
    ));
    assert_eq!(s.tick(0.1, &mut host).unwrap(), TickOutcome::Finished);
    assert_eq!(rec.written.lock().unwrap().len(), 1);
}

#[test]
fn empty_range_finishes_without_capturing() {
    let (mut s, _) = inline_sampler();
    let mut host = Host::default();
    s.start(anim(0, false), PlaybackMode::Render, &mut host).unwrap();
    assert_eq!(s.tick(0.1, &mut host).unwrap(), TickOutcome::Finished);
    assert_eq!(host.captures, 0);
}

#[test]
fn background_write_fences_next_capture() {
    let (gate_tx, gate_rx) = mpsc::channel();
    let mut s =
        AnimationSampler::with_sink(opts(WriteMode::Background), Box::new(Gate(gate_rx))).unwrap();
    let mut host = Host::default();
    s.start(anim(2, false), PlaybackMode::Render, &mut host).unwrap();

    assert_eq!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::WriteInFlight { frame: FrameIndex(0) }
    );
    assert!(s.write_in_flight());
    assert_eq!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::WriteInFlight { frame: FrameIndex(0) }
    );
    assert_eq!(host.captures, 1);

    gate_tx.send(true).unwrap();
    assert_eq!(s.wait_for_write().unwrap(), Some(true));
    assert_eq!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::WriteInFlight { frame: FrameIndex(1) }
    );
    assert_eq!(host.captures, 2);

    gate_tx.send(true).unwrap();
    s.wait_for_write().unwrap();
    assert_eq!(s.tick(0.1, &mut host).unwrap(), TickOutcome::Finished);
}

#[test]
fn stop_during_write_discards_late_completion() {
    let (gate_tx, gate_rx) = mpsc::channel();
    let mut s =
        AnimationSampler::with_sink(opts(WriteMode::Background), Box::new(Gate(gate_rx))).unwrap();
    let mut host = Host::default();
    let a = anim(3, false);
    s.start(a.clone(), PlaybackMode::Render, &mut host).unwrap();
    s.tick(0.1, &mut host).unwrap();
    assert!(s.write_in_flight());

    assert!(s.stop(&mut host));
    assert!(!s.stop(&mut host));
    assert_eq!(host.released, 1);
    gate_tx.send(true).unwrap();

    // The late completion must not advance the new run.
    s.start(a, PlaybackMode::Render, &mut host).unwrap();
    assert_eq!(s.progress(), 0.0);
    assert_eq!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::WriteInFlight { frame: FrameIndex(0) }
    );
    gate_tx.send(true).unwrap();
    assert_eq!(s.wait_for_write().unwrap(), Some(true));
    assert_eq!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::WriteInFlight { frame: FrameIndex(1) }
    );
    assert!(s.stop(&mut host));
    // Unblock the abandoned write so the writer thread can be joined.
    drop(gate_tx);
}

#[test]
fn start_while_active_restarts() {
    let (mut s, _) = inline_sampler();
    let mut host = Host::default();
    s.start(anim(5, false), PlaybackMode::Render, &mut host).unwrap();
    s.tick(0.1, &mut host).unwrap();
    s.start(anim(5, false), PlaybackMode::Preview, &mut host).unwrap();
    assert_eq!(host.acquired, 2);
    assert_eq!(host.released, 1);
    assert_eq!(s.mode(), Some(PlaybackMode::Preview));
    assert_eq!(s.progress(), 0.0);
}

#[test]
fn world_advances_one_frame_per_capture_while_writes_lag() {
    let (gate_tx, gate_rx) = mpsc::channel();
    let mut s =
        AnimationSampler::with_sink(opts(WriteMode::Background), Box::new(Gate(gate_rx))).unwrap();
    let mut host = Host::default();
    s.start(anim(3, false), PlaybackMode::Render, &mut host).unwrap();

    let dt = 0.1;
    let mut world = 0.0;
    let mut capture_times = Vec::new();
    let mut held = 0;
    for _ in 0..50 {
        let before = host.captures;
        let outcome = s.tick(dt, &mut host).unwrap();
        if host.captures > before {
            capture_times.push(world);
        }
        if outcome == TickOutcome::Finished {
            break;
        }
        world += dt * host.dilation.last().copied().unwrap_or(1.0);
        if let TickOutcome::WriteInFlight { .. } = outcome {
            held += 1;
            if held == 3 {
                gate_tx.send(true).unwrap();
                s.wait_for_write().unwrap();
                held = 0;
            }
        }
    }

    assert!(!s.is_active());
    assert_eq!(capture_times.len(), 3);
    for gap in capture_times.windows(2).map(|w| w[1] - w[0]) {
        // fps 10: one frame is 0.1 s of world time.
        assert!((gap - 0.1).abs() < 1e-3, "world moved {gap}s between captures");
    }
    assert!(host.dilation.contains(&MIN_TIME_DILATION));
    assert_eq!(host.dilation.last(), Some(&1.0));
}

#[test]
fn inline_write_failure_freezes_world_until_recapture() {
    let (mut s, rec) = inline_sampler();
    rec.fail.lock().unwrap().extend([true]);
    let mut host = Host::default();
    s.start(anim(1, false), PlaybackMode::Render, &mut host).unwrap();
    assert!(matches!(
        s.tick(0.1, &mut host).unwrap(),
        TickOutcome::WriteFailed { attempt: 1, .. }
    ));
    assert_eq!(host.dilation, vec![MIN_TIME_DILATION]);
}

struct Panicking;

impl ImageSink for Panicking {
    fn save_frame(&mut self, _pixels: &[u8], _w: u32, _h: u32, _path: &Path) -> bool {
        panic!("encoder blew up");
    }
}

#[test]
fn dead_writer_aborts_render() {
    let mut s =
        AnimationSampler::with_sink(opts(WriteMode::Background), Box::new(Panicking)).unwrap();
    let mut host = Host::default();
    s.start(anim(3, false), PlaybackMode::Render, &mut host).unwrap();

    let mut err = None;
    for _ in 0..10 {
        match s.tick(0.1, &mut host) {
            Ok(TickOutcome::WriteInFlight { .. }) => {
                assert_eq!(s.wait_for_write().unwrap(), Some(false));
            }
            Ok(_) => {}
            Err(e) => {
                err = Some(e);
                break;
            }
        }
    }
    let err = err.expect("render should abort once the writer is gone");
    assert!(err.to_string().starts_with("capture error:"), "{err}");
    assert!(!s.is_active());
    assert_eq!(host.released, 1);
}
