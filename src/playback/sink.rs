use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::{
    config::{ImageFormat, WriteMode},
    foundation::error::{CamtrackError, CamtrackResult},
};

/// Persists one captured image. Failures are reported, never raised.
pub trait ImageSink: Send {
    /// Write tightly packed RGBA8 `pixels` to `path`. Returns `true` on success.
    fn save_frame(&mut self, pixels: &[u8], width: u32, height: u32, path: &Path) -> bool;
}

/// Encodes captures with `image` and writes them to disk, creating parent directories on demand.
#[derive(Clone, Copy, Debug)]
pub struct ImageFileSink {
    format: ImageFormat,
}

impl ImageFileSink {
    pub fn new(format: ImageFormat) -> Self {
        Self { format }
    }

    fn write(&self, pixels: &[u8], width: u32, height: u32, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context as _;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create capture dir '{}'", parent.display()))?;
        }
        let res = match self.format {
            ImageFormat::Png => image::save_buffer_with_format(
                path,
                pixels,
                width,
                height,
                image::ColorType::Rgba8,
                image::ImageFormat::Png,
            ),
            ImageFormat::Jpeg => {
                // No alpha channel in JPEG.
                let rgb: Vec<u8> = pixels
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect();
                image::save_buffer_with_format(
                    path,
                    &rgb,
                    width,
                    height,
                    image::ColorType::Rgb8,
                    image::ImageFormat::Jpeg,
                )
            }
        };
        res.with_context(|| format!("write capture '{}'", path.display()))
    }
}

impl ImageSink for ImageFileSink {
    fn save_frame(&mut self, pixels: &[u8], width: u32, height: u32, path: &Path) -> bool {
        match self.write(pixels, width, height, path) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "capture write failed");
                false
            }
        }
    }
}

/// Owned copy of one captured render target.
///
/// Only built through [`CapturedFrame::new`], so the buffer always matches the size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedFrame {
    width: u32,
    height: u32,
    /// RGBA8, row-major, no padding.
    pixels: Vec<u8>,
}

impl CapturedFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> CamtrackResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(CamtrackError::capture(format!(
                "captured frame {width}x{height} carries {} bytes, expected {expected}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Handle for one submitted write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WriteTicket(u64);

struct WriteJob {
    ticket: WriteTicket,
    frame: CapturedFrame,
    path: PathBuf,
}

enum Backend {
    Inline(Box<dyn ImageSink>),
    Background {
        jobs: Option<mpsc::Sender<WriteJob>>,
        done: mpsc::Receiver<(WriteTicket, bool)>,
        worker: Option<JoinHandle<()>>,
    },
}

/// Runs [`ImageSink`] writes inline or on a writer thread, reporting completion per ticket.
///
/// Each job owns its pixel buffer, so the caller's render target is never shared with the worker.
/// Completions for forgotten tickets are dropped when they arrive. If the writer thread dies,
/// every outstanding ticket resolves as failed and later submits return an error.
pub struct FrameWriter {
    backend: Backend,
    next_ticket: u64,
    outstanding: HashSet<WriteTicket>,
    finished: HashMap<WriteTicket, bool>,
    forgotten: HashSet<WriteTicket>,
    worker_exited: bool,
}

impl FrameWriter {
    pub fn new(mode: WriteMode, sink: Box<dyn ImageSink>) -> CamtrackResult<Self> {
        let backend = match mode {
            WriteMode::Inline => Backend::Inline(sink),
            WriteMode::Background => spawn_worker(sink)?,
        };
        Ok(Self {
            backend,
            next_ticket: 0,
            outstanding: HashSet::new(),
            finished: HashMap::new(),
            forgotten: HashSet::new(),
            worker_exited: false,
        })
    }

    /// Queue `frame` for writing to `path`. Inline writers complete before returning.
    pub fn submit(&mut self, frame: CapturedFrame, path: PathBuf) -> CamtrackResult<WriteTicket> {
        let ticket = WriteTicket(self.next_ticket);
        self.next_ticket += 1;
        match &mut self.backend {
            Backend::Inline(sink) => {
                let ok = sink.save_frame(frame.pixels(), frame.width(), frame.height(), &path);
                self.finished.insert(ticket, ok);
            }
            Backend::Background { .. } if self.worker_exited => {
                return Err(CamtrackError::capture("frame writer thread exited"));
            }
            Backend::Background { jobs, .. } => {
                let tx = jobs
                    .as_ref()
                    .ok_or_else(|| CamtrackError::capture("frame writer is shut down"))?;
                tx.send(WriteJob {
                    ticket,
                    frame,
                    path,
                })
                .map_err(|_| CamtrackError::capture("frame writer thread is not accepting jobs"))?;
                self.outstanding.insert(ticket);
            }
        }
        Ok(ticket)
    }

    /// Outcome of `ticket` if its write has finished. Consumes the outcome.
    pub fn poll(&mut self, ticket: WriteTicket) -> Option<bool> {
        self.drain();
        self.finished.remove(&ticket)
    }

    /// Block until `ticket` finishes. The outcome stays available to [`FrameWriter::poll`].
    pub fn wait(&mut self, ticket: WriteTicket) -> CamtrackResult<bool> {
        self.drain();
        if let Some(ok) = self.finished.get(&ticket) {
            return Ok(*ok);
        }
        if !self.outstanding.contains(&ticket) {
            return Err(CamtrackError::capture(format!(
                "unknown write ticket {}",
                ticket.0
            )));
        }
        loop {
            let msg = match &self.backend {
                Backend::Background { done, .. } => done.recv().ok(),
                Backend::Inline(_) => None,
            };
            let Some((t, ok)) = msg else {
                self.fail_outstanding();
                return Ok(self.finished.get(&ticket).copied().unwrap_or(false));
            };
            self.complete(t, ok);
            if t == ticket {
                return Ok(ok);
            }
        }
    }

    /// Drop interest in `ticket`; its outcome is discarded whenever it arrives.
    pub fn forget(&mut self, ticket: WriteTicket) {
        if self.finished.remove(&ticket).is_none() && self.outstanding.remove(&ticket) {
            self.forgotten.insert(ticket);
        }
    }

    fn complete(&mut self, ticket: WriteTicket, ok: bool) {
        self.outstanding.remove(&ticket);
        if !self.forgotten.remove(&ticket) {
            self.finished.insert(ticket, ok);
        }
    }

    fn drain(&mut self) {
        let Backend::Background { done, .. } = &self.backend else {
            return;
        };
        let mut received = Vec::new();
        let disconnected = loop {
            match done.try_recv() {
                Ok(msg) => received.push(msg),
                Err(mpsc::TryRecvError::Empty) => break false,
                Err(mpsc::TryRecvError::Disconnected) => break true,
            }
        };
        for (t, ok) in received {
            self.complete(t, ok);
        }
        if disconnected {
            self.fail_outstanding();
        }
    }

    /// The worker is gone: nothing still queued will ever be written.
    fn fail_outstanding(&mut self) {
        self.worker_exited = true;
        if self.outstanding.is_empty() {
            return;
        }
        tracing::error!(
            pending = self.outstanding.len(),
            "frame writer thread exited; failing pending writes"
        );
        for t in std::mem::take(&mut self.outstanding) {
            self.finished.insert(t, false);
        }
        self.forgotten.clear();
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        if let Backend::Background { jobs, worker, .. } = &mut self.backend {
            // Closing the job channel ends the worker loop after queued writes finish.
            jobs.take();
            if let Some(handle) = worker.take()
                && handle.join().is_err()
            {
                tracing::error!("frame writer thread panicked");
            }
        }
    }
}

fn spawn_worker(mut sink: Box<dyn ImageSink>) -> CamtrackResult<Backend> {
    let (job_tx, job_rx) = mpsc::channel::<WriteJob>();
    let (done_tx, done_rx) = mpsc::channel::<(WriteTicket, bool)>();
    let worker = std::thread::Builder::new()
        .name("camtrack-writer".to_string())
        .spawn(move || {
            for job in job_rx {
                let ok = sink.save_frame(
                    job.frame.pixels(),
                    job.frame.width(),
                    job.frame.height(),
                    &job.path,
                );
                if done_tx.send((job.ticket, ok)).is_err() {
                    break;
                }
            }
        })
        .map_err(|e| CamtrackError::capture(format!("failed to spawn frame writer: {e}")))?;
    Ok(Backend::Background {
        jobs: Some(job_tx),
        done: done_rx,
        worker: Some(worker),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/playback/sink.rs"]
mod tests;
