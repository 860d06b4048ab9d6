//! Device backend contract.
//!
//! Platform device glue lives outside this crate. A backend only has to say
//! how many frames it can take, accept encoded periods, and hand over
//! captured bytes. [`OfflineBackend`] drives the engine without a device.

use cantor_core::{EncodedBuffer, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An audio device as seen by the stream threads.
pub trait AudioBackend: Send {
    fn name(&self) -> &str;

    /// Block until the device wants audio, then return how many frames
    /// (`Some(0)` when there is nothing to do yet). `None` closes the stream.
    fn render_ready(&mut self, period_frames: usize) -> Result<Option<usize>>;

    /// Accept one encoded period in the render format.
    fn submit(&mut self, buffer: EncodedBuffer) -> Result<()>;

    /// Block until captured bytes are available. `None` closes the stream.
    fn capture(&mut self) -> Result<Option<EncodedBuffer>> {
        Ok(None)
    }
}

/// What an [`OfflineBackend`] received, readable from any thread.
#[derive(Debug, Clone, Default)]
pub struct OfflineOutput {
    bytes: Arc<Mutex<Vec<u8>>>,
    frames: Arc<AtomicUsize>,
}

impl OfflineOutput {
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::Acquire)
    }
}

/// Renders a fixed number of frames as fast as the mixer allows and replays
/// pre-recorded capture chunks.
#[derive(Debug)]
pub struct OfflineBackend {
    total_frames: usize,
    requested: usize,
    output: OfflineOutput,
    captures: VecDeque<EncodedBuffer>,
}

impl OfflineBackend {
    pub fn new(total_frames: usize) -> Self {
        Self {
            total_frames,
            requested: 0,
            output: OfflineOutput::default(),
            captures: VecDeque::new(),
        }
    }

    /// Chunks returned one by one from [`AudioBackend::capture`].
    pub fn with_capture(mut self, chunks: impl IntoIterator<Item = EncodedBuffer>) -> Self {
        self.captures.extend(chunks);
        self
    }

    pub fn output(&self) -> OfflineOutput {
        self.output.clone()
    }
}

impl AudioBackend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    fn render_ready(&mut self, period_frames: usize) -> Result<Option<usize>> {
        let remaining = self.total_frames - self.requested;
        if remaining == 0 {
            return Ok(None);
        }
        let frames = period_frames.min(remaining);
        self.requested += frames;
        Ok(Some(frames))
    }

    fn submit(&mut self, buffer: EncodedBuffer) -> Result<()> {
        let frames = buffer.frame_count();
        self.output.bytes.lock().extend_from_slice(buffer.bytes());
        self.output.frames.fetch_add(frames, Ordering::Release);
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<EncodedBuffer>> {
        Ok(self.captures.pop_front())
    }
}
