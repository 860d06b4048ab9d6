//! Voices: one schedulable unit of playback.

use cantor_core::{AtomicFlag, AtomicFloat, Error, FrameSource, Result, SampleBuffer, SourceChunk, WavSource};
use cantor_dsp::Distortion;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Unique identifier for a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

impl VoiceId {
    /// Generate a new unique voice ID.
    pub fn generate() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// Decode a whole WAV file into memory.
pub(crate) fn decode_file(path: &Path) -> Result<SampleBuffer> {
    let buffer = WavSource::open(path)?.read_all()?;
    tracing::debug!(
        "Loaded {} ({} frames @ {} Hz)",
        path.display(),
        buffer.frame_count(),
        buffer.sample_rate()
    );
    Ok(buffer)
}

/// Where a voice pulls its frames from.
pub enum VoiceSource {
    /// Fully decoded audio owned by the voice.
    Buffer(SampleBuffer),
    /// Random-access pull from a file or device.
    Stream(Box<dyn FrameSource>),
    /// WAV file decoded in full once the voice becomes eligible.
    File(PathBuf),
}

impl VoiceSource {
    pub fn is_loaded(&self) -> bool {
        !matches!(self, VoiceSource::File(_))
    }

    /// Decode a pending file in place; loaded sources are left untouched.
    pub(crate) fn load(&mut self) -> Result<()> {
        if let VoiceSource::File(path) = self {
            *self = VoiceSource::Buffer(decode_file(path)?);
        }
        Ok(())
    }

    pub(crate) fn pending_path(&self) -> Option<&Path> {
        match self {
            VoiceSource::File(path) => Some(path),
            _ => None,
        }
    }

    pub(crate) fn sample_rate(&self) -> Option<u32> {
        match self {
            VoiceSource::Buffer(buffer) => Some(buffer.sample_rate()),
            VoiceSource::Stream(source) => Some(source.format().sample_rate),
            VoiceSource::File(_) => None,
        }
    }

    /// Length in frames, when known.
    pub(crate) fn len(&self) -> Option<usize> {
        match self {
            VoiceSource::Buffer(buffer) => Some(buffer.frame_count()),
            VoiceSource::Stream(source) => source.frame_count(),
            VoiceSource::File(_) => None,
        }
    }

    /// Pull `frame_count` frames at `frame_index`. Buffers are zero-padded
    /// past their end.
    pub(crate) fn read(&mut self, frame_index: usize, frame_count: usize) -> Result<SourceChunk> {
        match self {
            VoiceSource::Buffer(buffer) => Ok(SourceChunk {
                buffer: buffer.sub_buffer(frame_index, frame_count),
                finished: frame_index + frame_count >= buffer.frame_count(),
            }),
            VoiceSource::Stream(source) => {
                let mut chunk = source.read(frame_index, frame_count)?;
                if let Some(len) = source.frame_count() {
                    chunk.finished |= frame_index + frame_count >= len;
                }
                Ok(chunk)
            }
            VoiceSource::File(path) => Err(Error::Fail(format!(
                "voice source {} was never loaded",
                path.display()
            ))),
        }
    }
}

impl std::fmt::Debug for VoiceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoiceSource::Buffer(buffer) => f
                .debug_tuple("Buffer")
                .field(&buffer.frame_count())
                .finish(),
            VoiceSource::Stream(source) => f.debug_tuple("Stream").field(&source.format()).finish(),
            VoiceSource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl From<SampleBuffer> for VoiceSource {
    fn from(buffer: SampleBuffer) -> Self {
        VoiceSource::Buffer(buffer)
    }
}

impl From<PathBuf> for VoiceSource {
    fn from(path: PathBuf) -> Self {
        VoiceSource::File(path)
    }
}

/// Flags the application may flip while the render thread reads them.
#[derive(Debug)]
pub(crate) struct VoiceControls {
    pub volume: AtomicFloat,
    pub paused: AtomicFlag,
    pub muted: AtomicFlag,
}

impl VoiceControls {
    pub fn new(volume: f32, paused: bool) -> Self {
        Self {
            volume: AtomicFloat::new(volume.clamp(0.0, 1.0)),
            paused: AtomicFlag::new(paused),
            muted: AtomicFlag::new(false),
        }
    }
}

/// Lock-free handle to a voice's volume, pause and mute state.
///
/// The handle stays valid after the voice is removed; writes are then ignored.
#[derive(Debug, Clone)]
pub struct VoiceHandle {
    id: VoiceId,
    controls: Arc<VoiceControls>,
}

impl VoiceHandle {
    pub(crate) fn new(id: VoiceId, controls: Arc<VoiceControls>) -> Self {
        Self { id, controls }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// Set volume, clamped to [0, 1]. Returns the stored value.
    pub fn set_volume(&self, volume: f32) -> f32 {
        self.controls.volume.set_clamped(volume, 0.0, 1.0)
    }

    pub fn volume(&self) -> f32 {
        self.controls.volume.get()
    }

    pub fn set_paused(&self, paused: bool) {
        self.controls.paused.set(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.controls.paused.get()
    }

    pub fn set_muted(&self, muted: bool) {
        self.controls.muted.set(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.controls.muted.get()
    }
}

/// How a voice is started.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayOptions {
    pub name: String,
    /// 0 loops forever, N plays N times.
    pub loop_count: u32,
    pub paused: bool,
    pub volume: f32,
    pub categories: Vec<String>,
    pub distortion: Option<Distortion>,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            loop_count: 1,
            paused: false,
            volume: 1.0,
            categories: Vec::new(),
            distortion: None,
        }
    }
}

impl PlayOptions {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn looped(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn distortion(mut self, distortion: Distortion) -> Self {
        self.distortion = Some(distortion);
        self
    }
}

/// Position of a voice in a named queue. Index 0 is eligible to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueueSlot {
    pub name: String,
    pub index: usize,
    pub delay: std::time::Duration,
}

#[derive(Debug)]
pub(crate) struct Voice {
    pub id: VoiceId,
    pub name: String,
    pub source: VoiceSource,
    pub controls: Arc<VoiceControls>,
    pub frame_index: usize,
    pub loop_count: u32,
    pub categories: Vec<String>,
    pub queue: Option<QueueSlot>,
    /// Never advances or finishes.
    pub constant: bool,
    pub distortion: Option<Distortion>,
}

impl Voice {
    pub fn new(source: VoiceSource, options: PlayOptions) -> Self {
        let name = match (&source, options.name.is_empty()) {
            (VoiceSource::File(path), true) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ => options.name,
        };
        Self {
            id: VoiceId::generate(),
            name,
            source,
            controls: Arc::new(VoiceControls::new(options.volume, options.paused)),
            frame_index: 0,
            loop_count: options.loop_count,
            categories: options.categories,
            queue: None,
            constant: false,
            distortion: options.distortion,
        }
    }

    pub fn handle(&self) -> VoiceHandle {
        VoiceHandle::new(self.id, Arc::clone(&self.controls))
    }

    pub fn in_queue(&self) -> bool {
        self.queue.as_ref().is_some_and(|slot| slot.index > 0)
    }

    pub fn queue_name(&self) -> Option<&str> {
        self.queue.as_ref().map(|slot| slot.name.as_str())
    }

    /// Not paused, not waiting in a queue and decoded.
    pub fn is_playing(&self) -> bool {
        !self.controls.paused.get() && !self.in_queue() && self.source.is_loaded()
    }

    pub fn is_muted(&self) -> bool {
        self.controls.muted.get()
    }

    pub fn volume(&self) -> f32 {
        self.controls.volume.get()
    }

    /// Cursor as a fraction of the source length.
    pub fn position(&self) -> Option<f64> {
        match self.source.len() {
            Some(len) if len > 0 => Some(self.frame_index as f64 / len as f64),
            _ => None,
        }
    }
}
