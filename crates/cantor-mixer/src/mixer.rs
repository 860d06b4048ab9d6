//! The per-callback mixing engine.
//!
//! One lock guards the voice and category collections. The render thread holds
//! it for the duration of [`Mixer::mix`]; application threads take it to
//! insert, remove or reposition voices. Volume, pause and mute go through
//! [`VoiceHandle`]s and never take the lock.

use crate::category::{category_gain, Category};
use crate::config::EngineConfig;
use crate::voice::{PlayOptions, Voice, VoiceHandle, VoiceId, VoiceSource};
use cantor_core::resample::resampled_len;
use cantor_core::{
    change_channel_layout, change_sample_rate, save_wav, AtomicFlag, CodecRegistry,
    EncodedBuffer, Error, ErrorObserver, FormatInfo, Result, SampleBuffer, SourceChunk,
};
use cantor_dsp::Distortion;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Receives every decoded capture buffer.
pub type CaptureHandler = Arc<dyn Fn(&SampleBuffer) + Send + Sync>;

/// Called once for each voice that played its last loop.
pub type FinishedHandler = Arc<dyn Fn(VoiceId) + Send + Sync>;

/// Outcome of one [`Mixer::mix`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MixReport {
    /// Voices pulled this callback, muted ones included.
    pub mixed: usize,
    /// Voices removed after their last loop.
    pub finished: Vec<VoiceId>,
    /// Voices removed because pulling or converting their audio failed.
    pub failed: Vec<VoiceId>,
}

#[derive(Debug, Default)]
pub(crate) struct MixerState {
    pub voices: Vec<Voice>,
    pub categories: Vec<Category>,
}

impl MixerState {
    pub fn voice_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.id == id)
    }
}

pub(crate) struct Shared {
    pub config: EngineConfig,
    pub codecs: CodecRegistry,
    pub observer: Option<ErrorObserver>,
    pub state: Mutex<MixerState>,
    pub capture_handler: RwLock<Option<CaptureHandler>>,
    pub capture_paused: AtomicFlag,
    pub finished_handler: RwLock<Option<FinishedHandler>>,
    pub shutdown_rx: Receiver<()>,
    pub workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    /// Hand an error to the injected observer, if any.
    pub fn report(&self, error: &Error) {
        if let Some(observer) = &self.observer {
            observer(error);
        }
    }
}

enum VoiceStatus {
    Playing,
    Finished,
}

/// Multi-voice mixer producing the render stream.
pub struct Mixer {
    pub(crate) shared: Arc<Shared>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
}

impl Mixer {
    pub fn builder() -> MixerBuilder {
        MixerBuilder::default()
    }

    /// Mixer with default codecs and no observer.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn render_format(&self) -> FormatInfo {
        self.shared.config.render_format
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.shared.codecs
    }

    /// Report `error` to the observer and pass it through.
    pub(crate) fn fail<T>(&self, error: Error) -> Result<T> {
        self.shared.report(&error);
        Err(error)
    }

    // Voices

    /// Start a voice. File sources are decoded before this returns.
    pub fn play(&self, source: impl Into<VoiceSource>, options: PlayOptions) -> Result<VoiceHandle> {
        let mut voice = Voice::new(source.into(), options);
        if let Err(error) = voice.source.load() {
            return self.fail(error);
        }
        let handle = voice.handle();
        tracing::debug!("Playing {} '{}'", voice.id, voice.name);
        self.shared.state.lock().voices.push(voice);
        Ok(handle)
    }

    /// Add a paused voice, converting buffered audio to the render rate and
    /// layout up front.
    pub fn load(&self, source: impl Into<VoiceSource>, options: PlayOptions) -> Result<VoiceHandle> {
        let mut voice = Voice::new(source.into(), options.paused(true));
        if let Err(error) = self.prepare(&mut voice.source) {
            return self.fail(error);
        }
        let handle = voice.handle();
        self.shared.state.lock().voices.push(voice);
        Ok(handle)
    }

    fn prepare(&self, source: &mut VoiceSource) -> Result<()> {
        source.load()?;
        if let VoiceSource::Buffer(buffer) = source {
            let format = self.render_format();
            change_sample_rate(buffer, format.sample_rate);
            change_channel_layout(buffer, format.channel_layout)?;
        }
        Ok(())
    }

    /// Play a WAV file. Failures are reported to the observer and yield `None`.
    pub fn play_file(&self, path: impl AsRef<Path>, options: PlayOptions) -> Option<VoiceHandle> {
        let path = path.as_ref();
        match self.play(VoiceSource::File(path.to_path_buf()), options) {
            Ok(handle) => Some(handle),
            Err(error) => {
                tracing::warn!("Cannot play {}: {}", path.display(), error);
                None
            }
        }
    }

    /// Add a constant voice holding `frame_count` silent frames in the render
    /// format (one second when zero). Constant voices never advance or finish.
    pub fn create_voice(&self, name: impl Into<String>, frame_count: usize) -> VoiceHandle {
        let format = self.render_format();
        let frames = if frame_count > 0 {
            frame_count
        } else {
            format.sample_rate as usize
        };
        let buffer = SampleBuffer::new(frames, format.channel_layout, format.sample_rate);
        let mut voice = Voice::new(buffer.into(), PlayOptions::default().named(name).looped(0));
        voice.constant = true;
        let handle = voice.handle();
        self.shared.state.lock().voices.push(voice);
        handle
    }

    /// Swap the audio of an existing voice, keeping its cursor.
    pub fn replace_buffer(&self, id: VoiceId, buffer: SampleBuffer) -> Result<()> {
        if self.with_voice(id, |v| v.source = VoiceSource::Buffer(buffer)) {
            Ok(())
        } else {
            self.fail(Error::InvalidArgument(format!("{} does not exist", id)))
        }
    }

    pub fn destroy(&self, id: VoiceId) -> bool {
        let mut state = self.shared.state.lock();
        let before = state.voices.len();
        state.voices.retain(|v| v.id != id);
        state.voices.len() != before
    }

    pub fn exists(&self, id: VoiceId) -> bool {
        self.shared.state.lock().voices.iter().any(|v| v.id == id)
    }

    /// First voice with `name`, in insertion order.
    pub fn find_by_name(&self, name: &str) -> Option<VoiceHandle> {
        self.shared
            .state
            .lock()
            .voices
            .iter()
            .find(|v| v.name == name)
            .map(Voice::handle)
    }

    pub fn voice_count(&self) -> usize {
        self.shared.state.lock().voices.len()
    }

    /// Ids of every voice, in mixing order.
    pub fn voices(&self) -> Vec<VoiceId> {
        self.shared.state.lock().voices.iter().map(|v| v.id).collect()
    }

    /// Move the cursor to `position` (a fraction of the source length).
    pub fn set_position(&self, id: VoiceId, position: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&position) {
            return self.fail(Error::InvalidArgument(format!(
                "position must be between 0 and 1, got {}",
                position
            )));
        }
        let outcome = {
            let mut state = self.shared.state.lock();
            let result = match state.voice_mut(id) {
                None => Err(Error::InvalidArgument(format!("{} does not exist", id))),
                Some(voice) => match voice.source.len() {
                    Some(len) => {
                        voice.frame_index = (len as f64 * position) as usize;
                        Ok(())
                    }
                    None => Err(Error::Fail(format!("{} has no known length", id))),
                },
            };
            result
        };
        outcome.or_else(|error| self.fail(error))
    }

    /// Cursor as a fraction of the source length.
    pub fn position(&self, id: VoiceId) -> Option<f64> {
        let state = self.shared.state.lock();
        state.voices.iter().find(|v| v.id == id)?.position()
    }

    pub fn set_loop_count(&self, id: VoiceId, loop_count: u32) -> bool {
        self.with_voice(id, |v| v.loop_count = loop_count)
    }

    pub fn set_distortion(&self, id: VoiceId, distortion: Option<Distortion>) -> bool {
        self.with_voice(id, |v| v.distortion = distortion)
    }

    pub fn add_to_category(&self, id: VoiceId, category: impl Into<String>) -> bool {
        let category = category.into();
        self.with_voice(id, |v| {
            if !v.categories.contains(&category) {
                v.categories.push(category);
            }
        })
    }

    fn with_voice(&self, id: VoiceId, f: impl FnOnce(&mut Voice)) -> bool {
        match self.shared.state.lock().voice_mut(id) {
            Some(voice) => {
                f(voice);
                true
            }
            None => false,
        }
    }

    // Categories

    /// Register a category. Returns false when the name is taken.
    pub fn register_category(&self, category: Category) -> bool {
        let mut state = self.shared.state.lock();
        if state.categories.iter().any(|c| c.name == category.name) {
            return false;
        }
        state.categories.push(category);
        true
    }

    pub fn unregister_category(&self, name: &str) -> bool {
        let mut state = self.shared.state.lock();
        let before = state.categories.len();
        state.categories.retain(|c| c.name != name);
        state.categories.len() != before
    }

    pub fn set_category_volume(&self, name: &str, volume: f32) -> bool {
        let mut state = self.shared.state.lock();
        match state.categories.iter_mut().find(|c| c.name == name) {
            Some(category) => {
                category.set_volume(volume);
                true
            }
            None => false,
        }
    }

    pub fn category_volume(&self, name: &str) -> Option<f32> {
        let state = self.shared.state.lock();
        state
            .categories
            .iter()
            .find(|c| c.name == name)
            .map(Category::volume)
    }

    pub fn category_exists(&self, name: &str) -> bool {
        self.category_volume(name).is_some()
    }

    // Mixing

    /// Accumulate `frame_count` frames of every playing voice into `output`,
    /// which must be in the render rate and layout.
    ///
    /// Voices are visited in insertion order. A voice whose audio cannot be
    /// produced is reported, removed and counted in [`MixReport::failed`];
    /// the remaining voices are still mixed.
    pub fn mix(&self, output: &mut SampleBuffer, frame_count: usize) -> Result<MixReport> {
        let format = self.render_format();
        if output.channel_layout() != format.channel_layout
            || output.sample_rate() != format.sample_rate
        {
            return self.fail(Error::InvalidArgument(format!(
                "output is {} ch @ {} Hz, render format is {} ch @ {} Hz",
                output.channels(),
                output.sample_rate(),
                format.channels(),
                format.sample_rate
            )));
        }
        if frame_count > output.frame_count() {
            return self.fail(Error::InvalidArgument(format!(
                "cannot mix {} frames into a buffer of {}",
                frame_count,
                output.frame_count()
            )));
        }

        let mut report = MixReport::default();
        let mut state = self.shared.state.lock();
        let active = state.voices.iter().filter(|v| v.is_playing()).count();
        if active == 0 {
            return Ok(report);
        }
        let factor = 1.0 / active as f32;
        let mut successors: Vec<(String, Duration)> = Vec::new();

        let MixerState { voices, categories } = &mut *state;
        let mut i = 0;
        while i < voices.len() {
            let voice = &mut voices[i];
            if !voice.is_playing() {
                i += 1;
                continue;
            }
            let gain = if voice.is_muted() {
                0.0
            } else {
                voice.volume() * category_gain(categories, &voice.categories)
            };

            let status = match render_voice(voice, output, frame_count, &format, gain * factor) {
                Ok(VoiceStatus::Playing) => {
                    report.mixed += 1;
                    i += 1;
                    continue;
                }
                Ok(VoiceStatus::Finished) => {
                    report.mixed += 1;
                    Ok(())
                }
                Err(error) => Err(error),
            };

            let mut voice = voices.remove(i);
            match status {
                Ok(()) => {
                    tracing::debug!("{} '{}' finished", voice.id, voice.name);
                    report.finished.push(voice.id);
                }
                Err(error) => {
                    tracing::error!("{} '{}' failed: {}", voice.id, voice.name, error);
                    self.shared.report(&error);
                    report.failed.push(voice.id);
                }
            }
            if let Some(slot) = voice.queue.take() {
                successors.push((slot.name, slot.delay));
            }
        }

        for (name, delay) in successors {
            self.schedule_advance(&mut state, name, delay, 1);
        }
        drop(state);

        if !report.finished.is_empty() {
            if let Some(handler) = self.shared.finished_handler.read().clone() {
                for id in &report.finished {
                    handler(*id);
                }
            }
        }
        Ok(report)
    }

    /// Mix `frame_count` frames into a fresh buffer and encode it in the
    /// render format.
    pub fn render(&self, frame_count: usize) -> Result<(EncodedBuffer, MixReport)> {
        let format = self.render_format();
        let mut buffer =
            SampleBuffer::try_new(frame_count, format.channel_layout, format.sample_rate)?;
        let report = self.mix(&mut buffer, frame_count)?;
        match self.shared.codecs.encode(buffer, &format) {
            Ok(encoded) => Ok((encoded, report)),
            Err(error) => self.fail(error),
        }
    }

    /// Replace the handler told about voices that finish during [`Mixer::mix`].
    pub fn set_finished_handler(&self, handler: Option<FinishedHandler>) {
        *self.shared.finished_handler.write() = handler;
    }

    // Capture

    pub fn set_capture_handler(&self, handler: Option<CaptureHandler>) {
        *self.shared.capture_handler.write() = handler;
    }

    pub fn pause_capture(&self, paused: bool) {
        self.shared.capture_paused.set(paused);
    }

    pub fn is_capture_paused(&self) -> bool {
        self.shared.capture_paused.get()
    }

    /// Decode captured bytes and hand them to the capture handler.
    pub fn deliver_capture(&self, encoded: &EncodedBuffer) -> Result<()> {
        if self.is_capture_paused() {
            return Ok(());
        }
        let Some(handler) = self.shared.capture_handler.read().clone() else {
            return Ok(());
        };
        match self.shared.codecs.decode(encoded) {
            Ok(buffer) => {
                handler(&buffer);
                Ok(())
            }
            Err(error) => self.fail(error),
        }
    }

    // Files

    /// Convert `buffer` to `format` and write it as WAV. Failures are reported
    /// to the observer and yield `false`.
    pub fn save_to_file(&self, path: impl AsRef<Path>, buffer: SampleBuffer, format: &FormatInfo) -> bool {
        let path = path.as_ref();
        match write_wav(path, buffer, format) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!("Cannot save {}: {}", path.display(), error);
                self.shared.report(&error);
                false
            }
        }
    }
}

fn write_wav(path: &Path, mut buffer: SampleBuffer, format: &FormatInfo) -> Result<()> {
    change_sample_rate(&mut buffer, format.sample_rate);
    change_channel_layout(&mut buffer, format.channel_layout)?;
    save_wav(path, &buffer, format)
}

/// Pull, convert and accumulate one voice, then advance its cursor.
fn render_voice(
    voice: &mut Voice,
    output: &mut SampleBuffer,
    frame_count: usize,
    format: &FormatInfo,
    gain: f32,
) -> Result<VoiceStatus> {
    let source_rate = voice.source.sample_rate().unwrap_or(format.sample_rate);
    let needed = resampled_len(frame_count, format.sample_rate, source_rate);

    let SourceChunk {
        buffer: mut sub,
        finished,
    } = voice.source.read(voice.frame_index, needed)?;
    change_sample_rate(&mut sub, format.sample_rate);
    change_channel_layout(&mut sub, format.channel_layout)?;
    if let Some(distortion) = &voice.distortion {
        distortion.apply(&mut sub);
    }

    if gain > 0.0 {
        for j in 0..frame_count.min(sub.frame_count()) {
            for (dst, src) in output[j].iter_mut().zip(&sub[j]) {
                *dst += src * gain;
            }
        }
    }

    if voice.constant {
        return Ok(VoiceStatus::Playing);
    }
    voice.frame_index += needed;
    if !finished {
        return Ok(VoiceStatus::Playing);
    }
    if voice.loop_count == 1 {
        return Ok(VoiceStatus::Finished);
    }
    if voice.loop_count > 1 {
        voice.loop_count -= 1;
    }
    voice.frame_index = 0;
    Ok(VoiceStatus::Playing)
}

impl Drop for Mixer {
    fn drop(&mut self) {
        // wakes every queue worker
        self.shutdown_tx.lock().take();
        self.join_queue_workers();
    }
}

/// Builder for [`Mixer`].
#[derive(Default)]
pub struct MixerBuilder {
    config: EngineConfig,
    observer: Option<ErrorObserver>,
    codecs: Option<CodecRegistry>,
    capture_handler: Option<CaptureHandler>,
    finished_handler: Option<FinishedHandler>,
}

impl MixerBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: ErrorObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Codec registry; defaults to [`CodecRegistry::with_defaults`].
    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = Some(codecs);
        self
    }

    pub fn capture_handler(mut self, handler: CaptureHandler) -> Self {
        self.capture_handler = Some(handler);
        self
    }

    pub fn finished_handler(mut self, handler: FinishedHandler) -> Self {
        self.finished_handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<Mixer> {
        if let Err(error) = self.config.validate() {
            if let Some(observer) = &self.observer {
                observer(&error);
            }
            return Err(error);
        }
        let (shutdown_tx, shutdown_rx) = bounded(0);
        let shared = Shared {
            config: self.config,
            codecs: self.codecs.unwrap_or_default(),
            observer: self.observer,
            state: Mutex::new(MixerState::default()),
            capture_handler: RwLock::new(self.capture_handler),
            capture_paused: AtomicFlag::new(false),
            finished_handler: RwLock::new(self.finished_handler),
            shutdown_rx,
            workers: Mutex::new(Vec::new()),
        };
        tracing::debug!(
            "Mixer ready: {} ch @ {} Hz, {} frame periods",
            shared.config.render_format.channels(),
            shared.config.render_format.sample_rate,
            shared.config.period_frames
        );
        Ok(Mixer {
            shared: Arc::new(shared),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
        })
    }
}
