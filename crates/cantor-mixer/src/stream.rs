//! Render and capture threads.
//!
//! Each [`StreamThread`] owns one backend and walks
//! `Uninitialized -> Starting -> Running -> Stopping -> Uninitialized`.
//! The thread leaves `Running` on its own when the backend closes or fails.

use crate::backend::AudioBackend;
use crate::mixer::Mixer;
use cantor_core::Result;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thread_priority::ThreadPriority;

/// Lifecycle of a stream thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum StreamState {
    #[default]
    Uninitialized = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl StreamState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => StreamState::Starting,
            2 => StreamState::Running,
            3 => StreamState::Stopping,
            _ => StreamState::Uninitialized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Render,
    Capture,
}

impl StreamKind {
    fn thread_name(self) -> &'static str {
        match self {
            StreamKind::Render => "cantor-render",
            StreamKind::Capture => "cantor-capture",
        }
    }
}

/// A running render or capture loop.
pub struct StreamThread {
    kind: StreamKind,
    state: Arc<AtomicU8>,
    thread_handle: Option<JoinHandle<()>>,
}

impl StreamThread {
    /// Pull periods from `mixer` and submit them to `backend` until stopped
    /// or the backend closes.
    pub fn render(mixer: Arc<Mixer>, backend: Box<dyn AudioBackend>) -> Result<Self> {
        Self::spawn(StreamKind::Render, mixer, backend)
    }

    /// Forward captured bytes from `backend` to the mixer's capture handler.
    pub fn capture(mixer: Arc<Mixer>, backend: Box<dyn AudioBackend>) -> Result<Self> {
        Self::spawn(StreamKind::Capture, mixer, backend)
    }

    fn spawn(kind: StreamKind, mixer: Arc<Mixer>, mut backend: Box<dyn AudioBackend>) -> Result<Self> {
        let state = Arc::new(AtomicU8::new(StreamState::Starting as u8));
        let thread_state = Arc::clone(&state);

        let handle = thread::Builder::new()
            .name(kind.thread_name().into())
            .spawn(move || {
                if mixer.config().thread_priority {
                    let _ = thread_priority::set_current_thread_priority(ThreadPriority::Max);
                }
                if thread_state
                    .compare_exchange(
                        StreamState::Starting as u8,
                        StreamState::Running as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_err()
                {
                    return;
                }
                tracing::debug!("{:?} stream running on '{}'", kind, backend.name());

                let result = match kind {
                    StreamKind::Render => render_loop(&mixer, backend.as_mut(), &thread_state),
                    StreamKind::Capture => capture_loop(&mixer, backend.as_mut(), &thread_state),
                };
                if let Err(error) = result {
                    tracing::error!("{:?} stream on '{}' failed: {}", kind, backend.name(), error);
                    mixer.shared.report(&error);
                }
                let _ = thread_state.compare_exchange(
                    StreamState::Running as u8,
                    StreamState::Stopping as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            })?;

        Ok(Self {
            kind,
            state,
            thread_handle: Some(handle),
        })
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == StreamState::Running
    }

    /// Ask the loop to exit and wait for it.
    pub fn stop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            self.state
                .store(StreamState::Stopping as u8, Ordering::Release);
            let _ = handle.join();
        }
        self.state
            .store(StreamState::Uninitialized as u8, Ordering::Release);
    }
}

impl Drop for StreamThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn running(state: &AtomicU8) -> bool {
    state.load(Ordering::Acquire) == StreamState::Running as u8
}

fn render_loop(mixer: &Mixer, backend: &mut dyn AudioBackend, state: &AtomicU8) -> Result<()> {
    let period = mixer.config().period_frames;
    while running(state) {
        match backend.render_ready(period)? {
            None => break,
            Some(0) => thread::yield_now(),
            Some(frames) => {
                let (encoded, report) = mixer.render(frames)?;
                if !report.failed.is_empty() {
                    tracing::debug!("{} voices dropped this period", report.failed.len());
                }
                backend.submit(encoded)?;
            }
        }
    }
    Ok(())
}

fn capture_loop(mixer: &Mixer, backend: &mut dyn AudioBackend, state: &AtomicU8) -> Result<()> {
    while running(state) {
        match backend.capture()? {
            None => break,
            Some(encoded) => mixer.deliver_capture(&encoded)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::OfflineBackend;
    use crate::config::EngineConfig;
    use crate::voice::PlayOptions;
    use cantor_core::{ChannelLayout, EncodedBuffer, Error, FormatInfo, SampleBuffer};
    use std::sync::atomic::AtomicUsize;

    fn wait_for_exit(stream: &StreamThread) {
        for _ in 0..500 {
            if stream.state() != StreamState::Running && stream.state() != StreamState::Starting {
                return;
            }
            thread::sleep(std::time::Duration::from_millis(2));
        }
    }

    #[test]
    fn test_state_from_u8() {
        assert_eq!(StreamState::from_u8(2), StreamState::Running);
        assert_eq!(StreamState::from_u8(9), StreamState::Uninitialized);
    }

    #[test]
    fn test_render_thread_drains_backend() {
        let config = EngineConfig::default().with_period_frames(100);
        let mixer = Arc::new(Mixer::new(config).unwrap());
        let tone = SampleBuffer::from_interleaved(vec![0.25; 2000], ChannelLayout::STEREO, 48000).unwrap();
        mixer.play(tone, PlayOptions::default()).unwrap();

        let backend = OfflineBackend::new(1000);
        let output = backend.output();
        let mut stream = StreamThread::render(Arc::clone(&mixer), Box::new(backend)).unwrap();
        assert_eq!(stream.kind(), StreamKind::Render);
        wait_for_exit(&stream);
        stream.stop();

        assert_eq!(stream.state(), StreamState::Uninitialized);
        assert_eq!(output.frames(), 1000);
        assert_eq!(output.bytes().len(), 1000 * 4);
        assert_eq!(&output.bytes()[..2], &8192i16.to_le_bytes());
    }

    #[test]
    fn test_render_thread_reports_finished_voices() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);
        let mixer = Mixer::builder()
            .config(EngineConfig::default().with_period_frames(100))
            .finished_handler(Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .build()
            .unwrap();
        let mixer = Arc::new(mixer);
        for frames in [150, 300] {
            let clip = SampleBuffer::new(frames, ChannelLayout::STEREO, 48000);
            mixer.play(clip, PlayOptions::default()).unwrap();
        }

        let mut stream = StreamThread::render(Arc::clone(&mixer), Box::new(OfflineBackend::new(500))).unwrap();
        wait_for_exit(&stream);
        stream.stop();
        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_capture_thread_delivers() {
        let mixer = Arc::new(Mixer::new(EngineConfig::default()).unwrap());
        let frames = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&frames);
        mixer.set_capture_handler(Some(Arc::new(move |buffer: &SampleBuffer| {
            sink.fetch_add(buffer.frame_count(), Ordering::SeqCst);
        })));

        let format = FormatInfo::pcm(ChannelLayout::STEREO, 48000, 16);
        let chunk = EncodedBuffer::new(vec![0; 4 * 64], format).unwrap();
        let backend = OfflineBackend::new(0).with_capture([chunk.clone(), chunk]);
        let mut stream = StreamThread::capture(Arc::clone(&mixer), Box::new(backend)).unwrap();
        wait_for_exit(&stream);
        stream.stop();
        assert_eq!(frames.load(Ordering::SeqCst), 128);
    }

    struct BrokenBackend;

    impl AudioBackend for BrokenBackend {
        fn name(&self) -> &str {
            "broken"
        }

        fn render_ready(&mut self, _: usize) -> Result<Option<usize>> {
            Err(Error::Fail("device lost".into()))
        }

        fn submit(&mut self, _: EncodedBuffer) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_backend_failure_is_reported() {
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        let mixer = Mixer::builder()
            .observer(Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .build()
            .unwrap();
        let stream = StreamThread::render(Arc::new(mixer), Box::new(BrokenBackend)).unwrap();
        wait_for_exit(&stream);
        assert_eq!(stream.state(), StreamState::Stopping);
        drop(stream);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
