//! # cantor-mixer
//!
//! Multi-voice playback on top of [`cantor_core`] buffers and codecs.
//!
//! ```ignore
//! use cantor_mixer::{EngineConfig, Mixer, PlayOptions};
//!
//! let mixer = Mixer::new(EngineConfig::default())?;
//! let voice = mixer.play(buffer, PlayOptions::default().looped(0))?;
//! voice.set_volume(0.5);
//!
//! let (encoded, report) = mixer.render(480)?;
//! ```
//!
//! A [`StreamThread`] drives [`Mixer::render`] against an [`AudioBackend`];
//! [`OfflineBackend`] does so without a device.

mod backend;
mod category;
mod config;
mod mixer;
mod queue;
mod stream;
mod voice;

pub use backend::{AudioBackend, OfflineBackend, OfflineOutput};
pub use category::Category;
pub use config::{EngineConfig, MAX_PERIOD_FRAMES};
pub use mixer::{CaptureHandler, FinishedHandler, MixReport, Mixer, MixerBuilder};
pub use stream::{StreamKind, StreamState, StreamThread};
pub use voice::{PlayOptions, VoiceHandle, VoiceId, VoiceSource};

pub use cantor_core::{Error, Result};
