//! # Cantor - Audio Engine
//!
//! Umbrella crate re-exporting the cantor subsystems:
//! - **cantor-core** - Sample buffers, formats, codecs, resampling, channel mixing, WAV I/O
//! - **cantor-dsp** - STFT filters, equalizer, phase vocoder, time stretch, modulation effects
//! - **cantor-mixer** - Voices, queues, categories, mixer, render/capture threads
//!
//! ## Quick Start
//!
//! ```ignore
//! use cantor::prelude::*;
//!
//! let mixer = Mixer::new(EngineConfig::default())?;
//! let mut tone = SampleBuffer::new(48000, ChannelLayout::STEREO, 48000);
//! tremolo(&mut tone, &Lfo::sine(4.0), 0.5)?;
//! mixer.play(tone, PlayOptions::default())?;
//!
//! let (encoded, _report) = mixer.render(480)?;
//! ```

/// Re-export of cantor-core for direct access
pub use cantor_core as core;
/// Re-export of cantor-dsp for direct access
pub use cantor_dsp as dsp;
/// Re-export of cantor-mixer for direct access
pub use cantor_mixer as mixer;

pub use cantor_core::{
    change_channel_layout, change_sample_rate, ChannelLayout, Codec, CodecRegistry,
    EncodedBuffer, Error, ErrorKind, ErrorObserver, FormatInfo, FrameSource, Result,
    SampleBuffer, Window, WindowKind,
};
pub use cantor_mixer::{
    AudioBackend, Category, EngineConfig, MixReport, Mixer, OfflineBackend, PlayOptions,
    StreamThread, VoiceHandle, VoiceId, VoiceSource,
};

/// Convenience prelude for common imports
pub mod prelude {
    pub use cantor_core::{
        change_channel_layout, change_sample_rate, format_tag, save_wav, ChannelLayout,
        CodecRegistry, EncodedBuffer, Error, FormatInfo, Result, SampleBuffer, WavSource,
        Window, WindowKind,
    };
    pub use cantor_dsp::{
        band_pass_filter, change_speed, chorus, echo, equalizer, flanger, high_pass_filter,
        low_pass_filter, pitch_shift, tremolo, vibrato, wah, Distortion, EqualizerBand, Lfo,
        LfoShape, SpectralConfig,
    };
    pub use cantor_mixer::{
        Category, EngineConfig, Mixer, OfflineBackend, PlayOptions, StreamThread, VoiceHandle,
        VoiceSource,
    };
}
