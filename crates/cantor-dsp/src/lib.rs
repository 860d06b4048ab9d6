//! Offline and streaming DSP on [`SampleBuffer`](cantor_core::SampleBuffer)s:
//! STFT filters and equalizer, phase-vocoder pitch shifting, overlap-add time
//! stretching, LFO-driven modulation effects, amplitude utilities and
//! waveshaping distortion.

mod amplitude;
pub use amplitude::{
    linear_fade_in, linear_fade_out, normalize, pan, rms_normalize, PanningLaw,
};

mod config;
pub use config::{SpectralConfig, DEFAULT_FFT_SIZE, DEFAULT_HOP_SIZE};

mod distortion;
pub use distortion::Distortion;

mod lfo;
pub use lfo::{Lfo, LfoShape};

mod modulation;
pub use modulation::{
    chorus, echo, fix_overflow, flanger, tremolo, vibrato, wah, ChorusParams, EchoParams,
    FlangerParams, WahParams,
};

mod phase_vocoder;
pub use phase_vocoder::{pitch_shift, pitch_shift_mt, PhaseVocoderProcessor};

mod spectral;
pub use spectral::{
    band_cut_filter, band_pass_filter, equalizer, high_pass_filter, low_pass_filter,
    EqualizerBand, SpectralFilter, SpectralProcessor,
};

mod time_stretch;
pub use time_stretch::change_speed;

pub use cantor_core::{Error, Result};
