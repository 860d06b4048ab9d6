//! Test helpers and fixtures for cantor integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `DSP_EPSILON` (1e-4): STFT and resampling paths
//! - `PERCEPTUAL_EPSILON` (0.001): Perceptual equivalence (-60dB)
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]

pub mod tolerances;

use cantor::prelude::*;

/// Default test sample rate
pub const TEST_SAMPLE_RATE: u32 = 48000;

/// Render period used by mixer tests
pub const TEST_PERIOD: usize = 480;

/// Mixer rendering float stereo at [`TEST_SAMPLE_RATE`], no device involved.
pub fn float_mixer() -> Mixer {
    let config = EngineConfig::default()
        .with_render_format(FormatInfo::internal(ChannelLayout::STEREO, TEST_SAMPLE_RATE))
        .with_period_frames(TEST_PERIOD);
    Mixer::new(config).expect("Failed to create test mixer")
}

/// Generate a sine wave at given frequency.
pub fn generate_sine(frequency: f64, sample_rate: u32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Sum of sines, one per `(frequency, amplitude)` pair.
pub fn generate_tones(tones: &[(f64, f32)], sample_rate: u32, num_samples: usize) -> Vec<f32> {
    let mut out = vec![0.0; num_samples];
    for &(frequency, amplitude) in tones {
        for (o, s) in out.iter_mut().zip(generate_sine(frequency, sample_rate, num_samples)) {
            *o += s * amplitude;
        }
    }
    out
}

/// Generate white noise in -1..1.
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    // LCG for reproducible noise
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng >> 33) as f32 / u32::MAX as f32) * 4.0 - 1.0
        })
        .collect()
}

/// Generate an impulse signal (single sample at 1.0, rest zeros).
pub fn generate_impulse(num_samples: usize, position: usize) -> Vec<f32> {
    let mut samples = vec![0.0; num_samples];
    if position < num_samples {
        samples[position] = 1.0;
    }
    samples
}

/// Mono buffer holding `samples`.
pub fn mono(samples: Vec<f32>, sample_rate: u32) -> SampleBuffer {
    SampleBuffer::from_interleaved(samples, ChannelLayout::MONO, sample_rate)
        .expect("mono buffer")
}

/// Stereo buffer with `samples` on both channels.
pub fn stereo(samples: &[f32], sample_rate: u32) -> SampleBuffer {
    SampleBuffer::from_channels(&[samples, samples], sample_rate).expect("stereo buffer")
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Magnitude of the `frequency` component, by correlation with a sine/cosine pair.
pub fn tone_magnitude(samples: &[f32], frequency: f64, sample_rate: u32) -> f32 {
    let (mut re, mut im) = (0.0f64, 0.0f64);
    for (i, &s) in samples.iter().enumerate() {
        let phase = 2.0 * std::f64::consts::PI * frequency * i as f64 / sample_rate as f64;
        re += s as f64 * phase.cos();
        im += s as f64 * phase.sin();
    }
    (2.0 * (re * re + im * im).sqrt() / samples.len().max(1) as f64) as f32
}

/// Assert two signals are equal within tolerance, with detailed error message.
pub fn assert_signals_equal(a: &[f32], b: &[f32], epsilon: f32, context: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", context);
    let first = a
        .iter()
        .zip(b)
        .position(|(x, y)| (x - y).abs() > epsilon);
    if let Some(i) = first {
        panic!(
            "{}: Signals differ - first diff at sample {}: {} vs {}",
            context, i, a[i], b[i]
        );
    }
}

/// Assert signal is silent within threshold.
pub fn assert_is_silent(samples: &[f32], threshold: f32, context: &str) {
    let max_val = peak(samples);
    assert!(
        max_val <= threshold,
        "{}: Expected silence (threshold {}), but peak was {}",
        context,
        threshold,
        max_val
    );
}

/// Assert signal is NOT silent (has content above threshold).
pub fn assert_not_silent(samples: &[f32], min_peak: f32, context: &str) {
    let max_val = peak(samples);
    assert!(
        max_val >= min_peak,
        "{}: Expected audio (min_peak {}), but peak was only {}",
        context,
        min_peak,
        max_val
    );
}
