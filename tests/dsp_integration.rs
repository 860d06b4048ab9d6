//! Spectral filters, pitch and speed changes, and effect chains on real signals.

#[path = "helpers/mod.rs"]
mod helpers;

use approx::assert_abs_diff_eq;
use cantor::prelude::*;
use helpers::tolerances::PERCEPTUAL_EPSILON;
use helpers::*;

const FRAMES: usize = 48000;

fn middle(buffer: &SampleBuffer) -> Vec<f32> {
    buffer.sub_buffer(8192, 24000).channel(0)
}

#[test]
fn test_low_pass_separates_tones() {
    let mut buffer = mono(
        generate_tones(&[(200.0, 0.5), (8000.0, 0.5)], TEST_SAMPLE_RATE, FRAMES),
        TEST_SAMPLE_RATE,
    );
    low_pass_filter(&mut buffer, SpectralConfig::default(), 2000.0).unwrap();

    let kept = middle(&buffer);
    assert_abs_diff_eq!(tone_magnitude(&kept, 200.0, TEST_SAMPLE_RATE), 0.5, epsilon = 0.02);
    assert!(tone_magnitude(&kept, 8000.0, TEST_SAMPLE_RATE) < 0.01);
}

#[test]
fn test_equalizer_then_band_pass() {
    let mut buffer = mono(
        generate_tones(&[(300.0, 0.3), (3000.0, 0.3), (12000.0, 0.3)], TEST_SAMPLE_RATE, FRAMES),
        TEST_SAMPLE_RATE,
    );
    let bands = [EqualizerBand::new(2000.0, 4000.0, 2.0)];
    equalizer(&mut buffer, SpectralConfig::default(), &bands).unwrap();
    band_pass_filter(&mut buffer, SpectralConfig::default(), 1000.0, 6000.0).unwrap();

    let out = middle(&buffer);
    assert_abs_diff_eq!(tone_magnitude(&out, 3000.0, TEST_SAMPLE_RATE), 0.6, epsilon = 0.03);
    assert!(tone_magnitude(&out, 300.0, TEST_SAMPLE_RATE) < 0.01);
    assert!(tone_magnitude(&out, 12000.0, TEST_SAMPLE_RATE) < 0.01);
}

#[test]
fn test_octave_up_moves_energy() {
    let mut buffer = mono(generate_sine(440.0, TEST_SAMPLE_RATE, FRAMES), TEST_SAMPLE_RATE);
    pitch_shift(&mut buffer, 12.0, SpectralConfig::default()).unwrap();
    assert_eq!(buffer.frame_count(), FRAMES);

    let out = middle(&buffer);
    let shifted = tone_magnitude(&out, 880.0, TEST_SAMPLE_RATE);
    let original = tone_magnitude(&out, 440.0, TEST_SAMPLE_RATE);
    assert!(shifted > 0.2, "880 Hz magnitude {}", shifted);
    assert!(original < shifted * 0.1, "440 Hz magnitude {}", original);
}

#[test]
fn test_speed_change_lengths_and_level() {
    let source = mono(generate_sine(500.0, TEST_SAMPLE_RATE, FRAMES), TEST_SAMPLE_RATE);

    let mut fast = source.clone();
    change_speed(&mut fast, 2.0, 1024, &Window::hann(2048)).unwrap();
    assert_eq!(fast.frame_count(), FRAMES / 2);
    assert_not_silent(fast.as_slice(), 0.1, "double speed");
    assert!(peak(fast.as_slice()) <= 1.5);

    let mut slow = source;
    change_speed(&mut slow, 0.5, 1024, &Window::hann(2048)).unwrap();
    assert_eq!(slow.frame_count(), FRAMES * 2);
    assert_not_silent(slow.as_slice(), 0.1, "half speed");
}

#[test]
fn test_effect_chain_stays_in_range() {
    let mut buffer = stereo(&generate_noise(FRAMES, 7), TEST_SAMPLE_RATE);
    echo(&mut buffer, &Default::default()).unwrap();
    chorus(&mut buffer, &Lfo::sine(1.5), &Default::default()).unwrap();
    flanger(&mut buffer, &Lfo::new(LfoShape::Triangle, 0.25), &Default::default()).unwrap();
    wah(&mut buffer, &Lfo::sine(2.0), &Default::default()).unwrap();
    tremolo(&mut buffer, &Lfo::new(LfoShape::Square, 5.0), 0.5).unwrap();
    vibrato(&mut buffer, &Lfo::sine(6.0), 0.5, 0.5).unwrap();

    assert!(buffer.frame_count() > FRAMES, "echo tail appended");
    assert!(peak(buffer.as_slice()) <= 1.0 + PERCEPTUAL_EPSILON);
    assert_not_silent(buffer.as_slice(), 0.05, "effect chain");
}

#[test]
fn test_distortion_on_mixer_voice() {
    let mixer = float_mixer();
    let loud = stereo(&vec![0.9; 960], TEST_SAMPLE_RATE);
    let handle = mixer
        .play(loud, PlayOptions::default().distortion(Distortion::hard_clip(0.5, -0.5)))
        .unwrap();

    let mut out = SampleBuffer::new(TEST_PERIOD, ChannelLayout::STEREO, TEST_SAMPLE_RATE);
    mixer.mix(&mut out, TEST_PERIOD).unwrap();
    assert!(out.as_slice().iter().all(|&s| (s - 0.5).abs() < 1e-6));

    assert!(mixer.set_distortion(handle.id(), None));
    let mut out = SampleBuffer::new(TEST_PERIOD, ChannelLayout::STEREO, TEST_SAMPLE_RATE);
    mixer.mix(&mut out, TEST_PERIOD).unwrap();
    assert!(out.as_slice().iter().all(|&s| (s - 0.9).abs() < 1e-6));
}
