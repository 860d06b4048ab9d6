//! Codec registry, WAV files and the mixer's encode path working together.

#[path = "helpers/mod.rs"]
mod helpers;

use cantor::prelude::*;
use helpers::tolerances::{G711_EPSILON, INT16_EPSILON};
use helpers::*;

#[test]
fn test_pcm16_roundtrip_through_registry() {
    let registry = CodecRegistry::with_defaults();
    let source = stereo(&generate_sine(440.0, TEST_SAMPLE_RATE, 4800), TEST_SAMPLE_RATE);
    let format = FormatInfo::pcm(ChannelLayout::STEREO, TEST_SAMPLE_RATE, 16);

    let encoded = registry.encode(source.clone(), &format).unwrap();
    assert_eq!(encoded.frame_count(), 4800);
    assert_eq!(encoded.byte_len(), 4800 * 4);

    let decoded = registry.decode(&encoded).unwrap();
    assert_signals_equal(decoded.as_slice(), source.as_slice(), INT16_EPSILON, "pcm16");
}

#[test]
fn test_g711_encodes_at_8khz() {
    let registry = CodecRegistry::with_defaults();
    let source = mono(generate_sine(300.0, TEST_SAMPLE_RATE, 4800), TEST_SAMPLE_RATE);

    for tag in [format_tag::ALAW, format_tag::MULAW] {
        let format = FormatInfo::new(tag, ChannelLayout::MONO, 8000, 8, Default::default());
        let encoded = registry.encode(source.clone(), &format).unwrap();
        assert_eq!(encoded.format().sample_rate, 8000);
        assert_eq!(encoded.frame_count(), 800);

        let decoded = registry.decode(&encoded).unwrap();
        let reference = mono(generate_sine(300.0, 8000, 800), 8000);
        // skip the last frame: the resampler holds it
        assert_signals_equal(
            &decoded.as_slice()[..799],
            &reference.as_slice()[..799],
            G711_EPSILON,
            "g711",
        );
    }
}

#[test]
fn test_unknown_tag_is_not_implemented() {
    let registry = CodecRegistry::with_defaults();
    let format = FormatInfo::new(0x0055, ChannelLayout::STEREO, 44100, 16, Default::default());
    let err = registry
        .encode(SampleBuffer::new(10, ChannelLayout::STEREO, 44100), &format)
        .unwrap_err();
    assert_eq!(err.kind(), cantor::ErrorKind::NotImplemented);
}

#[test]
fn test_render_to_mulaw_and_back() {
    let format = FormatInfo::new(format_tag::MULAW, ChannelLayout::MONO, 8000, 8, Default::default());
    let mixer = Mixer::new(EngineConfig::default().with_render_format(format)).unwrap();
    mixer
        .play(mono(generate_sine(200.0, 8000, 800), 8000), PlayOptions::default())
        .unwrap();

    let (encoded, report) = mixer.render(400).unwrap();
    assert_eq!(report.mixed, 1);
    assert_eq!(encoded.byte_len(), 400);

    let decoded = mixer.codecs().decode(&encoded).unwrap();
    let reference = generate_sine(200.0, 8000, 400);
    assert_signals_equal(decoded.as_slice(), &reference, G711_EPSILON, "mulaw render");
}

#[test]
fn test_wav_roundtrip_with_layout_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixdown.wav");
    let source = stereo(&generate_sine(1000.0, TEST_SAMPLE_RATE, 4800), TEST_SAMPLE_RATE);

    let mixer = float_mixer();
    let format = FormatInfo::pcm(ChannelLayout::MONO, TEST_SAMPLE_RATE, 24);
    assert!(mixer.save_to_file(&path, source.clone(), &format));

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().bits_per_sample, 24);

    let loaded = WavSource::open(&path).unwrap().read_all().unwrap();
    assert_eq!(loaded.frame_count(), 4800);
    assert_signals_equal(loaded.as_slice(), &source.channel(0), 1e-5, "wav 24-bit");
}
