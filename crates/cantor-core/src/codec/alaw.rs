//! ITU-T G.711 A-law companding.

use super::{decode_samples, encode_samples, Codec};
use crate::buffer::{EncodedBuffer, SampleBuffer};
use crate::format::{format_tag, Endian, FormatInfo};
use crate::{change_sample_rate, Error, Result};

/// Sample rate every G.711 stream is encoded at.
pub(crate) const G711_SAMPLE_RATE: u32 = 8000;

#[rustfmt::skip]
static DECODE_TABLE: [i16; 128] = [
    -5504, -5248, -6016, -5760, -4480, -4224, -4992, -4736,
    -7552, -7296, -8064, -7808, -6528, -6272, -7040, -6784,
    -2752, -2624, -3008, -2880, -2240, -2112, -2496, -2368,
    -3776, -3648, -4032, -3904, -3264, -3136, -3520, -3392,
    -22016, -20992, -24064, -23040, -17920, -16896, -19968, -18944,
    -30208, -29184, -32256, -31232, -26112, -25088, -28160, -27136,
    -11008, -10496, -12032, -11520, -8960, -8448, -9984, -9472,
    -15104, -14592, -16128, -15616, -13056, -12544, -14080, -13568,
    -344, -328, -376, -360, -280, -264, -312, -296,
    -472, -456, -504, -488, -408, -392, -440, -424,
    -88, -72, -120, -104, -24, -8, -56, -40,
    -216, -200, -248, -232, -152, -136, -184, -168,
    -1376, -1312, -1504, -1440, -1120, -1056, -1248, -1184,
    -1888, -1824, -2016, -1952, -1632, -1568, -1760, -1696,
    -688, -656, -752, -720, -560, -528, -624, -592,
    -944, -912, -1008, -976, -816, -784, -880, -848,
];

/// Segment number indexed by the top seven magnitude bits.
#[rustfmt::skip]
static SEGMENT_TABLE: [u8; 128] = [
    1, 1, 2, 2, 3, 3, 3, 3,
    4, 4, 4, 4, 4, 4, 4, 4,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7,
];

#[inline]
pub(crate) fn decode_alaw(value: u8) -> i16 {
    if value < 128 {
        DECODE_TABLE[value as usize]
    } else {
        -DECODE_TABLE[(value - 128) as usize]
    }
}

#[inline]
pub(crate) fn encode_alaw(pcm: i16) -> u8 {
    let (magnitude, mask) = if pcm >= 0 {
        (pcm as i32, 0xD5)
    } else {
        ((-(pcm as i32)).min(i16::MAX as i32), 0x55)
    };

    let code = if magnitude > 255 {
        let segment = SEGMENT_TABLE[((magnitude & 0x7F00) >> 8) as usize] as i32;
        (segment << 4) | ((magnitude >> (segment + 3)) & 0x0F)
    } else {
        magnitude >> 4
    };
    (code as u8) ^ mask
}

/// Convert a normalized sample to 16-bit for companding.
#[inline]
pub(crate) fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

pub(crate) fn g711_format(tag: u16, buffer: &SampleBuffer) -> FormatInfo {
    FormatInfo::new(tag, buffer.channel_layout(), G711_SAMPLE_RATE, 8, Endian::native())
}

pub(crate) fn check_g711_bits(encoded: &EncodedBuffer) -> Result<()> {
    match encoded.format().bits_per_sample {
        8 => Ok(()),
        other => Err(Error::Fail(format!(
            "G.711 data must be 8-bit, got {other}"
        ))),
    }
}

pub struct ALawCodec;

impl Codec for ALawCodec {
    fn tag(&self) -> u16 {
        format_tag::ALAW
    }

    fn name(&self) -> &'static str {
        "A-law"
    }

    fn decode(&self, encoded: &EncodedBuffer) -> Result<SampleBuffer> {
        check_g711_bits(encoded)?;
        Ok(decode_samples(encoded, |b| decode_alaw(b[0]) as f32 / 32768.0))
    }

    fn encode(&self, mut buffer: SampleBuffer, _format: &FormatInfo) -> Result<EncodedBuffer> {
        change_sample_rate(&mut buffer, G711_SAMPLE_RATE);
        let target = g711_format(format_tag::ALAW, &buffer);
        encode_samples(&buffer, target, |s, out| out.push(encode_alaw(to_i16(s))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ChannelLayout;

    #[test]
    fn test_known_values() {
        assert_eq!(decode_alaw(encode_alaw(1000)), 1008);
        assert_eq!(decode_alaw(encode_alaw(100)), 104);
        assert_eq!(decode_alaw(encode_alaw(-1000)), -1008);
        assert_eq!(encode_alaw(0), 0xD5);
    }

    #[test]
    fn test_every_code_is_stable() {
        for code in 0..=255u8 {
            let pcm = decode_alaw(code);
            assert_eq!(decode_alaw(encode_alaw(pcm)), pcm, "code {code:#04x}");
        }
    }

    #[test]
    fn test_encode_forces_8khz_8bit() {
        let buffer = SampleBuffer::new(480, ChannelLayout::MONO, 48000);
        let format = FormatInfo::pcm(ChannelLayout::MONO, 48000, 16);
        let encoded = ALawCodec.encode(buffer, &format).unwrap();
        assert_eq!(encoded.format().format_tag, format_tag::ALAW);
        assert_eq!(encoded.format().sample_rate, 8000);
        assert_eq!(encoded.format().bits_per_sample, 8);
        assert_eq!(encoded.frame_count(), 80);
    }

    #[test]
    fn test_sine_roundtrip() {
        let samples: Vec<f32> = (0..800)
            .map(|i| 0.9 * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 8000.0).sin())
            .collect();
        let buffer =
            SampleBuffer::from_interleaved(samples.clone(), ChannelLayout::MONO, 8000).unwrap();
        let encoded = ALawCodec.encode(buffer, &FormatInfo::default()).unwrap();
        let decoded = ALawCodec.decode(&encoded).unwrap();
        for (a, b) in samples.iter().zip(decoded.as_slice()) {
            assert!((a - b).abs() < 0.04, "{a} vs {b}");
        }
    }
}
