//! Integer PCM: unsigned 8-bit, signed 16/24/32-bit, either byte order.

use super::{decode_samples, encode_samples, push_ordered, read_ordered, Codec};
use crate::buffer::{EncodedBuffer, SampleBuffer};
use crate::format::{format_tag, FormatInfo};
use crate::{Error, Result};

const INT24_SCALE: f64 = 8_388_608.0;
const INT32_SCALE: f64 = 2_147_483_648.0;

pub struct PcmCodec;

impl PcmCodec {
    fn check_bits(bits: u16) -> Result<()> {
        match bits {
            8 | 16 | 24 | 32 => Ok(()),
            other => Err(Error::Fail(format!("unsupported PCM bit depth {other}"))),
        }
    }
}

impl Codec for PcmCodec {
    fn tag(&self) -> u16 {
        format_tag::PCM
    }

    fn name(&self) -> &'static str {
        "PCM"
    }

    fn decode(&self, encoded: &EncodedBuffer) -> Result<SampleBuffer> {
        let format = *encoded.format();
        Self::check_bits(format.bits_per_sample)?;
        let endian = format.endian;

        let buffer = match format.bits_per_sample {
            8 => decode_samples(encoded, |b| (b[0] as f32 - 128.0) / 128.0),
            16 => decode_samples(encoded, |b| {
                i16::from_be_bytes(read_ordered(b, endian)) as f32 / 32768.0
            }),
            24 => decode_samples(encoded, |b| {
                let [hi, mid, lo] = read_ordered::<3>(b, endian);
                // sign-extend through the top byte of an i32
                let value = i32::from_be_bytes([hi, mid, lo, 0]) >> 8;
                (value as f64 / INT24_SCALE) as f32
            }),
            _ => decode_samples(encoded, |b| {
                (i32::from_be_bytes(read_ordered(b, endian)) as f64 / INT32_SCALE) as f32
            }),
        };
        Ok(buffer)
    }

    fn encode(&self, buffer: SampleBuffer, format: &FormatInfo) -> Result<EncodedBuffer> {
        Self::check_bits(format.bits_per_sample)?;
        let endian = format.endian;
        let target = FormatInfo::new(
            format_tag::PCM,
            buffer.channel_layout(),
            buffer.sample_rate(),
            format.bits_per_sample,
            endian,
        );

        match format.bits_per_sample {
            8 => encode_samples(&buffer, target, |s, out| {
                out.push((s * 128.0 + 128.0).round().clamp(0.0, 255.0) as u8)
            }),
            16 => encode_samples(&buffer, target, |s, out| {
                let v = (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
                push_ordered(out, v.to_be_bytes(), endian)
            }),
            24 => encode_samples(&buffer, target, |s, out| {
                let v = (s as f64 * INT24_SCALE)
                    .round()
                    .clamp(-INT24_SCALE, INT24_SCALE - 1.0) as i32;
                let [_, hi, mid, lo] = v.to_be_bytes();
                push_ordered(out, [hi, mid, lo], endian)
            }),
            _ => encode_samples(&buffer, target, |s, out| {
                let v = (s as f64 * INT32_SCALE)
                    .round()
                    .clamp(i32::MIN as f64, i32::MAX as f64) as i32;
                push_ordered(out, v.to_be_bytes(), endian)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Endian;
    use crate::layout::ChannelLayout;
    use proptest::prelude::*;

    fn encode(samples: Vec<f32>, bits: u16, endian: Endian) -> EncodedBuffer {
        let buffer = SampleBuffer::from_interleaved(samples, ChannelLayout::STEREO, 44100).unwrap();
        let mut format = FormatInfo::pcm(ChannelLayout::STEREO, 44100, bits);
        format.endian = endian;
        PcmCodec.encode(buffer, &format).unwrap()
    }

    #[test]
    fn test_16bit_little_endian_bytes() {
        let encoded = encode(vec![0.5, -0.5], 16, Endian::Little);
        assert_eq!(encoded.bytes(), &[0x00, 0x40, 0x00, 0xC0]);
    }

    #[test]
    fn test_24bit_big_endian_bytes() {
        let encoded = encode(vec![-1.0, 0.25], 24, Endian::Big);
        assert_eq!(encoded.bytes(), &[0x80, 0x00, 0x00, 0x20, 0x00, 0x00]);
        let decoded = PcmCodec.decode(&encoded).unwrap();
        assert_eq!(decoded.as_slice(), &[-1.0, 0.25]);
    }

    #[test]
    fn test_8bit_is_unsigned() {
        let encoded = encode(vec![0.0, -1.0], 8, Endian::Little);
        assert_eq!(encoded.bytes(), &[128, 0]);
    }

    #[test]
    fn test_full_scale_clamps() {
        let encoded = encode(vec![1.0, 2.0], 16, Endian::Little);
        assert_eq!(encoded.bytes(), &[0xFF, 0x7F, 0xFF, 0x7F]);
    }

    #[test]
    fn test_unsupported_bit_depth() {
        let buffer = SampleBuffer::new(4, ChannelLayout::MONO, 8000);
        let format = FormatInfo::pcm(ChannelLayout::MONO, 8000, 12);
        let err = PcmCodec.encode(buffer, &format).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Fail);
    }

    proptest! {
        #[test]
        fn prop_roundtrip_within_one_step(
            samples in proptest::collection::vec(-1.0f32..1.0, 2..64usize).prop_filter("even", |v| v.len() % 2 == 0),
            bits in prop_oneof![Just(8u16), Just(16u16), Just(24u16), Just(32u16)],
            big in any::<bool>(),
        ) {
            let endian = if big { Endian::Big } else { Endian::Little };
            let encoded = encode(samples.clone(), bits, endian);
            let decoded = PcmCodec.decode(&encoded).unwrap();
            let step = 1.0 / (1u64 << (bits - 1)) as f32;
            for (a, b) in samples.iter().zip(decoded.as_slice()) {
                prop_assert!((a - b).abs() <= step + f32::EPSILON, "{} vs {} at {} bits", a, b, bits);
            }
        }
    }
}
