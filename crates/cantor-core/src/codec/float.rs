//! IEEE 754 float samples (32 or 64 bit).

use super::{decode_samples, encode_samples, push_ordered, read_ordered, Codec};
use crate::buffer::{EncodedBuffer, SampleBuffer};
use crate::format::{format_tag, FormatInfo};
use crate::{Error, Result};

pub struct FloatCodec;

impl Codec for FloatCodec {
    fn tag(&self) -> u16 {
        format_tag::IEEE_FLOAT
    }

    fn name(&self) -> &'static str {
        "IEEE float"
    }

    fn decode(&self, encoded: &EncodedBuffer) -> Result<SampleBuffer> {
        let endian = encoded.format().endian;
        match encoded.format().bits_per_sample {
            32 => Ok(decode_samples(encoded, |b| {
                f32::from_be_bytes(read_ordered(b, endian))
            })),
            64 => Ok(decode_samples(encoded, |b| {
                f64::from_be_bytes(read_ordered(b, endian)) as f32
            })),
            other => Err(Error::Fail(format!("unsupported float bit depth {other}"))),
        }
    }

    fn encode(&self, buffer: SampleBuffer, format: &FormatInfo) -> Result<EncodedBuffer> {
        let endian = format.endian;
        let target = FormatInfo::new(
            format_tag::IEEE_FLOAT,
            buffer.channel_layout(),
            buffer.sample_rate(),
            format.bits_per_sample,
            endian,
        );
        match format.bits_per_sample {
            32 => encode_samples(&buffer, target, |s, out| {
                push_ordered(out, s.to_be_bytes(), endian)
            }),
            64 => encode_samples(&buffer, target, |s, out| {
                push_ordered(out, (s as f64).to_be_bytes(), endian)
            }),
            other => Err(Error::Fail(format!("unsupported float bit depth {other}"))),
        }
    }
}
