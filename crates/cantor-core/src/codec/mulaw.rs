//! ITU-T G.711 µ-law companding.

use super::alaw::{check_g711_bits, g711_format, to_i16, G711_SAMPLE_RATE};
use super::{decode_samples, encode_samples, Codec};
use crate::buffer::{EncodedBuffer, SampleBuffer};
use crate::format::{format_tag, FormatInfo};
use crate::{change_sample_rate, Result};

const BIAS: i32 = 0x84;
const CLIP: i32 = 32635;

#[inline]
pub(crate) fn encode_mulaw(pcm: i16) -> u8 {
    let mut value = pcm as i32;
    let sign = if value < 0 {
        value = -value;
        0x80
    } else {
        0x00
    };
    value = value.min(CLIP) + BIAS;

    let mut exponent = 7;
    let mut probe = 0x4000;
    while exponent > 0 && value & probe == 0 {
        exponent -= 1;
        probe >>= 1;
    }
    let mantissa = (value >> (exponent + 3)) & 0x0F;
    !((sign | (exponent << 4) | mantissa) as u8)
}

#[inline]
pub(crate) fn decode_mulaw(value: u8) -> i16 {
    let u = !value as i32;
    let mut t = ((u & 0x0F) << 3) + BIAS;
    t <<= (u & 0x70) >> 4;
    if u & 0x80 != 0 {
        (BIAS - t) as i16
    } else {
        (t - BIAS) as i16
    }
}

pub struct MuLawCodec;

impl Codec for MuLawCodec {
    fn tag(&self) -> u16 {
        format_tag::MULAW
    }

    fn name(&self) -> &'static str {
        "µ-law"
    }

    fn decode(&self, encoded: &EncodedBuffer) -> Result<SampleBuffer> {
        check_g711_bits(encoded)?;
        Ok(decode_samples(encoded, |b| decode_mulaw(b[0]) as f32 / 32768.0))
    }

    fn encode(&self, mut buffer: SampleBuffer, _format: &FormatInfo) -> Result<EncodedBuffer> {
        change_sample_rate(&mut buffer, G711_SAMPLE_RATE);
        let target = g711_format(format_tag::MULAW, &buffer);
        encode_samples(&buffer, target, |s, out| out.push(encode_mulaw(to_i16(s))))
    }
}
