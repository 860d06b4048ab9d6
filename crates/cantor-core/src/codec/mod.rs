//! Codecs between the internal float representation and encoded bytes.
//!
//! A [`CodecRegistry`] owns one codec per format tag. It is a plain value;
//! whoever needs conversions (usually the mixer) owns its own registry.

mod alaw;
mod float;
mod mulaw;
mod pcm;

pub use alaw::ALawCodec;
pub use float::FloatCodec;
pub use mulaw::MuLawCodec;
pub use pcm::PcmCodec;

use crate::buffer::{EncodedBuffer, SampleBuffer};
use crate::format::{Endian, FormatInfo};
use crate::{change_channel_layout, change_sample_rate, Error, Result};

/// Converts between [`SampleBuffer`] and one encoded layout.
pub trait Codec: Send + Sync {
    /// Format tag handled by this codec.
    fn tag(&self) -> u16;

    fn name(&self) -> &'static str;

    fn decode(&self, encoded: &EncodedBuffer) -> Result<SampleBuffer>;

    /// Encode `buffer` into `format`'s bit depth and byte order.
    ///
    /// The buffer's own rate and layout are kept unless the codec mandates
    /// otherwise (the G.711 codecs always produce 8 kHz, 8-bit data).
    fn encode(&self, buffer: SampleBuffer, format: &FormatInfo) -> Result<EncodedBuffer>;
}

/// Tag-indexed set of codecs.
pub struct CodecRegistry {
    codecs: Vec<Box<dyn Codec>>,
}

impl CodecRegistry {
    /// Registry with no codecs.
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Registry with PCM, IEEE float, A-law and µ-law.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PcmCodec));
        registry.register(Box::new(FloatCodec));
        registry.register(Box::new(ALawCodec));
        registry.register(Box::new(MuLawCodec));
        registry
    }

    /// Add a codec, replacing any codec already registered for its tag.
    pub fn register(&mut self, codec: Box<dyn Codec>) {
        let tag = codec.tag();
        match self.codecs.iter_mut().find(|c| c.tag() == tag) {
            Some(slot) => {
                tracing::debug!("Replacing codec for tag {:#06x} with {}", tag, codec.name());
                *slot = codec;
            }
            None => self.codecs.push(codec),
        }
    }

    pub fn find(&self, tag: u16) -> Option<&dyn Codec> {
        self.codecs.iter().find(|c| c.tag() == tag).map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    fn require(&self, tag: u16) -> Result<&dyn Codec> {
        self.find(tag)
            .ok_or_else(|| Error::NotImplemented(format!("no codec for format tag {tag:#06x}")))
    }

    /// Decode into the internal representation.
    pub fn decode(&self, encoded: &EncodedBuffer) -> Result<SampleBuffer> {
        self.require(encoded.format().format_tag)?.decode(encoded)
    }

    /// Convert rate and layout to match `format`, then encode.
    pub fn encode(&self, buffer: SampleBuffer, format: &FormatInfo) -> Result<EncodedBuffer> {
        let codec = self.require(format.format_tag)?;
        let mut buffer = buffer;
        change_sample_rate(&mut buffer, format.sample_rate);
        change_channel_layout(&mut buffer, format.channel_layout)?;
        codec.encode(buffer, format)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|c| c.name()))
            .finish()
    }
}

/// Decode every fixed-width sample of `encoded` with `read`.
pub(crate) fn decode_samples(
    encoded: &EncodedBuffer,
    read: impl Fn(&[u8]) -> f32,
) -> SampleBuffer {
    let format = encoded.format();
    let width = format.bytes_per_sample();
    let samples = encoded.bytes().chunks_exact(width).map(read).collect();
    SampleBuffer::from_parts(
        samples,
        encoded.frame_count(),
        format.channel_layout,
        format.sample_rate,
    )
}

/// Encode every sample of `buffer` with `write`, which appends its bytes.
pub(crate) fn encode_samples(
    buffer: &SampleBuffer,
    format: FormatInfo,
    write: impl Fn(f32, &mut Vec<u8>),
) -> Result<EncodedBuffer> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(buffer.as_slice().len() * format.bytes_per_sample())
        .map_err(|e| Error::InsufficientMemory(format!("encode buffer: {e}")))?;
    for &sample in buffer.as_slice() {
        write(sample, &mut bytes);
    }
    EncodedBuffer::new(bytes, format)
}

/// Order `bytes` (given most significant first) for `endian`.
#[inline]
pub(crate) fn push_ordered<const N: usize>(out: &mut Vec<u8>, be_bytes: [u8; N], endian: Endian) {
    match endian {
        Endian::Big => out.extend_from_slice(&be_bytes),
        Endian::Little => out.extend(be_bytes.iter().rev()),
    }
}

/// Read `N` bytes into most-significant-first order.
#[inline]
pub(crate) fn read_ordered<const N: usize>(bytes: &[u8], endian: Endian) -> [u8; N] {
    let mut be = [0u8; N];
    match endian {
        Endian::Big => be.copy_from_slice(&bytes[..N]),
        Endian::Little => {
            for (dst, src) in be.iter_mut().zip(bytes[..N].iter().rev()) {
                *dst = *src;
            }
        }
    }
    be
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::format_tag;
    use crate::layout::ChannelLayout;

    struct SilentCodec;

    impl Codec for SilentCodec {
        fn tag(&self) -> u16 {
            format_tag::PCM
        }

        fn name(&self) -> &'static str {
            "silent"
        }

        fn decode(&self, encoded: &EncodedBuffer) -> Result<SampleBuffer> {
            let f = encoded.format();
            Ok(SampleBuffer::new(
                encoded.frame_count(),
                f.channel_layout,
                f.sample_rate,
            ))
        }

        fn encode(&self, buffer: SampleBuffer, format: &FormatInfo) -> Result<EncodedBuffer> {
            EncodedBuffer::new(vec![0; buffer.as_slice().len() * 2], *format)
        }
    }

    #[test]
    fn test_defaults_registered() {
        let registry = CodecRegistry::with_defaults();
        assert_eq!(registry.len(), 4);
        for tag in [
            format_tag::PCM,
            format_tag::IEEE_FLOAT,
            format_tag::ALAW,
            format_tag::MULAW,
        ] {
            assert_eq!(registry.find(tag).map(|c| c.tag()), Some(tag));
        }
        assert!(registry.find(0x0055).is_none());
    }

    #[test]
    fn test_register_replaces_same_tag() {
        let mut registry = CodecRegistry::with_defaults();
        registry.register(Box::new(SilentCodec));
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.find(format_tag::PCM).map(|c| c.name()), Some("silent"));
    }

    #[test]
    fn test_unknown_tag_not_implemented() {
        let registry = CodecRegistry::with_defaults();
        let mut format = FormatInfo::pcm(ChannelLayout::MONO, 8000, 16);
        format.format_tag = 0x0055;
        let encoded = EncodedBuffer::new(vec![0; 4], format).unwrap();
        let err = registry.decode(&encoded).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotImplemented);
    }

    #[test]
    fn test_encode_converts_rate_and_layout() {
        let registry = CodecRegistry::with_defaults();
        let buffer = SampleBuffer::new(100, ChannelLayout::MONO, 24000);
        let target = FormatInfo::pcm(ChannelLayout::STEREO, 48000, 16);
        let encoded = registry.encode(buffer, &target).unwrap();
        assert_eq!(encoded.frame_count(), 200);
        assert_eq!(encoded.byte_len(), 800);
    }

    #[test]
    fn test_byte_ordering_helpers() {
        let mut out = Vec::new();
        push_ordered(&mut out, [0x12, 0x34], Endian::Little);
        assert_eq!(out, vec![0x34, 0x12]);
        assert_eq!(read_ordered::<2>(&out, Endian::Little), [0x12, 0x34]);
        assert_eq!(read_ordered::<2>(&out, Endian::Big), [0x34, 0x12]);
    }
}
