//! Sample format descriptors.

use crate::layout::ChannelLayout;
use serde::{Deserialize, Serialize};

/// Numeric format tags, matching the WAVE `wFormatTag` registry.
pub mod format_tag {
    pub const PCM: u16 = 0x0001;
    pub const IEEE_FLOAT: u16 = 0x0003;
    pub const ALAW: u16 = 0x0006;
    pub const MULAW: u16 = 0x0007;
}

/// Byte order of encoded samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}

impl Default for Endian {
    fn default() -> Self {
        Self::native()
    }
}

/// Layout of a sample stream: tag, channels, rate and bit depth.
///
/// `frame_size = channels * bits_per_sample / 8` and
/// `byte_rate = sample_rate * frame_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatInfo {
    pub format_tag: u16,
    pub channel_layout: ChannelLayout,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    #[serde(default)]
    pub endian: Endian,
}

impl FormatInfo {
    pub const fn new(
        format_tag: u16,
        channel_layout: ChannelLayout,
        sample_rate: u32,
        bits_per_sample: u16,
        endian: Endian,
    ) -> Self {
        Self {
            format_tag,
            channel_layout,
            sample_rate,
            bits_per_sample,
            endian,
        }
    }

    /// The normalized 32-bit float representation every buffer is processed in.
    pub const fn internal(channel_layout: ChannelLayout, sample_rate: u32) -> Self {
        Self::new(
            format_tag::IEEE_FLOAT,
            channel_layout,
            sample_rate,
            32,
            Endian::native(),
        )
    }

    /// Little-endian integer PCM.
    pub const fn pcm(channel_layout: ChannelLayout, sample_rate: u32, bits_per_sample: u16) -> Self {
        Self::new(
            format_tag::PCM,
            channel_layout,
            sample_rate,
            bits_per_sample,
            Endian::Little,
        )
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channel_layout.channels()
    }

    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        self.channels() * self.bits_per_sample as usize / 8
    }

    #[inline]
    pub fn byte_rate(&self) -> usize {
        self.sample_rate as usize * self.frame_size()
    }

    pub fn is_internal(&self) -> bool {
        self.format_tag == format_tag::IEEE_FLOAT
            && self.bits_per_sample == 32
            && self.endian == Endian::native()
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_channel_layout(mut self, channel_layout: ChannelLayout) -> Self {
        self.channel_layout = channel_layout;
        self
    }
}

impl Default for FormatInfo {
    fn default() -> Self {
        Self::internal(ChannelLayout::STEREO, 48000)
    }
}
