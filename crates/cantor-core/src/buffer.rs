//! Owned sample stores.
//!
//! [`SampleBuffer`] always holds interleaved, normalized `f32` frames (the
//! internal representation). Encoded device or file data lives in an
//! [`EncodedBuffer`] until a codec decodes it; ownership moves between the two
//! rather than being shared.

use crate::format::FormatInfo;
use crate::layout::ChannelLayout;
use crate::{Error, Result};
use std::ops::{DivAssign, Index, IndexMut, MulAssign};

/// Interleaved normalized samples plus the layout and rate they are tagged with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    frame_count: usize,
    channel_layout: ChannelLayout,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Silent buffer of `frame_count` frames.
    pub fn new(frame_count: usize, channel_layout: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; frame_count * channel_layout.channels()],
            frame_count,
            channel_layout,
            sample_rate,
        }
    }

    /// Like [`SampleBuffer::new`] but reports allocation failure instead of aborting.
    pub fn try_new(
        frame_count: usize,
        channel_layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let len = frame_count
            .checked_mul(channel_layout.channels())
            .ok_or_else(|| Error::InsufficientMemory(format!("{frame_count} frames overflow")))?;
        let mut samples = Vec::new();
        samples.try_reserve_exact(len).map_err(|e| {
            Error::InsufficientMemory(format!("cannot allocate {frame_count} frames: {e}"))
        })?;
        samples.resize(len, 0.0);
        Ok(Self {
            samples,
            frame_count,
            channel_layout,
            sample_rate,
        })
    }

    pub fn empty(channel_layout: ChannelLayout, sample_rate: u32) -> Self {
        Self::new(0, channel_layout, sample_rate)
    }

    pub fn from_interleaved(
        samples: Vec<f32>,
        channel_layout: ChannelLayout,
        sample_rate: u32,
    ) -> Result<Self> {
        let channels = channel_layout.channels();
        if channels == 0 || samples.len() % channels != 0 {
            return Err(Error::InvalidArgument(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            frame_count: samples.len() / channels,
            samples,
            channel_layout,
            sample_rate,
        })
    }

    /// Interleave equally sized planar channels.
    pub fn from_channels<C: AsRef<[f32]>>(channels: &[C], sample_rate: u32) -> Result<Self> {
        let count = channels.len();
        let frame_count = channels.first().map_or(0, |c| c.as_ref().len());
        if count == 0 || channels.iter().any(|c| c.as_ref().len() != frame_count) {
            return Err(Error::InvalidArgument(
                "channels must be non-empty and equally long".into(),
            ));
        }
        let layout = ChannelLayout::default_for(count as u16)
            .unwrap_or_else(|| ChannelLayout::unpositioned(count as u16));

        let mut buffer = Self::new(frame_count, layout, sample_rate);
        for (ch, data) in channels.iter().enumerate() {
            for (frame, &sample) in data.as_ref().iter().enumerate() {
                buffer.samples[frame * count + ch] = sample;
            }
        }
        Ok(buffer)
    }

    pub(crate) fn from_parts(
        samples: Vec<f32>,
        frame_count: usize,
        channel_layout: ChannelLayout,
        sample_rate: u32,
    ) -> Self {
        debug_assert_eq!(samples.len(), frame_count * channel_layout.channels());
        Self {
            samples,
            frame_count,
            channel_layout,
            sample_rate,
        }
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channel_layout.channels()
    }

    #[inline]
    pub fn channel_layout(&self) -> ChannelLayout {
        self.channel_layout
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn format(&self) -> FormatInfo {
        FormatInfo::internal(self.channel_layout, self.sample_rate)
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        self.samples.chunks_exact(self.channels().max(1))
    }

    pub fn frames_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        let channels = self.channels().max(1);
        self.samples.chunks_exact_mut(channels)
    }

    /// Copy of one channel as a planar vector.
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        self.frames().map(|frame| frame[channel]).collect()
    }

    /// Overwrite one channel from planar data; extra input is ignored.
    pub fn set_channel(&mut self, channel: usize, data: &[f32]) {
        for (frame, &sample) in self.frames_mut().zip(data) {
            frame[channel] = sample;
        }
    }

    /// `frame_count` frames starting at `start`, zero-padded past the end.
    pub fn sub_buffer(&self, start: usize, frame_count: usize) -> Self {
        let mut out = Self::new(frame_count, self.channel_layout, self.sample_rate);
        if start < self.frame_count {
            let available = frame_count.min(self.frame_count - start);
            let channels = self.channels();
            out.samples[..available * channels].copy_from_slice(
                &self.samples[start * channels..(start + available) * channels],
            );
        }
        out
    }

    pub fn append(&mut self, other: &SampleBuffer) -> Result<()> {
        self.check_compatible(other)?;
        self.samples.extend_from_slice(&other.samples);
        self.frame_count += other.frame_count;
        Ok(())
    }

    /// Insert `other` before `frame_index`, appending when the index is past the end.
    pub fn insert(&mut self, other: &SampleBuffer, frame_index: usize) -> Result<()> {
        self.check_compatible(other)?;
        let at = frame_index.min(self.frame_count) * self.channels();
        self.samples
            .splice(at..at, other.samples.iter().copied());
        self.frame_count += other.frame_count;
        Ok(())
    }

    /// Remove up to `frame_count` frames starting at `start`.
    pub fn cut(&mut self, start: usize, frame_count: usize) {
        if start >= self.frame_count {
            return;
        }
        let end = (start + frame_count).min(self.frame_count);
        let channels = self.channels();
        self.samples.drain(start * channels..end * channels);
        self.frame_count -= end - start;
    }

    /// Grow with silence or truncate.
    pub fn resize(&mut self, frame_count: usize) {
        self.samples.resize(frame_count * self.channels(), 0.0);
        self.frame_count = frame_count;
    }

    /// Zero every sample.
    pub fn reset(&mut self) {
        self.samples.fill(0.0);
    }

    pub fn reverse(&mut self) {
        let channels = self.channels();
        if channels == 0 {
            return;
        }
        for i in 0..self.frame_count / 2 {
            let j = self.frame_count - 1 - i;
            for ch in 0..channels {
                self.samples.swap(i * channels + ch, j * channels + ch);
            }
        }
    }

    pub fn abs_max(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum / self.samples.len() as f64).sqrt() as f32
    }

    fn check_compatible(&self, other: &SampleBuffer) -> Result<()> {
        if self.channel_layout != other.channel_layout || self.sample_rate != other.sample_rate {
            return Err(Error::InvalidArgument(format!(
                "buffer format mismatch: {} ch @ {} Hz vs {} ch @ {} Hz",
                self.channels(),
                self.sample_rate,
                other.channels(),
                other.sample_rate
            )));
        }
        Ok(())
    }
}

impl Index<usize> for SampleBuffer {
    type Output = [f32];

    #[inline]
    fn index(&self, frame: usize) -> &[f32] {
        let channels = self.channels();
        &self.samples[frame * channels..(frame + 1) * channels]
    }
}

impl IndexMut<usize> for SampleBuffer {
    #[inline]
    fn index_mut(&mut self, frame: usize) -> &mut [f32] {
        let channels = self.channels();
        &mut self.samples[frame * channels..(frame + 1) * channels]
    }
}

impl MulAssign<f32> for SampleBuffer {
    fn mul_assign(&mut self, rhs: f32) {
        self.samples.iter_mut().for_each(|s| *s *= rhs);
    }
}

impl DivAssign<f32> for SampleBuffer {
    fn div_assign(&mut self, rhs: f32) {
        self.samples.iter_mut().for_each(|s| *s /= rhs);
    }
}

/// Raw encoded bytes plus the format that describes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBuffer {
    bytes: Vec<u8>,
    frame_count: usize,
    format: FormatInfo,
}

impl EncodedBuffer {
    pub fn new(bytes: Vec<u8>, format: FormatInfo) -> Result<Self> {
        let frame_size = format.frame_size();
        if frame_size == 0 {
            return Err(Error::Fail(format!(
                "format with {} channels and {} bits has no frame size",
                format.channels(),
                format.bits_per_sample
            )));
        }
        if bytes.len() % frame_size != 0 {
            return Err(Error::Fail(format!(
                "{} bytes is not a whole number of {}-byte frames",
                bytes.len(),
                frame_size
            )));
        }
        Ok(Self {
            frame_count: bytes.len() / frame_size,
            bytes,
            format,
        })
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    pub fn format(&self) -> &FormatInfo {
        &self.format
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}
