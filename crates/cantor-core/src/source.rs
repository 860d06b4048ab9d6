//! Random-access pull contract for streamed voices.

use crate::buffer::SampleBuffer;
use crate::format::FormatInfo;
use crate::Result;

/// One read from a [`FrameSource`].
#[derive(Debug, Clone)]
pub struct SourceChunk {
    /// Decoded frames; shorter than requested only at the end of the stream.
    pub buffer: SampleBuffer,
    /// No frames exist past this chunk.
    pub finished: bool,
}

/// A file- or device-backed frame supplier.
///
/// Implementations must allow seeking: consecutive reads need not be contiguous.
pub trait FrameSource: Send {
    /// Channel layout and sample rate of decoded chunks.
    fn format(&self) -> FormatInfo;

    /// Total length in frames, when known.
    fn frame_count(&self) -> Option<usize>;

    /// Read up to `frame_count` frames starting at `frame_index`.
    fn read(&mut self, frame_index: usize, frame_count: usize) -> Result<SourceChunk>;
}
