//! WAV file sources and sinks using hound.

use crate::buffer::SampleBuffer;
use crate::format::{format_tag, FormatInfo};
use crate::layout::ChannelLayout;
use crate::source::{FrameSource, SourceChunk};
use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Seekable WAV reader producing normalized chunks.
pub struct WavSource {
    reader: WavReader<BufReader<File>>,
    spec: WavSpec,
    layout: ChannelLayout,
    position: usize,
}

impl WavSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)?;
        let spec = reader.spec();
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) | (SampleFormat::Int, 8 | 16 | 24 | 32) => {}
            (format, bits) => {
                return Err(Error::NotImplemented(format!(
                    "{}: {bits}-bit {format:?} WAV is not supported",
                    path.display()
                )))
            }
        }
        let layout = ChannelLayout::default_for(spec.channels)
            .unwrap_or_else(|| ChannelLayout::unpositioned(spec.channels));
        tracing::debug!(
            "Opened {} ({} Hz, {} ch, {} frames)",
            path.display(),
            spec.sample_rate,
            spec.channels,
            reader.duration()
        );
        Ok(Self {
            reader,
            spec,
            layout,
            position: 0,
        })
    }

    /// Decode the whole file.
    pub fn read_all(mut self) -> Result<SampleBuffer> {
        let frames = self.reader.duration() as usize;
        Ok(self.read(0, frames)?.buffer)
    }

    fn read_samples(&mut self, sample_count: usize) -> Result<Vec<f32>> {
        let mut samples = Vec::with_capacity(sample_count);
        match self.spec.sample_format {
            SampleFormat::Float => {
                for s in self.reader.samples::<f32>().take(sample_count) {
                    samples.push(s?);
                }
            }
            SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (self.spec.bits_per_sample - 1)) as f64;
                for s in self.reader.samples::<i32>().take(sample_count) {
                    samples.push((s? as f64 * scale) as f32);
                }
            }
        }
        Ok(samples)
    }
}

impl FrameSource for WavSource {
    fn format(&self) -> FormatInfo {
        FormatInfo::internal(self.layout, self.spec.sample_rate)
    }

    fn frame_count(&self) -> Option<usize> {
        Some(self.reader.duration() as usize)
    }

    fn read(&mut self, frame_index: usize, frame_count: usize) -> Result<SourceChunk> {
        let total = self.reader.duration() as usize;
        let start = frame_index.min(total);
        if start != self.position {
            self.reader.seek(start as u32)?;
            self.position = start;
        }

        let wanted = frame_count.min(total - start);
        let channels = self.layout.channels();
        let samples = self.read_samples(wanted * channels)?;
        let frames = samples.len() / channels;
        self.position += frames;

        let buffer = SampleBuffer::from_interleaved(samples, self.layout, self.spec.sample_rate)?;
        Ok(SourceChunk {
            buffer,
            finished: self.position >= total,
        })
    }
}

/// Write `buffer` to `path` as integer PCM (8/16/24/32 bit) or 32-bit float.
pub fn save_wav(path: impl AsRef<Path>, buffer: &SampleBuffer, format: &FormatInfo) -> Result<()> {
    let sample_format = match (format.format_tag, format.bits_per_sample) {
        (format_tag::IEEE_FLOAT, 32) => SampleFormat::Float,
        (format_tag::PCM, 8 | 16 | 24 | 32) => SampleFormat::Int,
        (tag, bits) => {
            return Err(Error::NotImplemented(format!(
                "cannot write {bits}-bit WAV with format tag {tag:#06x}"
            )))
        }
    };
    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: format.bits_per_sample,
        sample_format,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)?;
    match sample_format {
        SampleFormat::Float => {
            for &s in buffer.as_slice() {
                writer.write_sample(s)?;
            }
        }
        SampleFormat::Int => {
            let max = (1i64 << (format.bits_per_sample - 1)) as f64;
            for &s in buffer.as_slice() {
                let v = (s as f64 * max).round().clamp(-max, max - 1.0) as i32;
                if format.bits_per_sample == 8 {
                    writer.write_sample(v as i8)?;
                } else {
                    writer.write_sample(v)?;
                }
            }
        }
    }
    writer.finalize()?;
    Ok(())
}
