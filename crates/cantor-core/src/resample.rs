//! Linear-interpolation sample rate conversion.

use crate::buffer::SampleBuffer;

/// Frames produced by converting `frame_count` frames from `source_rate` to
/// `target_rate`: `ceil(frame_count * target / source)`.
pub fn resampled_len(frame_count: usize, source_rate: u32, target_rate: u32) -> usize {
    if source_rate == 0 {
        return 0;
    }
    let num = frame_count as u128 * target_rate as u128;
    num.div_ceil(source_rate as u128) as usize
}

/// Convert `buffer` to `target_rate` in place. Equal rates are a no-op.
///
/// Output frame `i` reads source position `i / ratio`. Frames whose
/// interpolation partner lies past the end hold the last source frame.
pub fn change_sample_rate(buffer: &mut SampleBuffer, target_rate: u32) {
    let source_rate = buffer.sample_rate();
    if target_rate == source_rate {
        return;
    }
    if buffer.is_empty() || source_rate == 0 {
        *buffer = SampleBuffer::empty(buffer.channel_layout(), target_rate);
        return;
    }

    let out_frames = resampled_len(buffer.frame_count(), source_rate, target_rate);
    *buffer = resample_window(buffer, 0.0, out_frames, target_rate);
}

/// Resample `out_frames` frames of `source` starting at the fractional source
/// frame `start`, without touching `source`.
///
/// Reads before the first or past the last frame clamp to the nearest valid
/// frame; nothing wraps around.
pub fn resample_window(
    source: &SampleBuffer,
    start: f64,
    out_frames: usize,
    target_rate: u32,
) -> SampleBuffer {
    let layout = source.channel_layout();
    let channels = source.channels();
    let mut out = SampleBuffer::new(out_frames, layout, target_rate);
    let n = source.frame_count();
    if n == 0 || target_rate == 0 {
        return out;
    }

    let step = source.sample_rate() as f64 / target_rate as f64;
    let last = n - 1;
    for i in 0..out_frames {
        let idx = (start + i as f64 * step).max(0.0);
        let base = idx.floor() as usize;
        let dst = &mut out[i];
        if base >= last {
            dst.copy_from_slice(&source[last]);
            continue;
        }
        let rho = (idx - base as f64) as f32;
        let (a, b) = (&source[base], &source[base + 1]);
        for ch in 0..channels {
            dst[ch] = a[ch] * (1.0 - rho) + b[ch] * rho;
        }
    }
    out
}

/// Resampler that keeps its fractional read position between calls so a
/// stream converted in chunks stays phase-continuous.
///
/// The caller feeds windows of source audio; [`StreamResampler::next_source_frame`]
/// tells it where the next window has to begin.
#[derive(Debug, Clone)]
pub struct StreamResampler {
    source_rate: u32,
    target_rate: u32,
    position: f64,
}

impl StreamResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        Self {
            source_rate,
            target_rate,
            position: 0.0,
        }
    }

    #[inline]
    fn step(&self) -> f64 {
        self.source_rate as f64 / self.target_rate.max(1) as f64
    }

    /// Absolute fractional source position of the next output frame.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// First source frame the next call will read.
    pub fn next_source_frame(&self) -> usize {
        self.position.floor() as usize
    }

    /// Source frames (from [`next_source_frame`](Self::next_source_frame))
    /// needed to produce `out_frames` frames, including the interpolation partner.
    pub fn frames_needed(&self, out_frames: usize) -> usize {
        if out_frames == 0 {
            return 0;
        }
        let frac = self.position - self.position.floor();
        (frac + (out_frames - 1) as f64 * self.step()).floor() as usize + 2
    }

    /// Produce `out_frames` frames from `window`, whose first frame is source
    /// frame `window_start`, and advance the read position.
    pub fn process(
        &mut self,
        window: &SampleBuffer,
        window_start: usize,
        out_frames: usize,
    ) -> SampleBuffer {
        let local = self.position - window_start as f64;
        let out = resample_window(window, local, out_frames, self.target_rate);
        self.position += out_frames as f64 * self.step();
        out
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
    }
}
