//! STFT analysis/synthesis and the bin-masking filters built on it.
//!
//! Frames of `fft_size` samples start every `hop_size` samples, beginning at
//! `-(fft_size - hop_size)` so that every sample is covered by the same number
//! of frames. Synthesis multiplies by the window again and by
//! `hop / Σ w²`, which makes an unmodified spectrum reconstruct the input.

use crate::config::SpectralConfig;
use cantor_core::fourier::bin_frequency_to_index;
use cantor_core::{Complex32, Error, Fourier, Result, SampleBuffer, Window};
use rayon::prelude::*;
use std::ops::Range;

/// Overlap-add output covering input samples `offset..offset + samples.len()`.
#[derive(Debug)]
pub(crate) struct Partial {
    pub offset: usize,
    pub samples: Vec<f32>,
}

/// Transform plans, window and synthesis scale for one configuration.
#[derive(Debug, Clone)]
pub(crate) struct Stft {
    fourier: Fourier,
    window: Window,
    hop: usize,
    scale: f32,
}

impl Stft {
    pub fn new(config: &SpectralConfig) -> Result<Self> {
        config.validate()?;
        let size = config.rounded_fft_size()?;
        let fourier = Fourier::new(size)?;
        let window = config.build_window(size);
        let scale = window.overlap_add_gain(config.hop_size) / size as f32;
        Ok(Self {
            fourier,
            window,
            hop: config.hop_size,
            scale,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.fourier.size()
    }

    #[inline]
    pub fn hop(&self) -> usize {
        self.hop
    }

    #[inline]
    pub fn nyquist_bin(&self) -> usize {
        self.fourier.nyquist_bin()
    }

    /// Frames needed to cover `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (len + self.size() - self.hop).div_ceil(self.hop)
    }

    #[inline]
    fn frame_start(&self, frame: usize) -> isize {
        (frame * self.hop) as isize - (self.size() - self.hop) as isize
    }

    /// Run `op` on the spectrum of every frame in `frames` and overlap-add the
    /// results.
    pub fn process(
        &self,
        input: &[f32],
        frames: Range<usize>,
        mut op: impl FnMut(&mut [Complex32]),
    ) -> Partial {
        let len = input.len() as isize;
        let size = self.size();
        if frames.is_empty() || len == 0 {
            return Partial {
                offset: 0,
                samples: Vec::new(),
            };
        }

        let first = self.frame_start(frames.start).max(0);
        let last = (self.frame_start(frames.end - 1) + size as isize).min(len);
        let mut out = vec![0.0f32; (last - first).max(0) as usize];
        let mut spectrum = vec![Complex32::new(0.0, 0.0); size];

        for frame in frames {
            let start = self.frame_start(frame);
            for (k, bin) in spectrum.iter_mut().enumerate() {
                let pos = start + k as isize;
                let sample = if pos >= 0 && pos < len {
                    input[pos as usize] * self.window[k]
                } else {
                    0.0
                };
                *bin = Complex32::new(sample, 0.0);
            }

            self.fourier.forward(&mut spectrum);
            op(&mut spectrum);
            self.fourier.ifft(&mut spectrum, false);

            for (k, bin) in spectrum.iter().enumerate() {
                let pos = start + k as isize;
                if pos >= first && pos < last {
                    out[(pos - first) as usize] += bin.re * self.window[k] * self.scale;
                }
            }
        }

        Partial {
            offset: first as usize,
            samples: out,
        }
    }

    /// Analyse, modify and resynthesise one `size`-sample frame that starts
    /// exactly at `frame[0]`.
    pub fn process_aligned(
        &self,
        frame: &[f32],
        op: impl FnOnce(&mut [Complex32]),
    ) -> Vec<f32> {
        let window = self.window.as_slice();
        let mut spectrum: Vec<Complex32> = frame
            .iter()
            .zip(window)
            .map(|(&s, &w)| Complex32::new(s * w, 0.0))
            .collect();
        spectrum.resize(self.size(), Complex32::new(0.0, 0.0));

        self.fourier.forward(&mut spectrum);
        op(&mut spectrum);
        self.fourier.ifft(&mut spectrum, false);

        spectrum
            .iter()
            .zip(window)
            .map(|(bin, &w)| bin.re * w * self.scale)
            .collect()
    }

    /// Split all frames covering `len` samples into `segments` contiguous ranges.
    pub fn segments(&self, len: usize, segments: usize) -> Vec<Range<usize>> {
        let total = self.frame_count(len);
        let segments = segments.clamp(1, total.max(1));
        let per = total.div_ceil(segments);
        (0..segments)
            .map(|i| (i * per).min(total)..((i + 1) * per).min(total))
            .filter(|r| !r.is_empty())
            .collect()
    }
}

/// Add `partial` into `out`.
pub(crate) fn accumulate(out: &mut [f32], partial: &Partial) {
    for (dst, src) in out[partial.offset..].iter_mut().zip(&partial.samples) {
        *dst += src;
    }
}

/// Threads per channel when the caller passes 0.
pub(crate) fn default_threads_per_channel(channels: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores / channels.max(1)).max(1)
}

/// A frequency band with its own gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualizerBand {
    pub f1: f64,
    pub f2: f64,
    /// Linear gain applied to every bin between `f1` and `f2`.
    pub amplitude: f32,
}

impl EqualizerBand {
    pub fn new(f1: f64, f2: f64, amplitude: f32) -> Self {
        Self { f1, f2, amplitude }
    }
}

/// Bin mask applied to each STFT frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralFilter {
    /// Remove everything from `cutoff` up.
    LowPass { cutoff: f64 },
    /// Remove everything up to and including `cutoff`.
    HighPass { cutoff: f64 },
    /// Keep only `low..=high`.
    BandPass { low: f64, high: f64 },
    /// Remove `low..=high`.
    BandCut { low: f64, high: f64 },
    Equalizer(Vec<EqualizerBand>),
}

impl SpectralFilter {
    fn validate(&self) -> Result<()> {
        let check = |f: f64| {
            if f.is_finite() && f >= 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidArgument(format!("invalid frequency {f}")))
            }
        };
        match self {
            SpectralFilter::LowPass { cutoff } | SpectralFilter::HighPass { cutoff } => {
                check(*cutoff)
            }
            SpectralFilter::BandPass { low, high } | SpectralFilter::BandCut { low, high } => {
                check(*low)?;
                check(*high)
            }
            SpectralFilter::Equalizer(bands) => bands.iter().try_for_each(|band| {
                check(band.f1)?;
                check(band.f2)?;
                if band.amplitude < 0.0 {
                    return Err(Error::InvalidArgument(format!(
                        "band gain {} is negative",
                        band.amplitude
                    )));
                }
                Ok(())
            }),
        }
    }

    /// Gain for bins `0..=nyquist`.
    fn gains(&self, sample_rate: u32, fft_size: usize) -> Vec<f32> {
        let nyquist = fft_size / 2;
        let bin = |f: f64| bin_frequency_to_index(sample_rate, fft_size, f);
        // band edges past nyquist cover the top bin
        let ordered = |a: f64, b: f64| (bin(a.min(b)).min(nyquist), bin(a.max(b)).min(nyquist));
        let mut gains = vec![1.0f32; nyquist + 1];

        match self {
            SpectralFilter::LowPass { cutoff } => {
                let from = bin(*cutoff).min(nyquist + 1);
                gains[from..].fill(0.0);
            }
            SpectralFilter::HighPass { cutoff } => {
                let to = bin(*cutoff).min(nyquist);
                gains[..=to].fill(0.0);
            }
            SpectralFilter::BandPass { low, high } => {
                let (lo, hi) = ordered(*low, *high);
                for (k, g) in gains.iter_mut().enumerate() {
                    if k < lo || k > hi {
                        *g = 0.0;
                    }
                }
            }
            SpectralFilter::BandCut { low, high } => {
                let (lo, hi) = ordered(*low, *high);
                for g in gains.iter_mut().take(hi + 1).skip(lo) {
                    *g = 0.0;
                }
            }
            SpectralFilter::Equalizer(bands) => {
                for band in bands {
                    let (lo, hi) = ordered(band.f1, band.f2);
                    for g in gains.iter_mut().take(hi + 1).skip(lo) {
                        *g *= band.amplitude;
                    }
                }
            }
        }
        gains
    }
}

/// Scale bins `0..=nyquist` and their conjugate mirrors `fft_size - k`.
fn apply_gains(spectrum: &mut [Complex32], gains: &[f32]) {
    let size = spectrum.len();
    let nyquist = size / 2;
    for (k, &g) in gains.iter().enumerate() {
        if g == 1.0 {
            continue;
        }
        spectrum[k] *= g;
        if k > 0 && k < nyquist {
            spectrum[size - k] *= g;
        }
    }
}

/// STFT filter bank for one [`SpectralConfig`].
#[derive(Debug, Clone)]
pub struct SpectralProcessor {
    config: SpectralConfig,
    stft: Stft,
}

impl SpectralProcessor {
    pub fn new(config: SpectralConfig) -> Result<Self> {
        let stft = Stft::new(&config)?;
        Ok(Self { config, stft })
    }

    pub fn config(&self) -> &SpectralConfig {
        &self.config
    }

    pub fn fft_size(&self) -> usize {
        self.stft.size()
    }

    /// Filter every channel on the calling thread.
    pub fn apply(&self, buffer: &mut SampleBuffer, filter: &SpectralFilter) -> Result<()> {
        filter.validate()?;
        let gains = filter.gains(buffer.sample_rate(), self.stft.size());
        for ch in 0..buffer.channels() {
            let input = buffer.channel(ch);
            let frames = 0..self.stft.frame_count(input.len());
            let partial = self.stft.process(&input, frames, |s| apply_gains(s, &gains));
            let mut out = vec![0.0; input.len()];
            accumulate(&mut out, &partial);
            buffer.set_channel(ch, &out);
        }
        Ok(())
    }

    /// Filter with one job per channel, each split into `threads_per_channel`
    /// contiguous frame ranges (0 picks a count from the available cores).
    ///
    /// All jobs finish before this returns. Output matches [`apply`](Self::apply)
    /// up to the order partial sums are added in.
    pub fn apply_mt(
        &self,
        buffer: &mut SampleBuffer,
        filter: &SpectralFilter,
        threads_per_channel: usize,
    ) -> Result<()> {
        filter.validate()?;
        let channels = buffer.channels();
        let threads_per_channel = match threads_per_channel {
            0 => default_threads_per_channel(channels),
            n => n,
        };
        let gains = filter.gains(buffer.sample_rate(), self.stft.size());
        let inputs: Vec<Vec<f32>> = (0..channels).map(|ch| buffer.channel(ch)).collect();
        let len = buffer.frame_count();

        let jobs: Vec<(usize, Range<usize>)> = (0..channels)
            .flat_map(|ch| {
                self.stft
                    .segments(len, threads_per_channel)
                    .into_iter()
                    .map(move |r| (ch, r))
            })
            .collect();
        tracing::debug!(
            "Spectral filter: {} jobs over {} channels",
            jobs.len(),
            channels
        );

        let partials: Vec<(usize, Partial)> = jobs
            .into_par_iter()
            .map(|(ch, frames)| {
                let partial = self
                    .stft
                    .process(&inputs[ch], frames, |s| apply_gains(s, &gains));
                (ch, partial)
            })
            .collect();

        let mut outputs = vec![vec![0.0f32; len]; channels];
        for (ch, partial) in &partials {
            accumulate(&mut outputs[*ch], partial);
        }
        for (ch, out) in outputs.iter().enumerate() {
            buffer.set_channel(ch, out);
        }
        Ok(())
    }
}

pub fn low_pass_filter(buffer: &mut SampleBuffer, config: SpectralConfig, cutoff: f64) -> Result<()> {
    SpectralProcessor::new(config)?.apply(buffer, &SpectralFilter::LowPass { cutoff })
}

pub fn high_pass_filter(
    buffer: &mut SampleBuffer,
    config: SpectralConfig,
    cutoff: f64,
) -> Result<()> {
    SpectralProcessor::new(config)?.apply(buffer, &SpectralFilter::HighPass { cutoff })
}

pub fn band_pass_filter(
    buffer: &mut SampleBuffer,
    config: SpectralConfig,
    low: f64,
    high: f64,
) -> Result<()> {
    SpectralProcessor::new(config)?.apply(buffer, &SpectralFilter::BandPass { low, high })
}

pub fn band_cut_filter(
    buffer: &mut SampleBuffer,
    config: SpectralConfig,
    low: f64,
    high: f64,
) -> Result<()> {
    SpectralProcessor::new(config)?.apply(buffer, &SpectralFilter::BandCut { low, high })
}

pub fn equalizer(
    buffer: &mut SampleBuffer,
    config: SpectralConfig,
    bands: &[EqualizerBand],
) -> Result<()> {
    SpectralProcessor::new(config)?.apply(buffer, &SpectralFilter::Equalizer(bands.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantor_core::ChannelLayout;
    use approx::assert_relative_eq;

    const SR: u32 = 48000;

    fn sine(freq: f64, frames: usize) -> SampleBuffer {
        let samples = (0..frames)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / SR as f64).sin() as f32)
            .collect();
        SampleBuffer::from_interleaved(samples, ChannelLayout::MONO, SR).unwrap()
    }

    fn interior_rms(buf: &SampleBuffer, margin: usize) -> f32 {
        let ch = buf.channel(0);
        let slice = &ch[margin..ch.len() - margin];
        (slice.iter().map(|s| s * s).sum::<f32>() / slice.len() as f32).sqrt()
    }

    #[test]
    fn test_frame_coverage() {
        let stft = Stft::new(&SpectralConfig::new(256, 1024)).unwrap();
        assert_eq!(stft.frame_count(0), 0);
        assert_eq!(stft.frame_count(1), 4);
        assert_eq!(stft.frame_count(256), 4);
        assert_eq!(stft.frame_count(257), 5);
    }

    #[test]
    fn test_unmodified_spectrum_reconstructs() {
        let stft = Stft::new(&SpectralConfig::new(256, 1024)).unwrap();
        let input: Vec<f32> = (0..3000).map(|i| ((i * 7919) % 200) as f32 / 100.0 - 1.0).collect();
        let partial = stft.process(&input, 0..stft.frame_count(input.len()), |_| {});
        assert_eq!(partial.offset, 0);
        for (a, b) in input.iter().zip(&partial.samples) {
            assert_relative_eq!(*a, *b, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_low_pass_direction() {
        let config = SpectralConfig::default();
        let mut low = sine(440.0, 48000);
        let original = interior_rms(&low, 4096);
        low_pass_filter(&mut low, config, 2000.0).unwrap();
        assert!(interior_rms(&low, 4096) >= 0.95 * original);

        let mut high = sine(8000.0, 48000);
        low_pass_filter(&mut high, config, 2000.0).unwrap();
        assert!(interior_rms(&high, 4096) < 0.05 * original);
    }

    #[test]
    fn test_high_pass_and_band_cut() {
        let config = SpectralConfig::default();
        let mut buf = sine(300.0, 24000);
        let original = interior_rms(&buf, 4096);
        high_pass_filter(&mut buf, config, 3000.0).unwrap();
        assert!(interior_rms(&buf, 4096) < 0.05 * original);

        let mut kept = sine(300.0, 24000);
        band_cut_filter(&mut kept, config, 5000.0, 9000.0).unwrap();
        assert!(interior_rms(&kept, 4096) >= 0.95 * original);
    }

    #[test]
    fn test_band_pass_keeps_band() {
        let config = SpectralConfig::default();
        let mut inside = sine(1000.0, 24000);
        let original = interior_rms(&inside, 4096);
        band_pass_filter(&mut inside, config, 500.0, 2000.0).unwrap();
        assert!(interior_rms(&inside, 4096) >= 0.95 * original);

        let mut outside = sine(6000.0, 24000);
        band_pass_filter(&mut outside, config, 500.0, 2000.0).unwrap();
        assert!(interior_rms(&outside, 4096) < 0.05 * original);
    }

    #[test]
    fn test_equalizer_scales_band() {
        let config = SpectralConfig::default();
        let mut buf = sine(1000.0, 24000);
        let original = interior_rms(&buf, 4096);
        equalizer(&mut buf, config, &[EqualizerBand::new(2000.0, 200.0, 0.5)]).unwrap();
        assert_relative_eq!(interior_rms(&buf, 4096), 0.5 * original, epsilon = 0.02);
    }

    #[test]
    fn test_mt_matches_single_thread() {
        let processor = SpectralProcessor::new(SpectralConfig::new(512, 2048)).unwrap();
        let left: Vec<f32> = (0..20000).map(|i| (i as f32 * 0.01).sin()).collect();
        let right: Vec<f32> = (0..20000).map(|i| (i as f32 * 0.37).cos()).collect();
        let source = SampleBuffer::from_channels(&[left, right], SR).unwrap();
        let filter = SpectralFilter::LowPass { cutoff: 3000.0 };

        let mut single = source.clone();
        processor.apply(&mut single, &filter).unwrap();

        let mut whole = source.clone();
        processor.apply_mt(&mut whole, &filter, 1).unwrap();
        assert_eq!(whole, single);

        let mut split = source;
        processor.apply_mt(&mut split, &filter, 3).unwrap();
        for (a, b) in split.as_slice().iter().zip(single.as_slice()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_invalid_arguments() {
        let mut buf = sine(440.0, 100);
        assert!(low_pass_filter(&mut buf, SpectralConfig::new(0, 1024), 100.0).is_err());
        assert!(low_pass_filter(&mut buf, SpectralConfig::default(), -1.0).is_err());
        let bad = [EqualizerBand::new(100.0, 200.0, -1.0)];
        assert!(equalizer(&mut buf, SpectralConfig::default(), &bad).is_err());
    }

    #[test]
    fn test_band_edges_above_nyquist() {
        let gains = SpectralFilter::BandCut { low: 100.0, high: 1e30 }.gains(SR, 1024);
        assert_eq!(gains.len(), 513);
        assert_eq!(gains[1], 1.0);
        assert!(gains[2..].iter().all(|&g| g == 0.0));

        let bands = vec![EqualizerBand::new(1e30, 100.0, 0.5)];
        let gains = SpectralFilter::Equalizer(bands).gains(SR, 1024);
        assert_eq!(gains[512], 0.5);

        let mut buf = sine(6000.0, 16384);
        band_cut_filter(&mut buf, SpectralConfig::default(), 3000.0, 1e30).unwrap();
        assert!(interior_rms(&buf, 4096) < 0.05);
    }
}
