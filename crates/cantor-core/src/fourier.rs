//! Fourier transform collaborator backed by rustfft.

use crate::{Error, Result};
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub use rustfft::num_complex::Complex32;

/// Round `size` up to the next supported transform length (a power of two).
pub fn calculate_fft_size(size: usize) -> Result<usize> {
    if size == 0 {
        return Err(Error::InvalidArgument("FFT size must be positive".into()));
    }
    size.checked_next_power_of_two()
        .ok_or_else(|| Error::InvalidArgument(format!("FFT size {size} too large")))
}

/// Bin nearest to `frequency` Hz: `round(frequency * fft_size / sample_rate)`.
pub fn bin_frequency_to_index(sample_rate: u32, fft_size: usize, frequency: f64) -> usize {
    if sample_rate == 0 || frequency <= 0.0 {
        return 0;
    }
    (frequency * fft_size as f64 / sample_rate as f64).round() as usize
}

/// Centre frequency of bin `index` in Hz.
pub fn index_to_bin_frequency(sample_rate: u32, fft_size: usize, index: usize) -> f64 {
    index as f64 * sample_rate as f64 / fft_size as f64
}

/// Forward and inverse plans for one transform length.
///
/// Plans are immutable and shared, so one `Fourier` can serve many threads.
#[derive(Clone)]
pub struct Fourier {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Fourier {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidArgument("FFT size must be positive".into()));
        }
        let mut planner = FftPlanner::new();
        Ok(Self {
            size,
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Non-redundant bin count of a real signal: `size / 2`.
    #[inline]
    pub fn nyquist_bin(&self) -> usize {
        self.size / 2
    }

    /// Spectrum of a real frame, zero-padded or truncated to the transform length.
    pub fn fft(&self, frame: &[f32]) -> Vec<Complex32> {
        let mut spectrum: Vec<Complex32> = frame
            .iter()
            .take(self.size)
            .map(|&s| Complex32::new(s, 0.0))
            .collect();
        spectrum.resize(self.size, Complex32::new(0.0, 0.0));
        self.forward.process(&mut spectrum);
        spectrum
    }

    /// In-place forward transform of `buffer` (length must equal [`size`](Self::size)).
    pub fn forward(&self, buffer: &mut [Complex32]) {
        self.forward.process(buffer);
    }

    /// In-place inverse transform; `normalize` divides by the transform length.
    pub fn ifft(&self, spectrum: &mut [Complex32], normalize: bool) {
        self.inverse.process(spectrum);
        if normalize {
            let scale = 1.0 / self.size as f32;
            spectrum.iter_mut().for_each(|c| *c *= scale);
        }
    }
}

impl std::fmt::Debug for Fourier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fourier").field("size", &self.size).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_calculate_fft_size() {
        assert_eq!(calculate_fft_size(1000).unwrap(), 1024);
        assert_eq!(calculate_fft_size(4096).unwrap(), 4096);
        assert_eq!(calculate_fft_size(1).unwrap(), 1);
        assert!(calculate_fft_size(0).is_err());
    }

    #[test]
    fn test_bin_mapping() {
        assert_eq!(bin_frequency_to_index(48000, 4096, 1000.0), 85);
        assert_relative_eq!(index_to_bin_frequency(48000, 4096, 2048), 24000.0);
        assert_eq!(bin_frequency_to_index(48000, 4096, -5.0), 0);
    }

    #[test]
    fn test_fft_ifft_roundtrip() {
        let fourier = Fourier::new(64).unwrap();
        let frame: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();
        let mut spectrum = fourier.fft(&frame);
        fourier.ifft(&mut spectrum, true);
        for (a, b) in frame.iter().zip(&spectrum) {
            assert_relative_eq!(*a, b.re, epsilon = 1e-5);
            assert_relative_eq!(b.im, 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_pure_tone_lands_in_bin() {
        let fourier = Fourier::new(256).unwrap();
        let frame: Vec<f32> = (0..256)
            .map(|i| (2.0 * std::f32::consts::PI * 8.0 * i as f32 / 256.0).cos())
            .collect();
        let spectrum = fourier.fft(&frame);
        assert_relative_eq!(spectrum[8].norm(), 128.0, epsilon = 1e-2);
        assert_relative_eq!(spectrum[256 - 8].norm(), 128.0, epsilon = 1e-2);
        assert!(spectrum[20].norm() < 1e-2);
    }
}
