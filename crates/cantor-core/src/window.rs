//! Window functions for STFT analysis and synthesis.
//!
//! All windows are generated in their periodic form (denominator `N`), which
//! is the form that overlap-adds cleanly at hop sizes dividing `N`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowKind {
    Rectangle,
    Triangle,
    #[default]
    Hann,
    Hamming,
    Blackman,
    BlackmanHarris,
    BlackmanNuttall,
    Nuttall,
    FlatTop,
    Welch,
    Parzen,
    Gaussian { sigma: f64 },
    Tukey { alpha: f64 },
    HannPoisson { alpha: f64 },
}

impl WindowKind {
    /// Sample `n` of a window of length `size`.
    pub fn value(&self, n: usize, size: usize) -> f64 {
        let len = size as f64;
        let x = n as f64;
        let half = len / 2.0;
        let cos_term = |k: f64| (2.0 * PI * k * x / len).cos();
        match *self {
            WindowKind::Rectangle => 1.0,
            WindowKind::Triangle => 1.0 - ((x - half) / half).abs(),
            WindowKind::Hann => 0.5 * (1.0 - cos_term(1.0)),
            WindowKind::Hamming => 0.54 - 0.46 * cos_term(1.0),
            WindowKind::Blackman => 0.42 - 0.5 * cos_term(1.0) + 0.08 * cos_term(2.0),
            WindowKind::BlackmanHarris => {
                0.35875 - 0.48829 * cos_term(1.0) + 0.14128 * cos_term(2.0)
                    - 0.01168 * cos_term(3.0)
            }
            WindowKind::BlackmanNuttall => {
                0.3635819 - 0.4891775 * cos_term(1.0) + 0.1365995 * cos_term(2.0)
                    - 0.0106411 * cos_term(3.0)
            }
            WindowKind::Nuttall => {
                0.355768 - 0.487396 * cos_term(1.0) + 0.144232 * cos_term(2.0)
                    - 0.012604 * cos_term(3.0)
            }
            WindowKind::FlatTop => {
                0.21557895 - 0.41663158 * cos_term(1.0) + 0.277263158 * cos_term(2.0)
                    - 0.083578947 * cos_term(3.0)
                    + 0.006947368 * cos_term(4.0)
            }
            WindowKind::Welch => 1.0 - ((x - half) / half).powi(2),
            WindowKind::Parzen => {
                let m = (x - half).abs() / half;
                if m <= 0.5 {
                    1.0 - 6.0 * m * m * (1.0 - m)
                } else {
                    2.0 * (1.0 - m).powi(3)
                }
            }
            WindowKind::Gaussian { sigma } => {
                (-0.5 * ((x - half) / (sigma * half)).powi(2)).exp()
            }
            WindowKind::Tukey { alpha } => {
                if alpha <= 0.0 {
                    return 1.0;
                }
                let t = x / len;
                let edge = alpha / 2.0;
                if t < edge {
                    0.5 * (1.0 - (PI * t / edge).cos())
                } else if t > 1.0 - edge {
                    0.5 * (1.0 - (PI * (1.0 - t) / edge).cos())
                } else {
                    1.0
                }
            }
            WindowKind::HannPoisson { alpha } => {
                0.5 * (1.0 - cos_term(1.0)) * (-alpha * (len - 2.0 * x).abs() / len).exp()
            }
        }
    }
}

/// Precomputed window samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    kind: WindowKind,
    data: Vec<f32>,
}

impl Window {
    pub fn new(kind: WindowKind, size: usize) -> Self {
        let data = (0..size).map(|n| kind.value(n, size) as f32).collect();
        Self { kind, data }
    }

    pub fn hann(size: usize) -> Self {
        Self::new(WindowKind::Hann, size)
    }

    #[inline]
    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Gain that makes windowed-analysis/windowed-synthesis overlap-add at
    /// `hop` reconstruct unity: `hop / Σ w²`.
    pub fn overlap_add_gain(&self, hop: usize) -> f32 {
        let energy: f64 = self.data.iter().map(|&w| (w as f64) * (w as f64)).sum();
        if energy <= 0.0 {
            return 0.0;
        }
        (hop as f64 / energy) as f32
    }
}

impl Index<usize> for Window {
    type Output = f32;

    #[inline]
    fn index(&self, index: usize) -> &f32 {
        &self.data[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hann_shape() {
        let w = Window::hann(8);
        assert_relative_eq!(w[0], 0.0);
        assert_relative_eq!(w[4], 1.0);
        assert_relative_eq!(w[2], 0.5, epsilon = 1e-6);
        assert_relative_eq!(w[2], w[6], epsilon = 1e-6);
    }

    #[test]
    fn test_peaks_at_centre() {
        for kind in [
            WindowKind::Triangle,
            WindowKind::Hamming,
            WindowKind::Blackman,
            WindowKind::BlackmanHarris,
            WindowKind::BlackmanNuttall,
            WindowKind::Nuttall,
            WindowKind::Welch,
            WindowKind::Parzen,
            WindowKind::Gaussian { sigma: 0.4 },
            WindowKind::HannPoisson { alpha: 2.0 },
        ] {
            let w = Window::new(kind, 64);
            let centre = w[32];
            assert!(w.as_slice().iter().all(|&v| v <= centre + 1e-6), "{kind:?}");
            assert_relative_eq!(centre, 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_tukey_limits() {
        let flat = Window::new(WindowKind::Tukey { alpha: 0.0 }, 16);
        assert!(flat.as_slice().iter().all(|&v| v == 1.0));
        let hann_like = Window::new(WindowKind::Tukey { alpha: 1.0 }, 16);
        let hann = Window::hann(16);
        for i in 0..16 {
            assert_relative_eq!(hann_like[i], hann[i], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_hann_quarter_hop_gain() {
        // Σ hann² = 3N/8, so gain at N/4 hop is 2/3
        let w = Window::hann(1024);
        assert_relative_eq!(w.overlap_add_gain(256), 2.0 / 3.0, epsilon = 1e-5);
    }
}
