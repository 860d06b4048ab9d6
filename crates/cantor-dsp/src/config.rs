//! STFT configuration.

use cantor_core::fourier::calculate_fft_size;
use cantor_core::{Error, Result, Window, WindowKind};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOP_SIZE: usize = 1024;
pub const DEFAULT_FFT_SIZE: usize = 4096;

/// Hop, transform length and window shared by every STFT pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    pub hop_size: usize,
    /// Requested transform length; rounded up to a power of two when used.
    pub fft_size: usize,
    pub window: WindowKind,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            hop_size: DEFAULT_HOP_SIZE,
            fft_size: DEFAULT_FFT_SIZE,
            window: WindowKind::Hann,
        }
    }
}

impl SpectralConfig {
    pub fn new(hop_size: usize, fft_size: usize) -> Self {
        Self {
            hop_size,
            fft_size,
            window: WindowKind::Hann,
        }
    }

    pub fn window(mut self, window: WindowKind) -> Self {
        self.window = window;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.hop_size == 0 {
            return Err(Error::InvalidArgument("hop size must be positive".into()));
        }
        let fft_size = calculate_fft_size(self.fft_size)?;
        if self.hop_size > fft_size {
            return Err(Error::InvalidArgument(format!(
                "hop size {} exceeds FFT size {}",
                self.hop_size, fft_size
            )));
        }
        Ok(())
    }

    /// Transform length actually used.
    pub fn rounded_fft_size(&self) -> Result<usize> {
        calculate_fft_size(self.fft_size)
    }

    pub(crate) fn build_window(&self, size: usize) -> Window {
        Window::new(self.window, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SpectralConfig::default();
        assert_eq!(config.hop_size, 1024);
        assert_eq!(config.rounded_fft_size().unwrap(), 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rounding_and_validation() {
        assert_eq!(SpectralConfig::new(256, 1000).rounded_fft_size().unwrap(), 1024);
        assert!(SpectralConfig::new(0, 1024).validate().is_err());
        assert!(SpectralConfig::new(2048, 1024).validate().is_err());
        assert!(SpectralConfig::new(128, 0).validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SpectralConfig =
            serde_json::from_str(r#"{ "hop_size": 512, "window": { "kind": "blackman" } }"#)
                .unwrap();
        assert_eq!(config.hop_size, 512);
        assert_eq!(config.fft_size, DEFAULT_FFT_SIZE);
        assert_eq!(config.window, WindowKind::Blackman);
    }
}
