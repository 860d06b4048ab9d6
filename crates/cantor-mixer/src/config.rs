//! Mixer engine configuration.

use cantor_core::{ChannelLayout, Error, FormatInfo, Result};
use serde::{Deserialize, Serialize};

/// Largest render period accepted by [`EngineConfig::validate`].
pub const MAX_PERIOD_FRAMES: usize = 65536;

/// Configuration for the mixer and its render/capture threads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Format the mix is produced in and encoded to.
    pub render_format: FormatInfo,
    /// Format captured bytes arrive in.
    pub capture_format: FormatInfo,
    /// Frames requested per render callback (default: 480, 10ms @ 48kHz)
    pub period_frames: usize,
    /// Run render/capture threads at maximum priority (default: true)
    pub thread_priority: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            render_format: FormatInfo::pcm(ChannelLayout::STEREO, 48000, 16),
            capture_format: FormatInfo::pcm(ChannelLayout::STEREO, 48000, 16),
            period_frames: 480,
            thread_priority: true,
        }
    }
}

impl EngineConfig {
    /// Set the render format, keeping everything else.
    pub fn with_render_format(mut self, format: FormatInfo) -> Self {
        self.render_format = format;
        self
    }

    pub fn with_capture_format(mut self, format: FormatInfo) -> Self {
        self.capture_format = format;
        self
    }

    pub fn with_period_frames(mut self, frames: usize) -> Self {
        self.period_frames = frames;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.period_frames == 0 || self.period_frames > MAX_PERIOD_FRAMES {
            return Err(Error::InvalidConfig(format!(
                "period_frames {} out of range (1-{})",
                self.period_frames, MAX_PERIOD_FRAMES
            )));
        }
        for (label, format) in [("render", &self.render_format), ("capture", &self.capture_format)] {
            if format.sample_rate == 0 {
                return Err(Error::InvalidConfig(format!("{} sample rate is zero", label)));
            }
            if format.channels() == 0 {
                return Err(Error::InvalidConfig(format!("{} format has no channels", label)));
            }
            if format.bits_per_sample == 0 || format.bits_per_sample % 8 != 0 {
                return Err(Error::InvalidConfig(format!(
                    "{} bits_per_sample {} is not a whole number of bytes",
                    label, format.bits_per_sample
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantor_core::format_tag;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.period_frames, 480);
        assert_eq!(config.render_format.format_tag, format_tag::PCM);
        assert_eq!(config.render_format.sample_rate, 48000);
        assert!(config.thread_priority);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_period() {
        let config = EngineConfig::default().with_period_frames(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = EngineConfig::default().with_period_frames(MAX_PERIOD_FRAMES + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_format() {
        let config = EngineConfig::default()
            .with_render_format(FormatInfo::pcm(ChannelLayout::STEREO, 0, 16));
        assert!(config.validate().is_err());

        let config = EngineConfig::default()
            .with_capture_format(FormatInfo::pcm(ChannelLayout::MONO, 8000, 12));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "period_frames": 256, "thread_priority": false }"#).unwrap();
        assert_eq!(config.period_frames, 256);
        assert!(!config.thread_priority);
        assert_eq!(config.render_format, EngineConfig::default().render_format);
    }
}
