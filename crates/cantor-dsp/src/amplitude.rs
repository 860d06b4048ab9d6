//! Gain, fade and panning helpers.

use cantor_core::{Error, Result, SampleBuffer};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Scale so the absolute peak equals `peak`. Silent buffers are left alone.
pub fn normalize(buffer: &mut SampleBuffer, peak: f32) -> Result<()> {
    if !peak.is_finite() || peak < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "normalize peak must be non-negative, got {}",
            peak
        )));
    }
    let current = buffer.abs_max();
    if current > 0.0 {
        *buffer *= peak / current;
    }
    Ok(())
}

/// Scale so the RMS level equals `rms`. Silent buffers are left alone.
pub fn rms_normalize(buffer: &mut SampleBuffer, rms: f32) -> Result<()> {
    if !rms.is_finite() || rms < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "target rms must be non-negative, got {}",
            rms
        )));
    }
    let current = buffer.rms();
    if current > 0.0 {
        *buffer *= rms / current;
    }
    Ok(())
}

/// Ramp gain from 0 to 1 over the first `duration` seconds.
pub fn linear_fade_in(buffer: &mut SampleBuffer, duration: f64) {
    let len = fade_len(buffer, duration);
    for (i, frame) in buffer.frames_mut().take(len).enumerate() {
        let gain = i as f32 / len as f32;
        frame.iter_mut().for_each(|s| *s *= gain);
    }
}

/// Ramp gain from 1 to 0 over the last `duration` seconds.
pub fn linear_fade_out(buffer: &mut SampleBuffer, duration: f64) {
    let len = fade_len(buffer, duration);
    let start = buffer.frame_count() - len;
    for (i, frame) in buffer.frames_mut().skip(start).enumerate() {
        let gain = 1.0 - (i + 1) as f32 / len as f32;
        frame.iter_mut().for_each(|s| *s *= gain);
    }
}

fn fade_len(buffer: &SampleBuffer, duration: f64) -> usize {
    let frames = (duration.max(0.0) * buffer.sample_rate() as f64).round() as usize;
    frames.min(buffer.frame_count())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanningLaw {
    Linear,
    SquareLaw,
    #[default]
    SineLaw,
}

impl PanningLaw {
    /// `(left, right)` gains for `position` in [-1, 1].
    pub fn gains(&self, position: f32) -> (f32, f32) {
        let p = (position.clamp(-1.0, 1.0) + 1.0) * 0.5;
        match self {
            PanningLaw::Linear => (1.0 - p, p),
            PanningLaw::SquareLaw => ((1.0 - p).sqrt(), p.sqrt()),
            PanningLaw::SineLaw => ((p * FRAC_PI_2).cos(), (p * FRAC_PI_2).sin()),
        }
    }
}

/// Pan a stereo buffer; -1 is hard left, 1 hard right.
pub fn pan(buffer: &mut SampleBuffer, law: PanningLaw, position: f32) -> Result<()> {
    if buffer.channels() != 2 {
        return Err(Error::InvalidArgument(format!(
            "panning needs a stereo buffer, got {} channels",
            buffer.channels()
        )));
    }
    let (left, right) = law.gains(position);
    for frame in buffer.frames_mut() {
        frame[0] *= left;
        frame[1] *= right;
    }
    Ok(())
}
