//! Time-domain modulation effects.
//!
//! Every effect blends `wet * depth + dry * (1 - depth)` sample by sample and
//! ends with [`fix_overflow`], which scales the whole buffer back under full
//! scale instead of clipping. Feedback state lives per channel for the
//! duration of one call only.

use crate::lfo::Lfo;
use cantor_core::{Error, Result, SampleBuffer};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Scale the buffer so its peak is at most 1.0.
pub fn fix_overflow(buffer: &mut SampleBuffer) {
    let peak = buffer.abs_max();
    if peak > 1.0 {
        *buffer /= peak;
    }
}

fn check_depth(depth: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&depth) {
        return Err(Error::InvalidArgument(format!(
            "depth must be in [0, 1], got {}",
            depth
        )));
    }
    Ok(())
}

fn check_rate(lfo: &Lfo) -> Result<()> {
    if lfo.frequency <= 0.0 || !lfo.frequency.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "lfo frequency must be positive, got {}",
            lfo.frequency
        )));
    }
    Ok(())
}

fn check_feedback(gain: f32) -> Result<()> {
    if !(0.0..1.0).contains(&gain) {
        return Err(Error::InvalidArgument(format!(
            "feedback gain must be in [0, 1), got {}",
            gain
        )));
    }
    Ok(())
}

/// Linear interpolated read; positions outside the buffer read silence.
#[inline]
fn read_interpolated(source: &SampleBuffer, channel: usize, position: f64) -> f32 {
    let frames = source.frame_count() as i64;
    let base = position.floor();
    let frac = (position - base) as f32;
    let at = |i: i64| {
        if i >= 0 && i < frames {
            source[i as usize][channel]
        } else {
            0.0
        }
    };
    let s0 = at(base as i64);
    let s1 = at(base as i64 + 1);
    s0 + (s1 - s0) * frac
}

#[inline]
fn blend(wet: f32, dry: f32, depth: f32) -> f32 {
    wet * depth + dry * (1.0 - depth)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EchoParams {
    pub reflection_count: usize,
    /// Seconds between reflections.
    pub reflection_delay: f64,
    /// Gain applied once per reflection.
    pub decay_factor: f32,
    /// Start of the echoed region as a fraction of the buffer.
    pub echo_start: f64,
    /// End of the echoed region as a fraction of the buffer.
    pub echo_end: f64,
}

impl EchoParams {
    pub fn validate(&self) -> Result<()> {
        if self.reflection_delay < 0.0 || !self.reflection_delay.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "reflection delay must be non-negative, got {}",
                self.reflection_delay
            )));
        }
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(self.echo_start) || !in_range(self.echo_end) || self.echo_start > self.echo_end
        {
            return Err(Error::InvalidArgument(format!(
                "echo region [{}, {}] must lie in [0, 1]",
                self.echo_start, self.echo_end
            )));
        }
        Ok(())
    }
}

impl Default for EchoParams {
    fn default() -> Self {
        Self {
            reflection_count: 3,
            reflection_delay: 0.25,
            decay_factor: 0.5,
            echo_start: 0.0,
            echo_end: 1.0,
        }
    }
}

/// Add decaying copies of `[echo_start, echo_end]` after the region. The
/// buffer grows when the last reflection runs past its end. The dry signal is
/// kept at full level.
pub fn echo(buffer: &mut SampleBuffer, params: &EchoParams) -> Result<()> {
    params.validate()?;
    if params.reflection_count == 0 || buffer.is_empty() {
        return Ok(());
    }

    let frames = buffer.frame_count();
    let rate = buffer.sample_rate() as f64;
    let start = (params.echo_start * frames as f64) as usize;
    let end = ((params.echo_end * frames as f64) as usize).min(frames);
    let delay = (params.reflection_delay * rate).round() as usize;
    let region = buffer.sub_buffer(start, end - start);

    let required = end + params.reflection_count * delay;
    if required > frames {
        buffer.resize(required);
    }

    let channels = buffer.channels();
    let mut factor = 1.0f32;
    for reflection in 1..=params.reflection_count {
        factor *= params.decay_factor;
        let offset = start + reflection * delay;
        for (j, frame) in region.frames().enumerate() {
            let dst = &mut buffer[offset + j];
            for ch in 0..channels {
                dst[ch] += frame[ch] * factor;
            }
        }
    }

    fix_overflow(buffer);
    Ok(())
}

/// Amplitude modulation by the unipolar LFO.
pub fn tremolo(buffer: &mut SampleBuffer, lfo: &Lfo, depth: f32) -> Result<()> {
    check_depth(depth)?;
    check_rate(lfo)?;
    let table = lfo.unipolar_period(buffer.sample_rate());
    for (i, frame) in buffer.frames_mut().enumerate() {
        let gain = table[i % table.len()];
        for sample in frame.iter_mut() {
            *sample = blend(*sample * gain, *sample, depth);
        }
    }
    fix_overflow(buffer);
    Ok(())
}

/// Pitch modulation through a delay line swept by the LFO. `extent` is the
/// peak pitch deviation in semitones.
pub fn vibrato(buffer: &mut SampleBuffer, lfo: &Lfo, depth: f32, extent: f64) -> Result<()> {
    check_depth(depth)?;
    check_rate(lfo)?;
    if extent < 0.0 || !extent.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "vibrato extent must be non-negative, got {}",
            extent
        )));
    }

    let rate = buffer.sample_rate() as f64;
    let max_delay = ((extent / 12.0).exp2() - 1.0) * rate / (PI * lfo.frequency as f64);
    let table = lfo.unipolar_period(buffer.sample_rate());
    let dry = buffer.clone();
    let channels = buffer.channels();

    for (i, frame) in buffer.frames_mut().enumerate() {
        let delay = max_delay * table[i % table.len()] as f64;
        let position = i as f64 - delay;
        for ch in 0..channels {
            let wet = read_interpolated(&dry, ch, position);
            frame[ch] = blend(wet, frame[ch], depth);
        }
    }
    fix_overflow(buffer);
    Ok(())
}

/// Delay line swept between `base` and `base + sweep` samples, with the wet
/// signal fed back through a one-sample scalar per channel.
fn modulated_delay(
    buffer: &mut SampleBuffer,
    table: &[f32],
    base: f64,
    sweep: f64,
    depth: f32,
    feedback_gain: f32,
) {
    let dry = buffer.clone();
    let channels = buffer.channels();
    let mut feedback = vec![0.0f32; channels];

    for (i, frame) in buffer.frames_mut().enumerate() {
        let delay = base + sweep * table[i % table.len()] as f64;
        let position = i as f64 - delay;
        for ch in 0..channels {
            let wet = read_interpolated(&dry, ch, position) + feedback_gain * feedback[ch];
            feedback[ch] = wet;
            frame[ch] = blend(wet, frame[ch], depth);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChorusParams {
    pub depth: f32,
    pub feedback_gain: f32,
    /// Fixed delay in milliseconds.
    pub base_delay_ms: f64,
    /// Swept delay in milliseconds on top of the base delay.
    pub delay_ms: f64,
}

impl Default for ChorusParams {
    fn default() -> Self {
        Self {
            depth: 0.5,
            feedback_gain: 0.0,
            base_delay_ms: 20.0,
            delay_ms: 5.0,
        }
    }
}

pub fn chorus(buffer: &mut SampleBuffer, lfo: &Lfo, params: &ChorusParams) -> Result<()> {
    check_depth(params.depth)?;
    check_rate(lfo)?;
    check_feedback(params.feedback_gain)?;
    if params.base_delay_ms < 0.0 || params.delay_ms < 0.0 {
        return Err(Error::InvalidArgument("chorus delays must be non-negative".into()));
    }

    let ms = buffer.sample_rate() as f64 * 1e-3;
    let table = lfo.unipolar_period(buffer.sample_rate());
    modulated_delay(
        buffer,
        &table,
        params.base_delay_ms * ms,
        params.delay_ms * ms,
        params.depth,
        params.feedback_gain,
    );
    fix_overflow(buffer);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlangerParams {
    pub depth: f32,
    pub feedback_gain: f32,
    /// Maximum swept delay in milliseconds.
    pub delay_ms: f64,
}

impl Default for FlangerParams {
    fn default() -> Self {
        Self {
            depth: 0.5,
            feedback_gain: 0.3,
            delay_ms: 3.0,
        }
    }
}

pub fn flanger(buffer: &mut SampleBuffer, lfo: &Lfo, params: &FlangerParams) -> Result<()> {
    check_depth(params.depth)?;
    check_rate(lfo)?;
    check_feedback(params.feedback_gain)?;
    if params.delay_ms < 0.0 {
        return Err(Error::InvalidArgument("flanger delay must be non-negative".into()));
    }

    let sweep = params.delay_ms * buffer.sample_rate() as f64 * 1e-3;
    let table = lfo.unipolar_period(buffer.sample_rate());
    modulated_delay(buffer, &table, 0.0, sweep, params.depth, params.feedback_gain);
    fix_overflow(buffer);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WahParams {
    pub depth: f32,
    /// Filter damping; smaller is more resonant.
    pub damping: f32,
    /// Lowest swept centre frequency in Hz.
    pub fc_min: f32,
    /// Highest swept centre frequency in Hz.
    pub fc_max: f32,
}

impl Default for WahParams {
    fn default() -> Self {
        Self {
            depth: 1.0,
            damping: 0.05,
            fc_min: 500.0,
            fc_max: 3000.0,
        }
    }
}

/// Band-pass state variable filter whose centre frequency follows the LFO.
pub fn wah(buffer: &mut SampleBuffer, lfo: &Lfo, params: &WahParams) -> Result<()> {
    check_depth(params.depth)?;
    check_rate(lfo)?;
    let nyquist = buffer.sample_rate() as f32 / 2.0;
    if params.damping <= 0.0
        || params.fc_min <= 0.0
        || params.fc_max < params.fc_min
        || params.fc_max >= nyquist
    {
        return Err(Error::InvalidArgument(format!(
            "invalid wah parameters {:?} for {} Hz",
            params,
            buffer.sample_rate()
        )));
    }

    let rate = buffer.sample_rate() as f32;
    let table = lfo.unipolar_period(buffer.sample_rate());
    let q = 2.0 * params.damping;
    let channels = buffer.channels();
    // (low, band) per channel
    let mut state = vec![(0.0f32, 0.0f32); channels];

    for (i, frame) in buffer.frames_mut().enumerate() {
        let fc = params.fc_min + (params.fc_max - params.fc_min) * table[i % table.len()];
        let f = 2.0 * (std::f32::consts::PI * fc / rate).sin();
        for ch in 0..channels {
            let (low, band) = &mut state[ch];
            let high = frame[ch] - *low - q * *band;
            *band += f * high;
            *low += f * *band;
            frame[ch] = blend(*band, frame[ch], params.depth);
        }
    }
    fix_overflow(buffer);
    Ok(())
}
