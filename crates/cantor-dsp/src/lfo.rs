//! Low frequency oscillator used by the modulation effects.

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LfoShape {
    #[default]
    Sine,
    Triangle,
    Square,
    Sawtooth,
    SawtoothDown,
}

impl LfoShape {
    /// Bipolar value in [-1, 1] at `phase` in [0, 1).
    #[inline]
    pub fn evaluate(&self, phase: f32) -> f32 {
        match self {
            LfoShape::Sine => (phase * TAU).sin(),
            LfoShape::Triangle => {
                let p = phase * 4.0;
                if p < 1.0 {
                    p
                } else if p < 3.0 {
                    2.0 - p
                } else {
                    p - 4.0
                }
            }
            LfoShape::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoShape::Sawtooth => phase * 2.0 - 1.0,
            LfoShape::SawtoothDown => 1.0 - phase * 2.0,
        }
    }

    pub fn all() -> &'static [LfoShape] {
        &[
            LfoShape::Sine,
            LfoShape::Triangle,
            LfoShape::Square,
            LfoShape::Sawtooth,
            LfoShape::SawtoothDown,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            LfoShape::Sine => "Sine",
            LfoShape::Triangle => "Triangle",
            LfoShape::Square => "Square",
            LfoShape::Sawtooth => "Sawtooth",
            LfoShape::SawtoothDown => "Saw Down",
        }
    }
}

/// Oscillator description. Effects sample it through [`Lfo::period`], a table
/// holding exactly one cycle at the buffer's sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lfo {
    pub shape: LfoShape,
    /// Rate in Hz.
    pub frequency: f32,
    /// Phase offset as a fraction of one cycle.
    pub phase_offset: f32,
}

impl Lfo {
    pub fn new(shape: LfoShape, frequency: f32) -> Self {
        Self {
            shape,
            frequency,
            phase_offset: 0.0,
        }
    }

    pub fn sine(frequency: f32) -> Self {
        Self::new(LfoShape::Sine, frequency)
    }

    pub fn with_phase_offset(mut self, offset: f32) -> Self {
        self.phase_offset = offset.rem_euclid(1.0);
        self
    }

    /// Number of samples in one cycle, at least one.
    pub fn period_len(&self, sample_rate: u32) -> usize {
        if self.frequency <= 0.0 || !self.frequency.is_finite() {
            return 1;
        }
        ((sample_rate as f32 / self.frequency).round() as usize).max(1)
    }

    /// Bipolar value at `phase` including the phase offset.
    #[inline]
    pub fn value_at(&self, phase: f32) -> f32 {
        self.shape.evaluate((phase + self.phase_offset).rem_euclid(1.0))
    }

    /// One cycle of bipolar values.
    pub fn period(&self, sample_rate: u32) -> Vec<f32> {
        let len = self.period_len(sample_rate);
        (0..len)
            .map(|i| self.value_at(i as f32 / len as f32))
            .collect()
    }

    /// One cycle mapped onto [0, 1].
    pub fn unipolar_period(&self, sample_rate: u32) -> Vec<f32> {
        self.period(sample_rate)
            .into_iter()
            .map(|v| 0.5 * (v + 1.0))
            .collect()
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Self::sine(2.0)
    }
}
