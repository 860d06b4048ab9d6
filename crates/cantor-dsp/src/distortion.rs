//! Memoryless waveshapers.

use cantor_core::SampleBuffer;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_2_PI, FRAC_PI_2};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distortion {
    /// Clamp to `[negative, positive]`.
    HardClip { positive: f32, negative: f32 },
    /// `(2/π)·atan(α·x)`.
    Arctan { alpha: f32 },
    /// `x - x³/3` on [-1, 1].
    Cubic,
    /// Soft saturation, drive in [0, 1).
    Overdrive { drive: f32 },
    /// Exponential fuzz blended with the dry signal by `depth`.
    Fuzz { depth: f32, alpha: f32 },
}

impl Distortion {
    /// Thresholds are clamped to [0, 1] and [-1, 0].
    pub fn hard_clip(positive: f32, negative: f32) -> Self {
        Distortion::HardClip {
            positive: positive.clamp(0.0, 1.0),
            negative: negative.clamp(-1.0, 0.0),
        }
    }

    pub fn arctan(alpha: f32) -> Self {
        Distortion::Arctan {
            alpha: alpha.max(0.0),
        }
    }

    pub fn overdrive(drive: f32) -> Self {
        Distortion::Overdrive {
            drive: drive.clamp(0.0, 0.99),
        }
    }

    pub fn fuzz(depth: f32, alpha: f32) -> Self {
        Distortion::Fuzz {
            depth: depth.clamp(0.0, 1.0),
            alpha: alpha.max(0.0),
        }
    }

    #[inline]
    pub fn shape(&self, x: f32) -> f32 {
        match *self {
            Distortion::HardClip { positive, negative } => x.clamp(negative, positive),
            Distortion::Arctan { alpha } => FRAC_2_PI * (alpha * x).atan(),
            Distortion::Cubic => {
                let x = x.clamp(-1.0, 1.0);
                x - x * x * x / 3.0
            }
            Distortion::Overdrive { drive } => {
                let a = (drive * FRAC_PI_2).sin();
                let k = 2.0 * a / (1.0 - a);
                (1.0 + k) * x / (1.0 + k * x.abs())
            }
            Distortion::Fuzz { depth, alpha } => {
                if x == 0.0 {
                    return 0.0;
                }
                let wet = x.signum() * (1.0 - (-alpha * x.abs()).exp());
                wet * depth + x * (1.0 - depth)
            }
        }
    }

    pub fn apply(&self, buffer: &mut SampleBuffer) {
        for sample in buffer.as_mut_slice() {
            *sample = self.shape(*sample);
        }
    }
}
