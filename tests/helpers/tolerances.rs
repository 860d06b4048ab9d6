//! Tolerance constants for audio testing.
//!
//! Pick the loosest one that still proves the property under test.

/// Exact paths: pass-through, unity gain, channel duplication.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// STFT round trips and other float-heavy DSP.
pub const DSP_EPSILON: f32 = 1e-4;

/// ~-60dB, inaudible differences.
pub const PERCEPTUAL_EPSILON: f32 = 0.001;

/// ~-80dB. Values below this are treated as silence.
pub const SILENCE_THRESHOLD: f32 = 0.0001;

/// One 16-bit quantization step.
pub const INT16_EPSILON: f32 = 1.0 / 32768.0;

/// G.711 companding error near full scale.
pub const G711_EPSILON: f32 = 0.02;
