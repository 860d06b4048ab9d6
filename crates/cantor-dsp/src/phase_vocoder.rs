//! Phase vocoder pitch shifting.
//!
//! Each STFT frame is analysed bin by bin: the phase advance since the
//! previous hop gives the bin's true frequency, which is moved to bin
//! `round(k * shift)`. Magnitudes landing on the same bin add up. Synthesis
//! phases are integrated from the moved frequencies so partials stay coherent
//! from hop to hop. Bins shifted to or past Nyquist are dropped.
//!
//! [`pitch_shift`] keeps phase state for the duration of one buffer.
//! [`PhaseVocoderProcessor`] keeps it across pushed chunks for streamed use.

use crate::config::SpectralConfig;
use crate::spectral::{accumulate, Stft};
use cantor_core::{Complex32, Result, SampleBuffer};
use rayon::prelude::*;
use std::f64::consts::{PI, TAU};

/// Wrap a phase into `(-π, π]`.
#[inline]
fn wrap_phase(phase: f64) -> f64 {
    let wrapped = (phase + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

#[inline]
fn semitones_to_ratio(semitones: f64) -> f64 {
    2f64.powf(semitones / 12.0)
}

/// Cross-hop state for one channel.
#[derive(Debug, Clone)]
struct VocoderState {
    last_analysis_phase: Vec<f64>,
    last_synthesis_phase: Vec<f64>,
    synthesis_magnitude: Vec<f64>,
    synthesis_frequency: Vec<f64>,
    size: usize,
    hop: usize,
}

impl VocoderState {
    fn new(size: usize, hop: usize) -> Self {
        let nyquist = size / 2;
        Self {
            last_analysis_phase: vec![0.0; nyquist],
            last_synthesis_phase: vec![0.0; nyquist],
            synthesis_magnitude: vec![0.0; nyquist],
            synthesis_frequency: vec![0.0; nyquist],
            size,
            hop,
        }
    }

    fn reset(&mut self) {
        self.last_analysis_phase.fill(0.0);
        self.last_synthesis_phase.fill(0.0);
        self.synthesis_magnitude.fill(0.0);
        self.synthesis_frequency.fill(0.0);
    }

    /// Remap one frame's spectrum in place.
    fn shift_frame(&mut self, spectrum: &mut [Complex32], shift: f64) {
        let size = self.size;
        let nyquist = size / 2;
        let hop = self.hop as f64;
        // phase advance of bin k over one hop is 2π·k·hop/N
        let bin_advance = TAU * hop / size as f64;

        self.synthesis_magnitude.fill(0.0);
        self.synthesis_frequency.fill(0.0);

        for k in 0..nyquist {
            let bin = spectrum[k];
            let magnitude = bin.norm() as f64;
            let phase = bin.arg() as f64;

            let expected = TAU * ((k * self.hop) % size) as f64 / size as f64;
            let deviation = wrap_phase(phase - self.last_analysis_phase[k] - expected);
            self.last_analysis_phase[k] = phase;

            let true_frequency = k as f64 + deviation / bin_advance;
            let target = (k as f64 * shift + 0.5).floor() as usize;
            if target < nyquist {
                self.synthesis_magnitude[target] += magnitude;
                self.synthesis_frequency[target] = true_frequency * shift;
            }
        }

        for k in 0..nyquist {
            let phase = wrap_phase(
                self.last_synthesis_phase[k] + bin_advance * self.synthesis_frequency[k],
            );
            self.last_synthesis_phase[k] = phase;
            spectrum[k] = Complex32::from_polar(self.synthesis_magnitude[k] as f32, phase as f32);
        }

        spectrum[nyquist] = Complex32::new(0.0, 0.0);
        for k in 1..nyquist {
            spectrum[size - k] = spectrum[k].conj();
        }
    }
}

fn shift_channel(stft: &Stft, input: &[f32], shift: f64) -> Vec<f32> {
    let mut state = VocoderState::new(stft.size(), stft.hop());
    let partial = stft.process(input, 0..stft.frame_count(input.len()), |spectrum| {
        state.shift_frame(spectrum, shift)
    });
    let mut out = vec![0.0; input.len()];
    accumulate(&mut out, &partial);
    out
}

/// Shift every channel of `buffer` by `semitones`, keeping its length.
///
/// Phase state starts at zero and is discarded afterwards.
pub fn pitch_shift(buffer: &mut SampleBuffer, semitones: f64, config: SpectralConfig) -> Result<()> {
    let stft = Stft::new(&config)?;
    let shift = semitones_to_ratio(semitones);
    for ch in 0..buffer.channels() {
        let out = shift_channel(&stft, &buffer.channel(ch), shift);
        buffer.set_channel(ch, &out);
    }
    Ok(())
}

/// [`pitch_shift`] with one worker per channel.
///
/// Channels are never split into frame ranges here: phase state must run
/// through every hop of a channel in order.
pub fn pitch_shift_mt(
    buffer: &mut SampleBuffer,
    semitones: f64,
    config: SpectralConfig,
) -> Result<()> {
    let stft = Stft::new(&config)?;
    let shift = semitones_to_ratio(semitones);
    let inputs: Vec<Vec<f32>> = (0..buffer.channels()).map(|ch| buffer.channel(ch)).collect();
    let outputs: Vec<Vec<f32>> = inputs
        .par_iter()
        .map(|input| shift_channel(&stft, input, shift))
        .collect();
    for (ch, out) in outputs.iter().enumerate() {
        buffer.set_channel(ch, out);
    }
    Ok(())
}

/// Streaming pitch shifter for one channel.
///
/// Push input in chunks of any size and pop shifted output. Output lags input
/// by [`latency_samples`](Self::latency_samples); apart from that delay it is
/// identical to running [`pitch_shift`] over the concatenated input.
pub struct PhaseVocoderProcessor {
    stft: Stft,
    state: VocoderState,
    shift: f64,
    input: Vec<f32>,
    overlap: Vec<f32>,
    output: Vec<f32>,
}

impl PhaseVocoderProcessor {
    pub fn new(config: SpectralConfig, semitones: f64) -> Result<Self> {
        let stft = Stft::new(&config)?;
        let size = stft.size();
        let hop = stft.hop();
        Ok(Self {
            state: VocoderState::new(size, hop),
            shift: semitones_to_ratio(semitones),
            input: vec![0.0; size - hop],
            overlap: vec![0.0; size],
            output: Vec::new(),
            stft,
        })
    }

    /// Delay between a pushed sample and its shifted counterpart.
    pub fn latency_samples(&self) -> usize {
        self.stft.size() - self.stft.hop()
    }

    pub fn set_semitones(&mut self, semitones: f64) {
        self.shift = semitones_to_ratio(semitones);
    }

    /// Clear all state, e.g. after a seek.
    pub fn reset(&mut self) {
        self.state.reset();
        self.input.clear();
        self.input
            .resize(self.stft.size() - self.stft.hop(), 0.0);
        self.overlap.fill(0.0);
        self.output.clear();
    }

    /// Feed samples and process every complete frame.
    pub fn push_input(&mut self, samples: &[f32]) {
        self.input.extend_from_slice(samples);
        let size = self.stft.size();
        let hop = self.stft.hop();

        while self.input.len() >= size {
            let frame = &self.input[..size];
            let state = &mut self.state;
            let shift = self.shift;
            // a single frame whose first frame starts at 0
            let partial = self
                .stft
                .process_aligned(frame, |spectrum| state.shift_frame(spectrum, shift));
            for (dst, src) in self.overlap.iter_mut().zip(&partial) {
                *dst += src;
            }

            self.output.extend_from_slice(&self.overlap[..hop]);
            self.overlap.copy_within(hop.., 0);
            self.overlap[size - hop..].fill(0.0);
            self.input.drain(..hop);
        }
    }

    pub fn output_available(&self) -> usize {
        self.output.len()
    }

    /// Move up to `out.len()` finished samples into `out`, returning the count.
    pub fn pop_output(&mut self, out: &mut [f32]) -> usize {
        let count = out.len().min(self.output.len());
        out[..count].copy_from_slice(&self.output[..count]);
        self.output.drain(..count);
        count
    }
}
