//! Overlap-add time stretching.
//!
//! Input is cut into windowed grains every `hop` samples. Grain `i` is placed
//! at output position `i / speed`; when slowing down each grain is repeated
//! every `hop` samples until the next one is due. No spectral processing is
//! involved, so pitch is preserved but transients smear.

use crate::config::DEFAULT_HOP_SIZE;
use cantor_core::{Result, SampleBuffer, Window};

/// Change playback speed without changing pitch.
///
/// The result has `frame_count / |speed|` frames. A speed of 0 is ignored with
/// a warning, negative speeds use their magnitude, and a hop larger than the
/// window falls back to the default hop with a Hann window of twice its size.
pub fn change_speed(
    buffer: &mut SampleBuffer,
    speed: f64,
    hop_size: usize,
    window: &Window,
) -> Result<()> {
    if speed == 0.0 || !speed.is_finite() {
        tracing::warn!("change_speed: speed {} ignored", speed);
        return Ok(());
    }
    let speed = speed.abs();

    let fallback;
    let (hop, window) = if hop_size == 0 || hop_size > window.size() {
        tracing::warn!(
            "change_speed: hop {} invalid for window {}, using defaults",
            hop_size,
            window.size()
        );
        fallback = Window::hann(DEFAULT_HOP_SIZE * 2);
        (DEFAULT_HOP_SIZE, &fallback)
    } else {
        (hop_size, window)
    };

    let input_frames = buffer.frame_count();
    let output_frames = (input_frames as f64 / speed).floor() as usize;
    let channels = buffer.channels();
    let wnd = window.as_slice();
    let window_sum: f64 = wnd.iter().map(|&w| w as f64).sum();
    if window_sum <= 0.0 {
        *buffer = SampleBuffer::new(output_frames, buffer.channel_layout(), buffer.sample_rate());
        return Ok(());
    }

    let inv_speed = 1.0 / speed;
    // grains average one every `spacing` output samples
    let (repeats, spacing) = if speed < 1.0 {
        (inv_speed.ceil() as usize, hop as f64)
    } else {
        (1, hop as f64 * inv_speed)
    };
    let gain = (spacing / window_sum) as f32;

    let mut out = SampleBuffer::new(output_frames, buffer.channel_layout(), buffer.sample_rate());
    for i in (0..input_frames).step_by(hop) {
        let base = (i as f64 * inv_speed) as usize;
        for r in 0..repeats {
            let dst_start = base + r * hop;
            if speed < 1.0 && (r * hop) as f64 >= hop as f64 * inv_speed {
                break;
            }
            for (l, &w) in wnd.iter().enumerate() {
                let (src, dst) = (i + l, dst_start + l);
                if src >= input_frames || dst >= output_frames {
                    break;
                }
                let g = w * gain;
                for ch in 0..channels {
                    out[dst][ch] += buffer[src][ch] * g;
                }
            }
        }
    }

    *buffer = out;
    Ok(())
}
