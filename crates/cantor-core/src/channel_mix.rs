//! Channel up/down-mixing by speaker position.
//!
//! Every input position is routed to the output positions it is closest to:
//! the same position when present, otherwise the same side and zone, otherwise
//! the same side, with centre channels split evenly across left and right.
//! Each output channel is then divided by the total weight routed into it, so
//! mono fans out by duplication and stereo folds down by averaging.

use crate::buffer::SampleBuffer;
use crate::layout::{ChannelLayout, ChannelMask, Side};
use crate::Result;
use smallvec::SmallVec;

type Weights = SmallVec<[f32; 8]>;

/// Weight of `input` in each of `outputs`.
fn route(input: ChannelMask, outputs: &[ChannelMask]) -> Weights {
    let mut weights: Weights = SmallVec::from_elem(0.0, outputs.len());

    if let Some(j) = outputs.iter().position(|&o| o == input) {
        weights[j] = 1.0;
        return weights;
    }
    if outputs.len() == 1 {
        weights[0] = 1.0;
        return weights;
    }

    let side = input.side();
    let zone = input.zone();
    let mut assign = |pred: &dyn Fn(&ChannelMask) -> bool, weight: f32| -> bool {
        let mut hit = false;
        for (w, o) in weights.iter_mut().zip(outputs) {
            if pred(o) {
                *w = weight;
                hit = true;
            }
        }
        hit
    };

    match side {
        Side::Left | Side::Right => {
            let _ = assign(&|o| o.side() == side && o.zone() == zone, 1.0)
                || assign(&|o| o.side() == side, 1.0)
                || assign(&|o| o.side() == Side::Center, 1.0);
        }
        Side::Center => {
            let _ = assign(&|o| o.side() == Side::Center && o.zone() == zone, 1.0)
                || assign(&|o| o.side() != Side::Center && o.zone() == zone, 0.5)
                || assign(&|o| o.side() != Side::Center, 0.5)
                || assign(&|o| o.side() == Side::Center, 1.0);
        }
    }
    weights
}

/// Mixing matrix indexed `[output][input]`, rows normalized to unit total.
pub fn mixing_matrix(from: ChannelLayout, to: ChannelLayout) -> Result<Vec<Weights>> {
    let inputs = from.positions()?;
    let outputs = to.positions()?;

    let mut matrix = vec![Weights::from_elem(0.0, inputs.len()); outputs.len()];
    for (i, &input) in inputs.iter().enumerate() {
        for (j, w) in route(input, &outputs).into_iter().enumerate() {
            matrix[j][i] = w;
        }
    }
    for row in &mut matrix {
        let total: f32 = row.iter().sum();
        if total > 0.0 {
            row.iter_mut().for_each(|w| *w /= total);
        }
    }
    Ok(matrix)
}

/// Convert `buffer` to `target` in place. Identical layouts are a no-op.
///
/// Fails when either layout has no position mapping.
pub fn change_channel_layout(buffer: &mut SampleBuffer, target: ChannelLayout) -> Result<()> {
    let source = buffer.channel_layout();
    if source == target {
        return Ok(());
    }
    if source.count == target.count && source.positions()? == target.positions()? {
        let (frames, rate) = (buffer.frame_count(), buffer.sample_rate());
        let samples = std::mem::take(buffer).into_samples();
        *buffer = SampleBuffer::from_parts(samples, frames, target, rate);
        return Ok(());
    }

    let matrix = mixing_matrix(source, target)?;
    let mut out = SampleBuffer::new(buffer.frame_count(), target, buffer.sample_rate());
    for (src, dst) in buffer.frames().zip(out.frames_mut()) {
        for (sample, row) in dst.iter_mut().zip(&matrix) {
            *sample = row.iter().zip(src).map(|(w, s)| w * s).sum();
        }
    }
    *buffer = out;
    Ok(())
}
