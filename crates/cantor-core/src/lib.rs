//! # cantor-core
//!
//! Sample representation and format plumbing shared by every cantor crate.
//!
//! - [`SampleBuffer`] holds normalized `f32` frames, [`EncodedBuffer`] holds raw bytes
//! - [`CodecRegistry`] converts between the two (PCM, IEEE float, A-law, µ-law)
//! - [`resample`] and [`channel_mix`] adapt sample rate and channel layout
//! - [`fourier`] and [`window`] are the transform primitives used by the DSP crate
//! - [`FrameSource`] is the random-access pull contract for streamed voices

pub mod buffer;
pub mod channel_mix;
pub mod codec;
pub mod error;
pub mod format;
pub mod fourier;
pub mod layout;
pub mod lockfree;
pub mod resample;
pub mod source;
pub mod window;

#[cfg(feature = "wav")]
pub mod wav;

pub use buffer::{EncodedBuffer, SampleBuffer};
pub use channel_mix::change_channel_layout;
pub use codec::{Codec, CodecRegistry};
pub use error::{Error, ErrorKind, ErrorObserver, Result};
pub use format::{format_tag, Endian, FormatInfo};
pub use fourier::{Complex32, Fourier};
pub use layout::{ChannelLayout, ChannelMask};
pub use lockfree::{AtomicFlag, AtomicFloat};
pub use resample::{change_sample_rate, StreamResampler};
pub use source::{FrameSource, SourceChunk};
pub use window::{Window, WindowKind};

#[cfg(feature = "wav")]
pub use wav::{save_wav, WavSource};
