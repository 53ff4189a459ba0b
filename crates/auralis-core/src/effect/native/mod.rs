//! Built-in processing stages
//!
//! Everything the fixed channel, group, effect and master chains need. The
//! chains own these directly; nothing is loaded at runtime.

mod biquad;
pub mod compressor;
mod crossover;
pub mod delay;
pub mod eq;
mod gain;
pub mod gate;
pub mod limiter;
pub mod pitch;
pub mod reverb;

pub use biquad::{BiquadCoeffs, BiquadState};
pub use compressor::{auto_makeup_db, CompressorEffect, Makeup};
pub use crossover::{ThreeBandCrossover, BAND_COUNT as CROSSOVER_BANDS};
pub use delay::DelayEffect;
pub use eq::{BandLayout, BandShape, ChannelEq, EqEffect, GroupEq, BAND_GAIN_DB};
pub use gain::GainEffect;
pub use gate::GateEffect;
pub use limiter::LimiterEffect;
pub use pitch::{correction_ratio, detect_pitch, PitchCorrectionEffect};
pub use reverb::ReverbEffect;
