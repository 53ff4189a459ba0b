//! Soundcheck: capture, spectral analysis, classification and corrections
//!
//! The engine runs on a background thread and never touches the audio
//! callback except through the lock-free [`CaptureTap`].

mod analysis;
mod capture;
mod classify;
mod engine;
pub mod profiles;

pub use analysis::{measure_levels, LevelStats, SpectrumAnalyzer, FFT_SIZE, HOP_SIZE};
pub use capture::{capture_slot, CaptureBuffer, CaptureSlot, CaptureTap};
pub use classify::{classify, compressor_ratio_for, compute_corrections, profile_distance, Corrections};
pub use engine::{ChannelAnalysis, SoundcheckEngine, SoundcheckError, SoundcheckState};
pub use profiles::{profile_for, profiles, ToneProfile, ToneProfileKind, NUM_BANDS};
