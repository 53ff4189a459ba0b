//! Common types for Auralis
//!
//! This module contains the fundamental audio types used throughout the
//! mixer: stereo block containers, the channel/bus archetypes that drive
//! routing, and decibel helpers.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Default sample rate (48kHz - standard professional audio rate)
/// The actual rate is negotiated with the device at runtime.
pub const SAMPLE_RATE: u32 = 48000;

/// Number of input channels on the console
pub const NUM_CHANNELS: usize = 32;

/// Number of group buses (Vocals, Instruments, Drums, Speech)
pub const NUM_GROUP_BUSES: usize = 4;

/// Number of effect-send buses (Vocal FX, Instrument FX, Drum FX)
pub const NUM_FX_BUSES: usize = 3;

/// Largest block processed in one pass; longer host periods are split
pub const MAX_BLOCK_SIZE: usize = 8192;

/// Floor used when converting silence to decibels
pub const SILENCE_DB: f32 = -100.0;

/// Audio sample type
pub type Sample = f32;

/// Convert decibels to a linear gain factor
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert a linear gain factor to decibels, floored at [`SILENCE_DB`]
#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    if gain <= 0.0 {
        return SILENCE_DB;
    }
    (20.0 * gain.log10()).max(SILENCE_DB)
}

/// Channel archetype
///
/// Decides which group bus and which effect-send bus a channel feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChannelType {
    Vocal = 0,
    Instrument = 1,
    Drums = 2,
    Other = 3,
}

impl ChannelType {
    pub const ALL: [ChannelType; 4] = [
        ChannelType::Vocal,
        ChannelType::Instrument,
        ChannelType::Drums,
        ChannelType::Other,
    ];

    /// Convert from index (0-3) to ChannelType
    pub fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(ChannelType::Vocal),
            1 => Some(ChannelType::Instrument),
            2 => Some(ChannelType::Drums),
            3 => Some(ChannelType::Other),
            _ => None,
        }
    }

    /// Archetype a channel gets at construction, by index range
    ///
    /// Channels 0-7 are vocals, 8-15 instruments, everything above drums.
    pub fn default_for_channel(channel: usize) -> Self {
        match channel {
            0..=7 => ChannelType::Vocal,
            8..=15 => ChannelType::Instrument,
            _ => ChannelType::Drums,
        }
    }

    /// Group bus this archetype sums into
    pub fn group_bus(&self) -> GroupBusType {
        match self {
            ChannelType::Vocal => GroupBusType::Vocals,
            ChannelType::Instrument => GroupBusType::Instruments,
            ChannelType::Drums => GroupBusType::Drums,
            ChannelType::Other => GroupBusType::Speech,
        }
    }

    /// Effect-send bus this archetype feeds (Other has none)
    pub fn fx_bus(&self) -> Option<FxBusType> {
        match self {
            ChannelType::Vocal => Some(FxBusType::VocalFx),
            ChannelType::Instrument => Some(FxBusType::InstrumentFx),
            ChannelType::Drums => Some(FxBusType::DrumFx),
            ChannelType::Other => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChannelType::Vocal => "Vocal",
            ChannelType::Instrument => "Instrument",
            ChannelType::Drums => "Drums",
            ChannelType::Other => "Other",
        }
    }
}

/// Group bus identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum GroupBusType {
    Vocals = 0,
    Instruments = 1,
    Drums = 2,
    Speech = 3,
}

impl GroupBusType {
    /// Get all group buses in enumeration order
    pub const ALL: [GroupBusType; NUM_GROUP_BUSES] = [
        GroupBusType::Vocals,
        GroupBusType::Instruments,
        GroupBusType::Drums,
        GroupBusType::Speech,
    ];

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            GroupBusType::Vocals => "Vocals",
            GroupBusType::Instruments => "Instruments",
            GroupBusType::Drums => "Drums",
            GroupBusType::Speech => "Speech",
        }
    }
}

/// Effect-send bus identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum FxBusType {
    VocalFx = 0,
    InstrumentFx = 1,
    DrumFx = 2,
}

impl FxBusType {
    /// Get all effect-send buses in enumeration order
    pub const ALL: [FxBusType; NUM_FX_BUSES] =
        [FxBusType::VocalFx, FxBusType::InstrumentFx, FxBusType::DrumFx];

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            FxBusType::VocalFx => "Vocal FX",
            FxBusType::InstrumentFx => "Instrument FX",
            FxBusType::DrumFx => "Drum FX",
        }
    }
}

/// A single stereo sample (left and right channels)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Create a mono sample (same value in both channels)
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Get the peak amplitude (max of abs(left), abs(right))
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }
}

impl std::ops::Add for StereoSample {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            left: self.left + other.left,
            right: self.right + other.right,
        }
    }
}

impl std::ops::AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

impl std::ops::MulAssign<Sample> for StereoSample {
    #[inline]
    fn mul_assign(&mut self, factor: Sample) {
        self.left *= factor;
        self.right *= factor;
    }
}

/// A buffer of stereo samples
///
/// The block container every stage of the mixer processes in place. Buffers
/// on the audio path are allocated once at their maximum size and resized
/// with [`StereoBuffer::set_len_from_capacity`], which never allocates.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    samples: Vec<StereoSample>,
}

impl StereoBuffer {
    /// Create a new buffer with the specified capacity (in stereo samples)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![StereoSample::silence(); len],
        }
    }

    /// Create a buffer from separate left and right channel slices
    pub fn from_channels(left: &[Sample], right: &[Sample]) -> Self {
        assert_eq!(left.len(), right.len(), "Channel lengths must match");
        let samples = left
            .iter()
            .zip(right.iter())
            .map(|(&l, &r)| StereoSample::new(l, r))
            .collect();
        Self { samples }
    }

    /// Create a buffer with the same signal in both channels
    pub fn from_mono(mono: &[Sample]) -> Self {
        Self {
            samples: mono.iter().map(|&s| StereoSample::mono(s)).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Set the working length of a pre-allocated buffer (real-time safe)
    ///
    /// Fills any newly exposed elements with silence.
    #[inline]
    pub fn set_len_from_capacity(&mut self, new_len: usize) {
        let current_len = self.samples.len();
        if new_len > current_len {
            debug_assert!(
                new_len <= self.samples.capacity(),
                "set_len_from_capacity called with len > capacity"
            );
            self.samples.resize(new_len, StereoSample::silence());
        } else {
            self.samples.truncate(new_len);
        }
    }

    pub fn fill_silence(&mut self) {
        self.samples.fill(StereoSample::silence());
    }

    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.samples
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.samples
    }

    /// Add another buffer to this one (summing samples)
    ///
    /// Sums over the overlapping length.
    pub fn add_buffer(&mut self, other: &StereoBuffer) {
        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            *dst += *src;
        }
    }

    /// Add another buffer scaled by `gain`
    pub fn add_scaled(&mut self, other: &StereoBuffer, gain: Sample) {
        for (dst, src) in self.samples.iter_mut().zip(other.samples.iter()) {
            *dst += *src * gain;
        }
    }

    /// Scale all samples by a factor
    pub fn scale(&mut self, factor: Sample) {
        for sample in &mut self.samples {
            *sample *= factor;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &StereoSample> {
        self.samples.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StereoSample> {
        self.samples.iter_mut()
    }

    /// Get the peak amplitude in the buffer
    pub fn peak(&self) -> Sample {
        self.samples.iter().map(|s| s.peak()).fold(0.0, Sample::max)
    }
}

impl Index<usize> for StereoBuffer {
    type Output = StereoSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IndexMut<usize> for StereoBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.samples[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_sample_operations() {
        let a = StereoSample::new(1.0, 2.0);
        let b = StereoSample::new(0.5, 0.5);

        let sum = a + b;
        assert_eq!(sum.left, 1.5);
        assert_eq!(sum.right, 2.5);

        let scaled = a * 0.5;
        assert_eq!(scaled.left, 0.5);
        assert_eq!(scaled.right, 1.0);
    }

    #[test]
    fn test_set_len_from_capacity_keeps_allocation() {
        let mut buffer = StereoBuffer::silence(512);
        let capacity = buffer.as_slice().len();
        buffer.set_len_from_capacity(128);
        assert_eq!(buffer.len(), 128);
        buffer.set_len_from_capacity(capacity);
        assert_eq!(buffer.len(), 512);
        assert_eq!(buffer.peak(), 0.0);
    }

    #[test]
    fn test_add_scaled() {
        let mut dst = StereoBuffer::from_mono(&[1.0, 1.0]);
        let src = StereoBuffer::from_channels(&[2.0, 4.0], &[0.0, -2.0]);
        dst.add_scaled(&src, 0.5);
        assert_eq!(dst[0], StereoSample::new(2.0, 1.0));
        assert_eq!(dst[1], StereoSample::new(3.0, 0.0));
    }

    #[test]
    fn test_channel_type_routing() {
        assert_eq!(ChannelType::default_for_channel(0), ChannelType::Vocal);
        assert_eq!(ChannelType::default_for_channel(7), ChannelType::Vocal);
        assert_eq!(ChannelType::default_for_channel(8), ChannelType::Instrument);
        assert_eq!(ChannelType::default_for_channel(16), ChannelType::Drums);
        assert_eq!(ChannelType::default_for_channel(31), ChannelType::Drums);

        assert_eq!(ChannelType::Other.group_bus(), GroupBusType::Speech);
        assert_eq!(ChannelType::Other.fx_bus(), None);
        assert_eq!(ChannelType::Drums.fx_bus(), Some(FxBusType::DrumFx));
    }

    #[test]
    fn test_db_conversion() {
        assert!((db_to_gain(6.0) - 1.995).abs() < 0.01);
        assert!((gain_to_db(0.5) + 6.02).abs() < 0.01);
        assert_eq!(gain_to_db(0.0), SILENCE_DB);
    }
}
