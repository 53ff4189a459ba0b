//! Fixed-frequency shelf/peak equaliser
//!
//! The channel strip uses a 4-band layout (low shelf, two peaks, high
//! shelf); group buses use a 3-band one. Only the gains are adjustable.

use super::biquad::{BiquadCoeffs, BiquadState};
use crate::effect::{Effect, EffectInfo, ParamRange};
use crate::types::{StereoBuffer, StereoSample, SAMPLE_RATE};

/// Gain range of every EQ band (dB)
pub const BAND_GAIN_DB: ParamRange = ParamRange::new(-12.0, 12.0, 0.0);

static INFO: EffectInfo = EffectInfo::new("EQ", "EQ");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandShape {
    LowShelf,
    Peak,
    HighShelf,
}

/// Static layout of one EQ band
#[derive(Debug, Clone, Copy)]
pub struct BandLayout {
    pub shape: BandShape,
    pub freq: f32,
    pub q: f32,
}

impl BandLayout {
    pub const fn new(shape: BandShape, freq: f32, q: f32) -> Self {
        Self { shape, freq, q }
    }
}

/// Channel EQ: low shelf 80 Hz, low-mid 300 Hz, high-mid 3 kHz, high shelf 8 kHz
pub const CHANNEL_EQ_LAYOUT: [BandLayout; 4] = [
    BandLayout::new(BandShape::LowShelf, 80.0, 0.7),
    BandLayout::new(BandShape::Peak, 300.0, 0.7),
    BandLayout::new(BandShape::Peak, 3000.0, 0.7),
    BandLayout::new(BandShape::HighShelf, 8000.0, 0.7),
];

/// Group bus EQ: low shelf 100 Hz, mid 900 Hz, high shelf 8 kHz
pub const GROUP_EQ_LAYOUT: [BandLayout; 3] = [
    BandLayout::new(BandShape::LowShelf, 100.0, 0.707),
    BandLayout::new(BandShape::Peak, 900.0, 0.707),
    BandLayout::new(BandShape::HighShelf, 8000.0, 0.707),
];

/// N-band equaliser with cached coefficients
///
/// Coefficients are only recomputed when a gain actually changes, so the
/// per-block `set_gains` call is cheap when nothing moves.
pub struct EqEffect<const N: usize> {
    layout: [BandLayout; N],
    gains_db: [f32; N],
    coeffs: [BiquadCoeffs; N],
    states: [BiquadState; N],
    sample_rate: f32,
    dirty: bool,
}

/// 4-band channel equaliser
pub type ChannelEq = EqEffect<4>;
/// 3-band group bus equaliser
pub type GroupEq = EqEffect<3>;

impl<const N: usize> EqEffect<N> {
    pub fn new(layout: [BandLayout; N]) -> Self {
        Self {
            layout,
            gains_db: [0.0; N],
            coeffs: [BiquadCoeffs::passthrough(); N],
            states: std::array::from_fn(|_| BiquadState::default()),
            sample_rate: SAMPLE_RATE as f32,
            dirty: true,
        }
    }

    /// Push the current band gains (called once per block)
    pub fn set_gains(&mut self, gains_db: [f32; N]) {
        for (band, gain) in gains_db.into_iter().enumerate() {
            let gain = BAND_GAIN_DB.clamp(gain);
            if gain != self.gains_db[band] {
                self.gains_db[band] = gain;
                self.dirty = true;
            }
        }
    }

    pub fn gains(&self) -> [f32; N] {
        self.gains_db
    }

    fn update_coeffs(&mut self) {
        if !self.dirty {
            return;
        }
        let sr = self.sample_rate;
        for (band, layout) in self.layout.iter().enumerate() {
            let gain = self.gains_db[band];
            // Flat bands skip the filter maths entirely
            self.coeffs[band] = if gain.abs() < 0.01 {
                BiquadCoeffs::passthrough()
            } else {
                match layout.shape {
                    BandShape::LowShelf => BiquadCoeffs::low_shelf(layout.freq, gain, layout.q, sr),
                    BandShape::Peak => BiquadCoeffs::peaking(layout.freq, gain, layout.q, sr),
                    BandShape::HighShelf => BiquadCoeffs::high_shelf(layout.freq, gain, layout.q, sr),
                }
            };
        }
        self.dirty = false;
    }
}

impl ChannelEq {
    pub fn channel() -> Self {
        Self::new(CHANNEL_EQ_LAYOUT)
    }
}

impl GroupEq {
    pub fn group() -> Self {
        Self::new(GROUP_EQ_LAYOUT)
    }
}

impl<const N: usize> Effect for EqEffect<N> {
    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.dirty = true;
        self.update_coeffs();
        self.reset();
    }

    fn process(&mut self, buffer: &mut StereoBuffer) {
        self.update_coeffs();

        for sample in buffer.iter_mut() {
            let (mut left, mut right) = (sample.left, sample.right);
            for (state, coeffs) in self.states.iter_mut().zip(self.coeffs.iter()) {
                (left, right) = state.process(left, right, coeffs);
            }
            *sample = StereoSample::new(left, right);
        }
    }

    fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }

    fn info(&self) -> &EffectInfo {
        &INFO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_eq_is_identity() {
        let mut eq = ChannelEq::channel();
        eq.prepare(48000.0);

        let mono: Vec<f32> = (0..256).map(|i| ((i * 7) % 13) as f32 / 13.0 - 0.5).collect();
        let mut buffer = StereoBuffer::from_mono(&mono);
        eq.process(&mut buffer);

        for (i, s) in buffer.iter().enumerate() {
            assert!((s.left - mono[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_gains_are_clamped() {
        let mut eq = GroupEq::group();
        eq.set_gains([40.0, -40.0, 3.0]);
        assert_eq!(eq.gains(), [12.0, -12.0, 3.0]);
    }

    #[test]
    fn test_low_shelf_cut_reduces_bass() {
        let mut eq = ChannelEq::channel();
        eq.prepare(48000.0);
        eq.set_gains([-12.0, 0.0, 0.0, 0.0]);

        let mono: Vec<f32> = (0..48000)
            .map(|i| (2.0 * std::f32::consts::PI * 30.0 * i as f32 / 48000.0).sin())
            .collect();
        let mut buffer = StereoBuffer::from_mono(&mono);
        eq.process(&mut buffer);

        let tail_peak = buffer.as_slice()[24000..]
            .iter()
            .map(|s| s.peak())
            .fold(0.0, f32::max);
        assert!(tail_peak < 0.5, "peak {tail_peak}");
    }
}
