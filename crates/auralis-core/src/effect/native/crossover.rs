//! Three-band Linkwitz-Riley crossover
//!
//! Each split point cascades two 2-pole Butterworth state-variable filters
//! to get 24dB/oct slopes. The input is split at the low crossover, then the
//! high part is split again at the high crossover:
//!
//! ```text
//! in ─► LR(low) ─┬─ low ─────────────────► band 0
//!                └─ high ─► LR(high) ─┬─► band 1
//!                                     └─► band 2
//! ```

use crate::types::{StereoBuffer, StereoSample, SAMPLE_RATE};

/// Default split between low and mid bands (Hz)
pub const LOW_CROSSOVER_HZ: f32 = 200.0;
/// Default split between mid and high bands (Hz)
pub const HIGH_CROSSOVER_HZ: f32 = 2000.0;

pub const BAND_COUNT: usize = 3;

/// Two-pole state-variable filter with Butterworth damping
#[derive(Clone)]
struct SvfFilter {
    ic1eq: [f32; 2],
    ic2eq: [f32; 2],
    k: f32,
    a1: f32,
    a2: f32,
    a3: f32,
}

impl SvfFilter {
    fn new(cutoff: f32, sample_rate: f32) -> Self {
        let mut f = Self {
            ic1eq: [0.0; 2],
            ic2eq: [0.0; 2],
            k: 0.0,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
        };
        f.set_frequency(cutoff, sample_rate);
        f
    }

    fn set_frequency(&mut self, cutoff: f32, sample_rate: f32) {
        let cutoff = cutoff.clamp(20.0, sample_rate * 0.45);
        let g = (std::f32::consts::PI * cutoff / sample_rate).tan();
        self.k = std::f32::consts::SQRT_2;
        self.a1 = 1.0 / (1.0 + g * (g + self.k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
    }

    /// Returns (lowpass, highpass) for one lane
    #[inline]
    fn tick(&mut self, lane: usize, input: f32) -> (f32, f32) {
        let v3 = input - self.ic2eq[lane];
        let v1 = self.a1 * self.ic1eq[lane] + self.a2 * v3;
        let v2 = self.ic2eq[lane] + self.a2 * self.ic1eq[lane] + self.a3 * v3;
        self.ic1eq[lane] = 2.0 * v1 - self.ic1eq[lane];
        self.ic2eq[lane] = 2.0 * v2 - self.ic2eq[lane];
        (v2, input - self.k * v1 - v2)
    }

    #[inline]
    fn process(&mut self, input: StereoSample) -> (StereoSample, StereoSample) {
        let (low_l, high_l) = self.tick(0, input.left);
        let (low_r, high_r) = self.tick(1, input.right);
        (StereoSample::new(low_l, low_r), StereoSample::new(high_l, high_r))
    }

    fn reset(&mut self) {
        self.ic1eq = [0.0; 2];
        self.ic2eq = [0.0; 2];
    }
}

/// One LR24 split point
#[derive(Clone)]
struct SplitPoint {
    lp1: SvfFilter,
    lp2: SvfFilter,
    hp1: SvfFilter,
    hp2: SvfFilter,
    frequency: f32,
}

impl SplitPoint {
    fn new(frequency: f32, sample_rate: f32) -> Self {
        Self {
            lp1: SvfFilter::new(frequency, sample_rate),
            lp2: SvfFilter::new(frequency, sample_rate),
            hp1: SvfFilter::new(frequency, sample_rate),
            hp2: SvfFilter::new(frequency, sample_rate),
            frequency,
        }
    }

    #[inline]
    fn process(&mut self, input: StereoSample) -> (StereoSample, StereoSample) {
        let (lp1_out, _) = self.lp1.process(input);
        let (low, _) = self.lp2.process(lp1_out);
        let (_, hp1_out) = self.hp1.process(input);
        let (_, high) = self.hp2.process(hp1_out);
        (low, high)
    }

    fn reset(&mut self) {
        self.lp1.reset();
        self.lp2.reset();
        self.hp1.reset();
        self.hp2.reset();
    }
}

/// Fixed three-band splitter used by the master multiband stage
pub struct ThreeBandCrossover {
    low: SplitPoint,
    high: SplitPoint,
}

impl ThreeBandCrossover {
    pub fn new() -> Self {
        Self::with_frequencies(LOW_CROSSOVER_HZ, HIGH_CROSSOVER_HZ, SAMPLE_RATE as f32)
    }

    pub fn with_frequencies(low_hz: f32, high_hz: f32, sample_rate: f32) -> Self {
        Self {
            low: SplitPoint::new(low_hz, sample_rate),
            high: SplitPoint::new(high_hz, sample_rate),
        }
    }

    /// Rebuild the filters for a new sample rate, keeping the split points
    pub fn prepare(&mut self, sample_rate: f32) {
        *self = Self::with_frequencies(self.low.frequency, self.high.frequency, sample_rate);
    }

    pub fn frequencies(&self) -> (f32, f32) {
        (self.low.frequency, self.high.frequency)
    }

    #[inline]
    pub fn process(&mut self, input: StereoSample) -> [StereoSample; BAND_COUNT] {
        let (band0, rest) = self.low.process(input);
        let (band1, band2) = self.high.process(rest);
        [band0, band1, band2]
    }

    /// Split `input` into the three band buffers (each resized to match)
    pub fn process_buffer(&mut self, input: &StereoBuffer, bands: &mut [StereoBuffer; BAND_COUNT]) {
        for band in bands.iter_mut() {
            band.set_len_from_capacity(input.len());
        }
        for (i, sample) in input.iter().enumerate() {
            let split = self.process(*sample);
            for (band, value) in bands.iter_mut().zip(split) {
                band[i] = value;
            }
        }
    }

    pub fn reset(&mut self) {
        self.low.reset();
        self.high.reset();
    }
}

impl Default for ThreeBandCrossover {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band_energy(freq: f32) -> [f32; BAND_COUNT] {
        let mut crossover = ThreeBandCrossover::new();
        let sr = SAMPLE_RATE as f32;
        let mut energy = [0.0f32; BAND_COUNT];
        for i in 0..48000 {
            let x = (2.0 * std::f32::consts::PI * freq * i as f32 / sr).sin();
            let bands = crossover.process(StereoSample::mono(x));
            // Skip the settling period
            if i >= 4800 {
                for (e, b) in energy.iter_mut().zip(bands) {
                    *e += b.left * b.left;
                }
            }
        }
        energy
    }

    #[test]
    fn test_default_frequencies() {
        let crossover = ThreeBandCrossover::new();
        assert_eq!(crossover.frequencies(), (200.0, 2000.0));
    }

    #[test]
    fn test_bass_lands_in_low_band() {
        let e = band_energy(50.0);
        assert!(e[0] > 10.0 * (e[1] + e[2]), "{e:?}");
    }

    #[test]
    fn test_mid_lands_in_mid_band() {
        let e = band_energy(630.0);
        assert!(e[1] > 4.0 * e[0] && e[1] > 4.0 * e[2], "{e:?}");
    }

    #[test]
    fn test_treble_lands_in_high_band() {
        let e = band_energy(10000.0);
        assert!(e[2] > 10.0 * (e[0] + e[1]), "{e:?}");
    }

    #[test]
    fn test_dc_sums_to_unity() {
        let mut crossover = ThreeBandCrossover::new();
        let mut sum = 0.0;
        for _ in 0..20000 {
            let bands = crossover.process(StereoSample::new(1.0, 1.0));
            sum = bands.iter().map(|b| b.left).sum::<f32>();
        }
        assert!((sum - 1.0).abs() < 0.01, "sum {sum}");
    }
}
