//! Pitch correction
//!
//! A lightweight block-based tuner: each block's pitch is estimated from its
//! zero-crossing rate, the block is resampled towards the nearest
//! equal-tempered note and the result is blended with the dry signal by
//! `strength`. It is meant for gentle correction of sustained notes, not as
//! a formant-preserving vocal tuner.

use crate::effect::{Effect, EffectInfo, ParamRange};
use crate::types::{StereoBuffer, MAX_BLOCK_SIZE, SAMPLE_RATE};

pub const STRENGTH: ParamRange = ParamRange::new(0.0, 1.0, 0.5);

/// Reference tuning (A4)
const A4_HZ: f32 = 440.0;
/// Ratios beyond this are treated as detection errors
const MAX_RATIO: f32 = 4.0;

static INFO: EffectInfo = EffectInfo::new("Pitch Correction", "Pitch");

/// Estimate the fundamental of a block from its zero crossings
///
/// Counts whole half-periods between the first and last crossing so a block
/// that ends mid-cycle does not bias the estimate. Returns 0.0 when the block
/// has fewer than two crossings.
pub fn detect_pitch(samples: impl Iterator<Item = f32>, sample_rate: f32) -> f32 {
    let mut crossings = 0u32;
    let mut first = 0usize;
    let mut last = 0usize;
    let mut prev_positive: Option<bool> = None;
    for (i, s) in samples.enumerate() {
        let positive = s >= 0.0;
        if let Some(prev) = prev_positive {
            if prev != positive {
                if crossings == 0 {
                    first = i;
                }
                last = i;
                crossings += 1;
            }
        }
        prev_positive = Some(positive);
    }
    if crossings < 2 || last <= first {
        return 0.0;
    }
    sample_rate * (crossings - 1) as f32 / (2.0 * (last - first) as f32)
}

/// Resampling ratio that moves `detected_hz` onto the nearest semitone
pub fn correction_ratio(detected_hz: f32) -> f32 {
    if detected_hz <= 0.0 {
        return 1.0;
    }
    let midi = 69.0 + 12.0 * (detected_hz / A4_HZ).log2();
    let nearest = midi.round();
    let target = A4_HZ * 2.0_f32.powf((nearest - 69.0) / 12.0);
    let ratio = target / detected_hz;
    if ratio <= 0.0 || ratio.is_nan() || ratio > MAX_RATIO {
        1.0
    } else {
        ratio
    }
}

pub struct PitchCorrectionEffect {
    strength: f32,
    sample_rate: f32,
    /// Dry copy of the current block, per lane
    dry_l: Vec<f32>,
    dry_r: Vec<f32>,
}

impl PitchCorrectionEffect {
    pub fn new() -> Self {
        Self {
            strength: STRENGTH.default,
            sample_rate: SAMPLE_RATE as f32,
            dry_l: Vec::with_capacity(MAX_BLOCK_SIZE),
            dry_r: Vec::with_capacity(MAX_BLOCK_SIZE),
        }
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.strength = STRENGTH.clamp(strength);
    }
}

impl Default for PitchCorrectionEffect {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear-interpolated read at a fractional position, holding the last sample
#[inline]
fn read_frac(samples: &[f32], pos: f32) -> f32 {
    let last = samples.len() - 1;
    let idx = pos.floor() as usize;
    if idx >= last {
        return samples[last];
    }
    let frac = pos - idx as f32;
    samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
}

impl Effect for PitchCorrectionEffect {
    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn process(&mut self, buffer: &mut StereoBuffer) {
        let n = buffer.len();
        if n < 2 || self.strength <= 0.0 || n > MAX_BLOCK_SIZE {
            return;
        }

        self.dry_l.clear();
        self.dry_r.clear();
        for s in buffer.iter() {
            self.dry_l.push(s.left);
            self.dry_r.push(s.right);
        }

        let ratio_l = correction_ratio(detect_pitch(self.dry_l.iter().copied(), self.sample_rate));
        let ratio_r = correction_ratio(detect_pitch(self.dry_r.iter().copied(), self.sample_rate));
        if ratio_l == 1.0 && ratio_r == 1.0 {
            return;
        }

        let strength = self.strength;
        for (i, sample) in buffer.iter_mut().enumerate() {
            let tuned_l = read_frac(&self.dry_l, i as f32 * ratio_l);
            let tuned_r = read_frac(&self.dry_r, i as f32 * ratio_r);
            sample.left = sample.left * (1.0 - strength) + tuned_l * strength;
            sample.right = sample.right * (1.0 - strength) + tuned_r * strength;
        }
    }

    fn reset(&mut self) {}

    fn info(&self) -> &EffectInfo {
        &INFO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_pitch_of_sine() {
        let sr = 48000.0;
        let samples = (0..4800).map(|i| (2.0 * std::f32::consts::PI * 220.0 * (i as f32 + 0.5) / sr).sin());
        let f = detect_pitch(samples, sr);
        assert!((f - 220.0).abs() < 1.0, "detected {f}");
    }

    #[test]
    fn test_detect_pitch_ignores_partial_cycle() {
        // 10.5 periods of 1 kHz; a whole-block crossing rate would read ~950 Hz
        let sr = 48000.0;
        let samples = (0..504).map(|i| (2.0 * std::f32::consts::PI * 1000.0 * (i as f32 + 0.5) / sr).sin());
        let f = detect_pitch(samples, sr);
        assert!((f - 1000.0).abs() < 10.0, "detected {f}");
    }

    #[test]
    fn test_detect_pitch_needs_two_crossings() {
        assert_eq!(detect_pitch([0.5, 0.4, 0.3].into_iter(), 48000.0), 0.0);
        assert_eq!(detect_pitch([0.5, -0.4, -0.3].into_iter(), 48000.0), 0.0);
    }

    #[test]
    fn test_ratio_on_pitch_is_unity() {
        assert!((correction_ratio(440.0) - 1.0).abs() < 1e-4);
        assert_eq!(correction_ratio(0.0), 1.0);
        // 31 cents sharp of A4 pulls back down
        assert!(correction_ratio(448.0) < 1.0);
    }

    #[test]
    fn test_zero_strength_is_transparent() {
        let mut tuner = PitchCorrectionEffect::new();
        tuner.set_strength(0.0);
        let mono: Vec<f32> = (0..512).map(|i| (i as f32 * 0.37).sin()).collect();
        let mut buffer = StereoBuffer::from_mono(&mono);
        tuner.process(&mut buffer);
        for (i, s) in buffer.iter().enumerate() {
            assert_eq!(s.left, mono[i]);
        }
    }

    #[test]
    fn test_read_frac_holds_last_sample() {
        let s = [0.0, 1.0, 2.0];
        assert_eq!(read_frac(&s, 0.5), 0.5);
        assert_eq!(read_frac(&s, 7.0), 2.0);
    }
}
