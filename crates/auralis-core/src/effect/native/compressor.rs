//! Feed-forward compressor
//!
//! Shared by the channel strip, the group bus glue stage and each band of
//! the master multiband compressor.

use super::gate::time_coeff;
use crate::effect::{Effect, EffectInfo, ParamRange};
use crate::types::{db_to_gain, gain_to_db, StereoBuffer, SAMPLE_RATE};

pub const THRESHOLD_DB: ParamRange = ParamRange::new(-60.0, 0.0, -18.0);
pub const RATIO: ParamRange = ParamRange::new(1.0, 20.0, 3.0);
pub const ATTACK_MS: ParamRange = ParamRange::new(0.1, 200.0, 10.0);
pub const RELEASE_MS: ParamRange = ParamRange::new(5.0, 2000.0, 150.0);

static INFO: EffectInfo = EffectInfo::new("Compressor", "Dynamics");

/// Makeup gain mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Makeup {
    /// `-threshold * (1 - 1/ratio)`
    Auto,
    /// Fixed makeup in dB
    Fixed(f32),
}

/// Automatic makeup gain for a threshold/ratio pair
#[inline]
pub fn auto_makeup_db(threshold_db: f32, ratio: f32) -> f32 {
    -threshold_db * (1.0 - 1.0 / ratio)
}

/// Stereo-linked compressor with a log-domain smoothed gain computer
pub struct CompressorEffect {
    threshold_db: f32,
    ratio: f32,
    attack_ms: f32,
    release_ms: f32,
    makeup: Makeup,
    sample_rate: f32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Smoothed gain reduction in dB (>= 0)
    reduction_db: f32,
    /// Largest reduction seen during the last block
    block_reduction_db: f32,
}

impl CompressorEffect {
    pub fn new() -> Self {
        let mut comp = Self {
            threshold_db: THRESHOLD_DB.default,
            ratio: RATIO.default,
            attack_ms: ATTACK_MS.default,
            release_ms: RELEASE_MS.default,
            makeup: Makeup::Auto,
            sample_rate: SAMPLE_RATE as f32,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            reduction_db: 0.0,
            block_reduction_db: 0.0,
        };
        comp.update_coeffs();
        comp
    }

    /// Compressor with fixed settings (glue and multiband stages)
    pub fn with_settings(threshold_db: f32, ratio: f32, attack_ms: f32, release_ms: f32, makeup: Makeup) -> Self {
        let mut comp = Self::new();
        comp.set_params(threshold_db, ratio, attack_ms, release_ms);
        comp.makeup = makeup;
        comp
    }

    /// Push the current parameter values (called once per block)
    pub fn set_params(&mut self, threshold_db: f32, ratio: f32, attack_ms: f32, release_ms: f32) {
        self.threshold_db = THRESHOLD_DB.clamp(threshold_db);
        self.ratio = RATIO.clamp(ratio);
        let attack_ms = ATTACK_MS.clamp(attack_ms);
        let release_ms = RELEASE_MS.clamp(release_ms);
        if attack_ms != self.attack_ms || release_ms != self.release_ms {
            self.attack_ms = attack_ms;
            self.release_ms = release_ms;
            self.update_coeffs();
        }
    }

    pub fn set_makeup(&mut self, makeup: Makeup) {
        self.makeup = makeup;
    }

    /// Gain reduction applied during the last processed block (dB, >= 0)
    pub fn gain_reduction_db(&self) -> f32 {
        self.block_reduction_db
    }

    fn update_coeffs(&mut self) {
        self.attack_coeff = time_coeff(self.sample_rate, self.attack_ms);
        self.release_coeff = time_coeff(self.sample_rate, self.release_ms);
    }

    fn makeup_db(&self) -> f32 {
        match self.makeup {
            Makeup::Auto => auto_makeup_db(self.threshold_db, self.ratio),
            Makeup::Fixed(db) => db,
        }
    }
}

impl Default for CompressorEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for CompressorEffect {
    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coeffs();
        self.reset();
    }

    fn process(&mut self, buffer: &mut StereoBuffer) {
        let slope = 1.0 - 1.0 / self.ratio;
        let makeup_db = self.makeup_db();
        let mut block_max = 0.0f32;

        for sample in buffer.iter_mut() {
            let level_db = gain_to_db(sample.peak());
            let over = level_db - self.threshold_db;
            let target = if over > 0.0 { over * slope } else { 0.0 };

            let coeff = if target > self.reduction_db {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.reduction_db = coeff * self.reduction_db + (1.0 - coeff) * target;
            block_max = block_max.max(self.reduction_db);

            *sample *= db_to_gain(makeup_db - self.reduction_db);
        }

        self.block_reduction_db = block_max;
    }

    fn reset(&mut self) {
        self.reduction_db = 0.0;
        self.block_reduction_db = 0.0;
    }

    fn info(&self) -> &EffectInfo {
        &INFO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_makeup_formula() {
        assert!((auto_makeup_db(-18.0, 3.0) - 12.0).abs() < 1e-5);
        assert_eq!(auto_makeup_db(-20.0, 1.0), 0.0);
    }

    #[test]
    fn test_steady_state_reduction() {
        // 0 dBFS square into -20 dB / 4:1 => 15 dB of reduction
        let mut comp = CompressorEffect::with_settings(-20.0, 4.0, 1.0, 50.0, Makeup::Fixed(0.0));
        comp.prepare(48000.0);

        let mut buffer = StereoBuffer::from_mono(&[1.0; 9600]);
        comp.process(&mut buffer);

        assert!((comp.gain_reduction_db() - 15.0).abs() < 0.1);
        let out = buffer[9599].left;
        assert!((gain_to_db(out) + 15.0).abs() < 0.1, "out {out}");
    }

    #[test]
    fn test_below_threshold_only_makeup() {
        let mut comp = CompressorEffect::with_settings(-10.0, 2.0, 10.0, 100.0, Makeup::Auto);
        comp.prepare(48000.0);

        // -40 dBFS never crosses the threshold
        let mut buffer = StereoBuffer::from_mono(&[0.01; 1024]);
        comp.process(&mut buffer);

        assert_eq!(comp.gain_reduction_db(), 0.0);
        let expected = 0.01 * db_to_gain(5.0);
        assert!((buffer[512].left - expected).abs() < 1e-5);
    }

    #[test]
    fn test_params_clamped() {
        let mut comp = CompressorEffect::new();
        comp.set_params(-100.0, 50.0, 0.0, 9999.0);
        assert_eq!(comp.threshold_db, -60.0);
        assert_eq!(comp.ratio, 20.0);
        assert_eq!(comp.attack_ms, 0.1);
        assert_eq!(comp.release_ms, 2000.0);
    }
}
