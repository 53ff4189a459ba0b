//! Noise gate - downward expander driven by a power envelope follower

use crate::effect::{Effect, EffectInfo, ParamRange};
use crate::types::{db_to_gain, StereoBuffer, SAMPLE_RATE};

pub const THRESHOLD_DB: ParamRange = ParamRange::new(-80.0, 0.0, -50.0);
pub const RATIO: ParamRange = ParamRange::new(1.0, 20.0, 2.0);
pub const ATTACK_MS: ParamRange = ParamRange::new(0.1, 100.0, 5.0);
pub const RELEASE_MS: ParamRange = ParamRange::new(5.0, 1000.0, 50.0);

/// Deepest attenuation the gate applies
const MAX_ATTENUATION_DB: f32 = -80.0;

static INFO: EffectInfo = EffectInfo::new("Gate", "Dynamics");

/// One-pole smoothing coefficient for a time constant
#[inline]
pub(crate) fn time_coeff(sample_rate: f32, time_ms: f32) -> f32 {
    let seconds = (time_ms / 1000.0).max(1e-5);
    (-1.0 / (sample_rate * seconds)).exp()
}

/// Downward expander
///
/// The envelope tracks the squared, stereo-linked signal with separate
/// attack and release coefficients. Whenever the envelope sits below the
/// threshold the signal is attenuated by `(env_db - threshold) * (1 - 1/ratio)`.
pub struct GateEffect {
    threshold_db: f32,
    ratio: f32,
    attack_ms: f32,
    release_ms: f32,
    sample_rate: f32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Power envelope (linear, squared amplitude)
    envelope: f32,
}

impl GateEffect {
    pub fn new() -> Self {
        let mut gate = Self {
            threshold_db: THRESHOLD_DB.default,
            ratio: RATIO.default,
            attack_ms: ATTACK_MS.default,
            release_ms: RELEASE_MS.default,
            sample_rate: SAMPLE_RATE as f32,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
        };
        gate.update_coeffs();
        gate
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

    fn update_coeffs(&mut self) {
        self.attack_coeff = time_coeff(self.sample_rate, self.attack_ms);
        self.release_coeff = time_coeff(self.sample_rate, self.release_ms);
    }

    /// Gain (dB) for an envelope level in dB
    #[inline]
    fn gain_db(&self, env_db: f32) -> f32 {
        if env_db >= self.threshold_db {
            return 0.0;
        }
        ((env_db - self.threshold_db) * (1.0 - 1.0 / self.ratio)).max(MAX_ATTENUATION_DB)
    }
}

impl Default for GateEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for GateEffect {
    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coeffs();
        self.envelope = 0.0;
    }

    fn process(&mut self, buffer: &mut StereoBuffer) {
        if self.ratio <= 1.0 {
            return;
        }

        for sample in buffer.iter_mut() {
            let power = (sample.left * sample.left).max(sample.right * sample.right);
            let coeff = if power > self.envelope {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope = coeff * self.envelope + (1.0 - coeff) * power;

            let env_db = 10.0 * (self.envelope + 1e-12).log10();
            let gain = db_to_gain(self.gain_db(env_db));
            *sample *= gain;
        }
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn info(&self) -> &EffectInfo {
        &INFO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, len: usize) -> StereoBuffer {
        let mono: Vec<f32> = (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / 48000.0).sin())
            .collect();
        StereoBuffer::from_mono(&mono)
    }

    #[test]
    fn test_loud_signal_passes() {
        let mut gate = GateEffect::new();
        gate.prepare(48000.0);

        // -6 dBFS sine, far above the -50 dB threshold
        let mut buffer = sine(440.0, 0.5, 4800);
        let reference = buffer.clone();
        gate.process(&mut buffer);

        let tail = 2400..4800;
        for i in tail {
            assert!((buffer[i].left - reference[i].left).abs() < 1e-3);
        }
    }

    #[test]
    fn test_quiet_signal_is_attenuated() {
        let mut gate = GateEffect::new();
        gate.prepare(48000.0);
        gate.set_params(-30.0, 4.0, 5.0, 50.0);

        // -60 dBFS sine, 30 dB under threshold => ~22 dB of attenuation
        let mut buffer = sine(440.0, 0.001, 9600);
        gate.process(&mut buffer);

        let out_peak = buffer.as_slice()[4800..]
            .iter()
            .map(|s| s.peak())
            .fold(0.0, f32::max);
        assert!(out_peak < 0.001 * 0.2, "peak {out_peak}");
    }

    #[test]
    fn test_ratio_one_is_transparent() {
        let mut gate = GateEffect::new();
        gate.prepare(48000.0);
        gate.set_params(0.0, 1.0, 5.0, 50.0);

        let mut buffer = sine(100.0, 0.01, 512);
        let reference = buffer.clone();
        gate.process(&mut buffer);
        assert_eq!(buffer.as_slice(), reference.as_slice());
    }

    #[test]
    fn test_coeff_formula() {
        let c = time_coeff(48000.0, 10.0);
        assert!((c - (-1.0f32 / 480.0).exp()).abs() < 1e-6);
    }
}
