//! Gain effect - trim and output level

use crate::effect::{Effect, EffectInfo};
use crate::types::{db_to_gain, StereoBuffer};

static INFO: EffectInfo = EffectInfo::new("Gain", "Utility");

/// A simple gain stage used for channel trim and bus output level
///
/// Gain changes are ramped linearly across one block so that a moving
/// fader does not produce zipper noise. This effect has zero latency.
pub struct GainEffect {
    /// Target gain (linear)
    gain: f32,
    /// Gain applied at the end of the previous block
    current: f32,
}

impl GainEffect {
    pub fn new() -> Self {
        Self {
            gain: 1.0,
            current: 1.0,
        }
    }

    /// Set the target gain in dB
    pub fn set_gain_db(&mut self, db: f32) {
        self.gain = db_to_gain(db);
    }

    /// Set the target gain as a linear factor
    pub fn set_gain_linear(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl Default for GainEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for GainEffect {
    fn prepare(&mut self, _sample_rate: f32) {
        self.current = self.gain;
    }

    fn process(&mut self, buffer: &mut StereoBuffer) {
        let target = self.gain;
        if (target - self.current).abs() < 1e-6 || buffer.is_empty() {
            self.current = target;
            if target != 1.0 {
                buffer.scale(target);
            }
            return;
        }

        let step = (target - self.current) / buffer.len() as f32;
        let mut g = self.current;
        for sample in buffer.iter_mut() {
            g += step;
            *sample *= g;
        }
        self.current = target;
    }

    fn reset(&mut self) {
        self.current = self.gain;
    }

    fn info(&self) -> &EffectInfo {
        &INFO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StereoSample;

    #[test]
    fn test_gain_effect_unity() {
        let mut effect = GainEffect::new();

        let mut buffer = StereoBuffer::silence(4);
        buffer[0] = StereoSample::new(1.0, 1.0);
        buffer[1] = StereoSample::new(0.5, 0.5);

        effect.process(&mut buffer);

        assert!((buffer[0].left - 1.0).abs() < 0.001);
        assert!((buffer[1].left - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_gain_ramps_then_settles() {
        let mut effect = GainEffect::new();
        effect.set_gain_db(-6.0206);

        let mut buffer = StereoBuffer::from_mono(&[1.0; 64]);
        effect.process(&mut buffer);

        // Ramp ends exactly on the target
        assert!((buffer[63].left - 0.5).abs() < 0.001);
        assert!(buffer[0].left > buffer[63].left);

        let mut buffer = StereoBuffer::from_mono(&[1.0; 8]);
        effect.process(&mut buffer);
        assert!(buffer.iter().all(|s| (s.left - 0.5).abs() < 0.001));
    }
}
