//! Effect system - the stage trait and parameter ranges
//!
//! Every processing stage in a channel or bus chain implements [`Effect`].
//! Chains are static: each one holds its stages as concrete fields in a fixed
//! order and wraps every call in a [`Stage`] guard, so disabling a stage turns
//! it into a pass-through without changing the shape of the chain.
//!
//! Stage parameters are pushed in by the owning chain once per block, from
//! the atomic parameter blocks in [`crate::engine::params`]. Effects
//! themselves hold plain values and are owned by the audio thread.

pub mod native;

use crate::types::StereoBuffer;

/// Documented range and default of a scalar parameter
///
/// Setters clamp with [`ParamRange::clamp`] at the point of mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    /// Clamp a value into the range (NaN maps to the default)
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }
}

/// Information about an effect
#[derive(Debug, Clone)]
pub struct EffectInfo {
    /// Effect name for display and logs
    pub name: &'static str,
    /// Effect category (e.g., "Dynamics", "EQ", "Reverb")
    pub category: &'static str,
}

impl EffectInfo {
    pub const fn new(name: &'static str, category: &'static str) -> Self {
        Self { name, category }
    }
}

/// The core effect trait - implemented by every processing stage
///
/// Effects process stereo blocks in place. `prepare` is called from
/// [`crate::engine::RoutingEngine::prepare`] before the first block and again
/// whenever the sample rate changes; it may allocate. `process` and `reset`
/// run on the audio thread and must not.
pub trait Effect: Send {
    /// Recompute sample-rate dependent state
    fn prepare(&mut self, sample_rate: f32);

    /// Process a stereo buffer in-place
    fn process(&mut self, buffer: &mut StereoBuffer);

    /// Clear internal state (filter memories, envelopes, delay lines)
    fn reset(&mut self);

    /// Get information about this effect
    fn info(&self) -> &EffectInfo;

    /// Processing latency in samples
    fn latency_samples(&self) -> u32 {
        0
    }
}

/// Enable guard around a chain stage
///
/// A disabled stage is skipped, so its output equals its input. When a
/// stage comes back on its state is reset first, so a filter does not ring
/// out memory from before it was switched off.
pub struct Stage<E: Effect> {
    effect: E,
    was_enabled: bool,
}

impl<E: Effect> Stage<E> {
    pub fn new(effect: E) -> Self {
        Self {
            effect,
            was_enabled: true,
        }
    }

    /// Run the stage if `enabled`, otherwise pass the buffer through
    #[inline]
    pub fn run(&mut self, enabled: bool, buffer: &mut StereoBuffer) {
        if enabled {
            if !self.was_enabled {
                self.effect.reset();
            }
            self.effect.process(buffer);
        }
        self.was_enabled = enabled;
    }

    pub fn effect(&self) -> &E {
        &self.effect
    }

    pub fn effect_mut(&mut self) -> &mut E {
        &mut self.effect
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.effect.prepare(sample_rate);
    }

    pub fn reset(&mut self) {
        self.effect.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::native::GainEffect;
    use super::*;
    use crate::types::StereoSample;

    #[test]
    fn test_param_range_clamp() {
        let range = ParamRange::new(-24.0, 24.0, 0.0);
        assert_eq!(range.clamp(999.0), 24.0);
        assert_eq!(range.clamp(-999.0), -24.0);
        assert_eq!(range.clamp(3.5), 3.5);
        assert_eq!(range.clamp(f32::NAN), 0.0);
    }

    #[test]
    fn test_disabled_stage_is_transparent() {
        let mut stage = Stage::new(GainEffect::new());
        stage.effect_mut().set_gain_db(-12.0);

        let mut buffer = StereoBuffer::from_channels(&[0.8; 4], &[-0.3; 4]);

        stage.run(false, &mut buffer);
        assert!(buffer.iter().all(|s| *s == StereoSample::new(0.8, -0.3)));

        // Gain ramps across the block and lands on the target
        stage.run(true, &mut buffer);
        assert!((buffer[3].left - 0.8 * 0.2512).abs() < 0.001);
    }
}
