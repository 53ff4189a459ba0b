//! Stereo feedback delay
//!
//! The delay line is sized for the maximum delay time at the prepared sample
//! rate, so changing the time never allocates.

use crate::effect::{Effect, EffectInfo, ParamRange};
use crate::types::{StereoBuffer, SAMPLE_RATE};

pub const TIME_MS: ParamRange = ParamRange::new(10.0, 2000.0, 250.0);
pub const FEEDBACK: ParamRange = ParamRange::new(0.0, 0.9, 0.3);
pub const WET: ParamRange = ParamRange::new(0.0, 1.0, 0.3);

static INFO: EffectInfo = EffectInfo::new("Delay", "Delay");

/// Circular stereo delay buffer
struct DelayLine {
    buffer_l: Vec<f32>,
    buffer_r: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    fn new(max_samples: usize) -> Self {
        let len = max_samples.max(1);
        Self {
            buffer_l: vec![0.0; len],
            buffer_r: vec![0.0; len],
            write_pos: 0,
        }
    }

    /// Read the sample written `delay` samples ago
    #[inline]
    fn read(&self, delay: usize) -> (f32, f32) {
        let len = self.buffer_l.len();
        let read_pos = (self.write_pos + len - delay.min(len - 1)) % len;
        (self.buffer_l[read_pos], self.buffer_r[read_pos])
    }

    #[inline]
    fn write(&mut self, left: f32, right: f32) {
        self.buffer_l[self.write_pos] = left;
        self.buffer_r[self.write_pos] = right;
        self.write_pos = (self.write_pos + 1) % self.buffer_l.len();
    }

    fn reset(&mut self) {
        self.buffer_l.fill(0.0);
        self.buffer_r.fill(0.0);
        self.write_pos = 0;
    }
}

/// Echo delay: `out = dry + delayed * wet`, the line is fed `in + delayed * feedback`
pub struct DelayEffect {
    time_ms: f32,
    feedback: f32,
    wet: f32,
    sample_rate: f32,
    line: DelayLine,
}

impl DelayEffect {
    pub fn new() -> Self {
        let sample_rate = SAMPLE_RATE as f32;
        Self {
            time_ms: TIME_MS.default,
            feedback: FEEDBACK.default,
            wet: WET.default,
            sample_rate,
            line: DelayLine::new(Self::capacity_for(sample_rate)),
        }
    }

    fn capacity_for(sample_rate: f32) -> usize {
        (TIME_MS.max * 0.001 * sample_rate).ceil() as usize + 1
    }

    /// Push the current parameter values (called once per block)
    pub fn set_params(&mut self, time_ms: f32, feedback: f32, wet: f32) {
        self.time_ms = TIME_MS.clamp(time_ms);
        self.feedback = FEEDBACK.clamp(feedback);
        self.wet = WET.clamp(wet);
    }

    fn delay_samples(&self) -> usize {
        ((self.time_ms * 0.001 * self.sample_rate).round() as usize).max(1)
    }
}

impl Default for DelayEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for DelayEffect {
    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.line = DelayLine::new(Self::capacity_for(sample_rate));
    }

    fn process(&mut self, buffer: &mut StereoBuffer) {
        let delay = self.delay_samples();
        let (feedback, wet) = (self.feedback, self.wet);

        for sample in buffer.iter_mut() {
            let (dl, dr) = self.line.read(delay);
            self.line.write(sample.left + dl * feedback, sample.right + dr * feedback);
            sample.left += dl * wet;
            sample.right += dr * wet;
        }
    }

    fn reset(&mut self) {
        self.line.reset();
    }

    fn info(&self) -> &EffectInfo {
        &INFO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StereoSample;

    fn impulse(len: usize) -> StereoBuffer {
        let mut buffer = StereoBuffer::silence(len);
        buffer[0] = StereoSample::new(1.0, 1.0);
        buffer
    }

    #[test]
    fn test_delay_dry() {
        let mut delay = DelayEffect::new();
        delay.set_params(10.0, 0.0, 0.0);

        let mut buffer = impulse(2048);
        delay.process(&mut buffer);

        assert_eq!(buffer[0].left, 1.0);
        assert!(buffer.as_slice()[1..].iter().all(|s| s.peak() == 0.0));
    }

    #[test]
    fn test_delay_echo_position() {
        let mut delay = DelayEffect::new();
        delay.prepare(48000.0);
        // 10ms at 48kHz = 480 samples
        delay.set_params(10.0, 0.0, 1.0);

        let mut buffer = impulse(2048);
        delay.process(&mut buffer);

        assert_eq!(buffer[0].left, 1.0);
        assert!((buffer[480].left - 1.0).abs() < 1e-6);
        assert_eq!(buffer[479].left, 0.0);
        // No feedback, so no second repeat
        assert_eq!(buffer[960].left, 0.0);
    }

    #[test]
    fn test_delay_feedback_repeats() {
        let mut delay = DelayEffect::new();
        delay.prepare(48000.0);
        delay.set_params(10.0, 0.5, 1.0);

        let mut buffer = impulse(2048);
        delay.process(&mut buffer);

        assert!((buffer[480].left - 1.0).abs() < 1e-6);
        assert!((buffer[960].left - 0.5).abs() < 1e-6);
        assert!((buffer[1440].left - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_delay_params_clamped() {
        let mut delay = DelayEffect::new();
        delay.set_params(5000.0, 2.0, -1.0);
        assert_eq!(delay.time_ms, 2000.0);
        assert_eq!(delay.feedback, 0.9);
        assert_eq!(delay.wet, 0.0);

        delay.set_params(1.0, 0.3, 0.3);
        assert_eq!(delay.time_ms, 10.0);
    }

    #[test]
    fn test_delay_reset() {
        let mut delay = DelayEffect::new();
        delay.set_params(10.0, 0.8, 1.0);
        let mut buffer = impulse(256);
        delay.process(&mut buffer);

        delay.reset();
        let mut buffer = StereoBuffer::silence(2048);
        delay.process(&mut buffer);
        assert_eq!(buffer.peak(), 0.0);
    }
}
