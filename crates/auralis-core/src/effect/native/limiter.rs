//! Lookahead peak limiter for the master bus
//!
//! Input is delayed by 1.5 ms while a per-sample target gain is written to a
//! parallel ring. The smoothed gain tracks the minimum target over the
//! lookahead window, so reduction is in place before a peak leaves the delay.
//! Release uses a 100 ms time constant.
//!
//! The limiter only ever reduces gain. Below the ceiling the output is the
//! delayed input, unchanged.

use crate::effect::{Effect, EffectInfo, ParamRange};
use crate::types::{db_to_gain, StereoBuffer, SAMPLE_RATE};

/// Ceiling in dBFS
pub const CEILING_DB: ParamRange = ParamRange::new(-12.0, 0.0, -1.0);

/// Ring size; covers 1.5 ms up to ~680 kHz
const MAX_DELAY: usize = 1024;

const LOOKAHEAD_SECS: f32 = 0.0015;
const RELEASE_SECS: f32 = 0.1;

static INFO: EffectInfo = EffectInfo::new("Limiter", "Dynamics");

pub struct LimiterEffect {
    ceiling_db: f32,
    /// Ceiling as linear amplitude
    threshold: f32,
    lookahead: usize,

    delay: [[f32; MAX_DELAY]; 2],
    target_gains: [f32; MAX_DELAY],
    write_pos: usize,

    gain: f32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Deepest reduction during the last block (dB, >= 0)
    block_reduction_db: f32,
}

impl LimiterEffect {
    pub fn new() -> Self {
        let mut limiter = Self {
            ceiling_db: CEILING_DB.default,
            threshold: db_to_gain(CEILING_DB.default),
            lookahead: 1,
            delay: [[0.0; MAX_DELAY]; 2],
            target_gains: [1.0; MAX_DELAY],
            write_pos: 0,
            gain: 1.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            block_reduction_db: 0.0,
        };
        limiter.update_timing(SAMPLE_RATE as f32);
        limiter
    }

    pub fn set_ceiling_db(&mut self, db: f32) {
        let db = CEILING_DB.clamp(db);
        if db != self.ceiling_db {
            self.ceiling_db = db;
            self.threshold = db_to_gain(db);
        }
    }

    pub fn ceiling_db(&self) -> f32 {
        self.ceiling_db
    }

    pub fn gain_reduction_db(&self) -> f32 {
        self.block_reduction_db
    }

    fn update_timing(&mut self, sample_rate: f32) {
        self.lookahead = ((LOOKAHEAD_SECS * sample_rate).round() as usize).clamp(1, MAX_DELAY - 1);
        // 99% convergence within the lookahead: coeff^N = 0.01
        self.attack_coeff = (-4.605_17 / self.lookahead as f32).exp();
        self.release_coeff = (-1.0 / (RELEASE_SECS * sample_rate)).exp();
    }

    #[inline]
    fn window_min_gain(&self) -> f32 {
        (0..self.lookahead)
            .map(|i| self.target_gains[(self.write_pos + MAX_DELAY - i) % MAX_DELAY])
            .fold(1.0, f32::min)
    }
}

impl Default for LimiterEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for LimiterEffect {
    fn prepare(&mut self, sample_rate: f32) {
        self.update_timing(sample_rate);
        self.reset();
    }

    fn process(&mut self, buffer: &mut StereoBuffer) {
        let mut min_gain_seen = 1.0f32;

        for sample in buffer.iter_mut() {
            let peak = sample.peak();
            self.target_gains[self.write_pos] = if peak > self.threshold {
                self.threshold / peak
            } else {
                1.0
            };

            let min_gain = self.window_min_gain();
            let coeff = if min_gain < self.gain {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.gain = self.gain * coeff + min_gain * (1.0 - coeff);
            min_gain_seen = min_gain_seen.min(self.gain);

            let read_pos = (self.write_pos + MAX_DELAY - self.lookahead) % MAX_DELAY;
            let out_left = self.delay[0][read_pos] * self.gain;
            let out_right = self.delay[1][read_pos] * self.gain;

            self.delay[0][self.write_pos] = sample.left;
            self.delay[1][self.write_pos] = sample.right;

            sample.left = out_left;
            sample.right = out_right;

            self.write_pos = (self.write_pos + 1) % MAX_DELAY;
        }

        self.block_reduction_db = -20.0 * min_gain_seen.max(1e-5).log10();
    }

    fn reset(&mut self) {
        self.delay = [[0.0; MAX_DELAY]; 2];
        self.target_gains = [1.0; MAX_DELAY];
        self.write_pos = 0;
        self.gain = 1.0;
        self.block_reduction_db = 0.0;
    }

    fn info(&self) -> &EffectInfo {
        &INFO
    }

    fn latency_samples(&self) -> u32 {
        self.lookahead as u32
    }
}
