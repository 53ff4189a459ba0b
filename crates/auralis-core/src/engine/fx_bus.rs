//! Effect-send bus: reverb → delay in series
//!
//! The input is the weighted sum of every channel sending to this bus. With
//! the whole bus bypassed, or with both stages off, it passes straight
//! through.

use std::sync::Arc;

use super::params::FxBusParams;
use crate::effect::native::{DelayEffect, ReverbEffect};
use crate::effect::{Effect, Stage};
use crate::types::{StereoBuffer, MAX_BLOCK_SIZE};

pub struct FxBus {
    params: Arc<FxBusParams>,
    reverb: Stage<ReverbEffect>,
    delay: Stage<DelayEffect>,
    buffer: StereoBuffer,
}

impl FxBus {
    pub fn new(params: Arc<FxBusParams>) -> Self {
        Self {
            params,
            reverb: Stage::new(ReverbEffect::new()),
            delay: Stage::new(DelayEffect::new()),
            buffer: StereoBuffer::silence(MAX_BLOCK_SIZE),
        }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.reverb.prepare(sample_rate);
        self.delay.prepare(sample_rate);
    }

    pub fn reset(&mut self) {
        self.reverb.reset();
        self.delay.reset();
    }

    pub fn begin_block(&mut self, frames: usize) {
        self.buffer.set_len_from_capacity(frames);
        self.buffer.fill_silence();
    }

    /// Add a channel's output at its send level
    pub fn send(&mut self, channel_out: &StereoBuffer, level: f32) {
        self.buffer.add_scaled(channel_out, level);
    }

    pub fn process(&mut self) {
        let p = &*self.params;
        let active = !p.bypass();

        self.reverb
            .effect_mut()
            .set_params(p.reverb_room_size(), p.reverb_damping(), p.reverb_width(), p.reverb_wet());
        self.reverb.run(active && p.reverb_enabled(), &mut self.buffer);

        self.delay
            .effect_mut()
            .set_params(p.delay_time_ms(), p.delay_feedback(), p.delay_wet());
        self.delay.run(active && p.delay_enabled(), &mut self.buffer);
    }

    pub fn output(&self) -> &StereoBuffer {
        &self.buffer
    }
}
