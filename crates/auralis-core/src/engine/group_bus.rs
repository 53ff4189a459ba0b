//! Group bus: 3-band EQ → glue compressor → output gain

use std::sync::Arc;

use super::params::GroupBusParams;
use crate::effect::native::{CompressorEffect, GainEffect, GroupEq, Makeup};
use crate::effect::{Effect, Stage};
use crate::types::{StereoBuffer, MAX_BLOCK_SIZE};

/// Glue compressor settings (fixed)
const GLUE_THRESHOLD_DB: f32 = -20.0;
const GLUE_RATIO: f32 = 2.0;
const GLUE_ATTACK_MS: f32 = 10.0;
const GLUE_RELEASE_MS: f32 = 200.0;
const GLUE_MAKEUP_DB: f32 = 2.0;

pub struct GroupBus {
    params: Arc<GroupBusParams>,
    eq: Stage<GroupEq>,
    glue: Stage<CompressorEffect>,
    output: GainEffect,
    /// Sum of every channel routed here during the current block
    buffer: StereoBuffer,
}

impl GroupBus {
    pub fn new(params: Arc<GroupBusParams>) -> Self {
        Self {
            params,
            eq: Stage::new(GroupEq::group()),
            glue: Stage::new(CompressorEffect::with_settings(
                GLUE_THRESHOLD_DB,
                GLUE_RATIO,
                GLUE_ATTACK_MS,
                GLUE_RELEASE_MS,
                Makeup::Fixed(GLUE_MAKEUP_DB),
            )),
            output: GainEffect::new(),
            buffer: StereoBuffer::silence(MAX_BLOCK_SIZE),
        }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.eq.prepare(sample_rate);
        self.glue.prepare(sample_rate);
        self.output.set_gain_linear(self.params.output_gain());
        self.output.prepare(sample_rate);
    }

    pub fn reset(&mut self) {
        self.eq.reset();
        self.glue.reset();
        self.output.reset();
    }

    /// Clear the accumulator and size it for the coming block
    pub fn begin_block(&mut self, frames: usize) {
        self.buffer.set_len_from_capacity(frames);
        self.buffer.fill_silence();
    }

    pub fn accumulate(&mut self, channel_out: &StereoBuffer) {
        self.buffer.add_buffer(channel_out);
    }

    pub fn process(&mut self) {
        let p = &*self.params;

        self.eq.effect_mut().set_gains(p.eq_gains());
        self.eq.run(p.eq_enabled(), &mut self.buffer);

        let comp_enabled = p.comp_enabled();
        self.glue.run(comp_enabled, &mut self.buffer);
        p.report_gain_reduction(if comp_enabled {
            self.glue.effect().gain_reduction_db()
        } else {
            0.0
        });

        self.output.set_gain_linear(p.output_gain());
        self.output.process(&mut self.buffer);
    }

    pub fn output(&self) -> &StereoBuffer {
        &self.buffer
    }
}
