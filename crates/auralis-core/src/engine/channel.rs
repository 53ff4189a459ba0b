//! Channel strip
//!
//! Fixed chain: trim → gate → 4-band EQ → compressor → pitch correction.

use std::sync::Arc;

use super::params::ChannelParams;
use crate::effect::native::{ChannelEq, CompressorEffect, GainEffect, GateEffect, Makeup, PitchCorrectionEffect};
use crate::effect::{Effect, Stage};
use crate::types::{StereoBuffer, MAX_BLOCK_SIZE};

/// Audio-thread side of one input channel
pub struct ChannelStrip {
    params: Arc<ChannelParams>,
    trim: GainEffect,
    gate: Stage<GateEffect>,
    eq: Stage<ChannelEq>,
    comp: Stage<CompressorEffect>,
    tuner: Stage<PitchCorrectionEffect>,
    /// Input on entry, processed output after [`ChannelStrip::process`]
    buffer: StereoBuffer,
}

impl ChannelStrip {
    pub fn new(params: Arc<ChannelParams>) -> Self {
        Self {
            params,
            trim: GainEffect::new(),
            gate: Stage::new(GateEffect::new()),
            eq: Stage::new(ChannelEq::channel()),
            comp: Stage::new(CompressorEffect::new()),
            tuner: Stage::new(PitchCorrectionEffect::new()),
            buffer: StereoBuffer::silence(MAX_BLOCK_SIZE),
        }
    }

    pub fn params(&self) -> &Arc<ChannelParams> {
        &self.params
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.trim.set_gain_db(self.params.trim_db());
        self.trim.prepare(sample_rate);
        self.gate.prepare(sample_rate);
        self.eq.prepare(sample_rate);
        self.comp.prepare(sample_rate);
        self.tuner.prepare(sample_rate);
    }

    pub fn reset(&mut self) {
        self.trim.reset();
        self.gate.reset();
        self.eq.reset();
        self.comp.reset();
        self.tuner.reset();
    }

    /// Working buffer; the engine writes the block's input here
    pub fn buffer_mut(&mut self) -> &mut StereoBuffer {
        &mut self.buffer
    }

    pub fn output(&self) -> &StereoBuffer {
        &self.buffer
    }

    /// Run the chain over the working buffer
    pub fn process(&mut self) {
        let p = &*self.params;

        self.trim.set_gain_db(p.trim_db());
        self.trim.process(&mut self.buffer);

        self.gate.effect_mut().set_params(
            p.gate_threshold_db(),
            p.gate_ratio(),
            p.gate_attack_ms(),
            p.gate_release_ms(),
        );
        self.gate.run(p.gate_enabled(), &mut self.buffer);

        self.eq.effect_mut().set_gains(p.eq_gains());
        self.eq.run(p.eq_enabled(), &mut self.buffer);

        let comp = self.comp.effect_mut();
        comp.set_params(p.comp_threshold_db(), p.comp_ratio(), p.comp_attack_ms(), p.comp_release_ms());
        comp.set_makeup(if p.comp_auto_makeup() {
            Makeup::Auto
        } else {
            Makeup::Fixed(0.0)
        });
        self.comp.run(p.comp_enabled(), &mut self.buffer);

        self.tuner.effect_mut().set_strength(p.tuner_strength());
        self.tuner.run(p.tuner_enabled(), &mut self.buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::db_to_gain;

    fn strip_with_all_stages_off() -> ChannelStrip {
        let params = Arc::new(ChannelParams::new(0));
        params.set_gate_enabled(false);
        params.set_eq_enabled(false);
        params.set_comp_enabled(false);
        params.set_tuner_enabled(false);
        let mut strip = ChannelStrip::new(params);
        strip.prepare(48000.0);
        strip
    }

    fn load(strip: &mut ChannelStrip, mono: &[f32]) {
        let buffer = strip.buffer_mut();
        buffer.set_len_from_capacity(mono.len());
        for (dst, &x) in buffer.iter_mut().zip(mono) {
            dst.left = x;
            dst.right = x;
        }
    }

    #[test]
    fn test_disabled_chain_is_transparent() {
        let mut strip = strip_with_all_stages_off();
        let mono: Vec<f32> = (0..512).map(|i| ((i % 17) as f32 / 17.0) - 0.5).collect();
        load(&mut strip, &mono);
        strip.process();

        for (s, &x) in strip.output().iter().zip(&mono) {
            assert_eq!(s.left, x);
            assert_eq!(s.right, x);
        }
    }

    #[test]
    fn test_trim_applies_from_next_block() {
        let mut strip = strip_with_all_stages_off();
        strip.params().set_trim_db(-6.0);

        load(&mut strip, &[0.5; 256]);
        strip.process();
        // Second block has settled on the new gain
        load(&mut strip, &[0.5; 256]);
        strip.process();

        let expected = 0.5 * db_to_gain(-6.0);
        assert!((strip.output()[100].left - expected).abs() < 1e-5);
    }

    #[test]
    fn test_gate_attenuates_quiet_input() {
        let mut strip = strip_with_all_stages_off();
        strip.params().set_gate_enabled(true);
        strip.params().set_gate_threshold_db(-20.0);
        strip.params().set_gate_ratio(10.0);

        // -40 dBFS sits 20 dB under the threshold: (−20)·(1 − 1/10) = −18 dB
        load(&mut strip, &[0.01; 4096]);
        strip.process();
        let expected = 0.01 * db_to_gain(-18.0);
        assert!((strip.output()[4095].left - expected).abs() < 1e-4);
    }
}
