//! Master bus: multiband compressor → peak limiter → loudness meter
//!
//! ```text
//!            ┌─ low  (<200 Hz)  ─ comp ─┐
//! in ─ xover ┼─ mid             ─ comp ─┼─ Σ ─ limiter ─ meter ─ out
//!            └─ high (>2 kHz)   ─ comp ─┘
//! ```

use std::sync::Arc;

use super::command::MeterSinkBox;
use super::loudness::LoudnessMeter;
use super::params::MasterParams;
use crate::effect::native::{CompressorEffect, LimiterEffect, Makeup, ThreeBandCrossover, CROSSOVER_BANDS};
use crate::effect::{Effect, EffectInfo, Stage};
use crate::types::{StereoBuffer, MAX_BLOCK_SIZE};

/// Per-band compressor settings
const BAND_THRESHOLD_DB: f32 = -18.0;
const BAND_RATIO: f32 = 2.5;
const BAND_ATTACK_MS: f32 = 10.0;
const BAND_RELEASE_MS: f32 = 150.0;

static MULTIBAND_INFO: EffectInfo = EffectInfo::new("Multiband Compressor", "Dynamics");

/// Three bands, each compressed independently, then summed
pub struct MultibandCompressor {
    crossover: ThreeBandCrossover,
    bands: [StereoBuffer; CROSSOVER_BANDS],
    comps: [CompressorEffect; CROSSOVER_BANDS],
}

impl MultibandCompressor {
    pub fn new() -> Self {
        Self {
            crossover: ThreeBandCrossover::new(),
            bands: std::array::from_fn(|_| StereoBuffer::silence(MAX_BLOCK_SIZE)),
            comps: std::array::from_fn(|_| {
                CompressorEffect::with_settings(
                    BAND_THRESHOLD_DB,
                    BAND_RATIO,
                    BAND_ATTACK_MS,
                    BAND_RELEASE_MS,
                    Makeup::Fixed(0.0),
                )
            }),
        }
    }

    /// Gain reduction of each band during the last block
    pub fn band_reduction_db(&self) -> [f32; CROSSOVER_BANDS] {
        std::array::from_fn(|band| self.comps[band].gain_reduction_db())
    }
}

impl Default for MultibandCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for MultibandCompressor {
    fn prepare(&mut self, sample_rate: f32) {
        self.crossover.prepare(sample_rate);
        for comp in &mut self.comps {
            comp.prepare(sample_rate);
        }
    }

    fn process(&mut self, buffer: &mut StereoBuffer) {
        self.crossover.process_buffer(buffer, &mut self.bands);
        for (band, comp) in self.bands.iter_mut().zip(self.comps.iter_mut()) {
            comp.process(band);
        }

        buffer.fill_silence();
        for band in &self.bands {
            buffer.add_buffer(band);
        }
    }

    fn reset(&mut self) {
        self.crossover.reset();
        for comp in &mut self.comps {
            comp.reset();
        }
    }

    fn info(&self) -> &EffectInfo {
        &MULTIBAND_INFO
    }
}

pub struct MasterBus {
    params: Arc<MasterParams>,
    multiband: Stage<MultibandCompressor>,
    limiter: Stage<LimiterEffect>,
    meter: LoudnessMeter,
    sink: Option<MeterSinkBox>,
    buffer: StereoBuffer,
}

impl MasterBus {
    pub fn new(params: Arc<MasterParams>) -> Self {
        Self {
            params,
            multiband: Stage::new(MultibandCompressor::new()),
            limiter: Stage::new(LimiterEffect::new()),
            meter: LoudnessMeter::new(),
            sink: None,
            buffer: StereoBuffer::silence(MAX_BLOCK_SIZE),
        }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.multiband.prepare(sample_rate);
        self.limiter.prepare(sample_rate);
        self.meter.prepare(sample_rate);
    }

    pub fn reset(&mut self) {
        self.multiband.reset();
        self.limiter.reset();
        self.meter.reset();
    }

    /// Swap the loudness sink, returning the old one
    ///
    /// The caller drops the returned value; `Owned` defers the free.
    pub fn replace_sink(&mut self, sink: Option<MeterSinkBox>) -> Option<MeterSinkBox> {
        std::mem::replace(&mut self.sink, sink)
    }

    /// Latency added by the limiter lookahead
    pub fn latency_samples(&self) -> u32 {
        if self.params.limiter_enabled() {
            self.limiter.effect().latency_samples()
        } else {
            0
        }
    }

    pub fn begin_block(&mut self, frames: usize) {
        self.buffer.set_len_from_capacity(frames);
        self.buffer.fill_silence();
    }

    pub fn accumulate(&mut self, bus_out: &StereoBuffer) {
        self.buffer.add_buffer(bus_out);
    }

    pub fn process(&mut self) {
        let p = &*self.params;

        self.multiband.run(p.compressor_enabled(), &mut self.buffer);

        let limiter_enabled = p.limiter_enabled();
        self.limiter.effect_mut().set_ceiling_db(p.ceiling_db());
        self.limiter.run(limiter_enabled, &mut self.buffer);

        let reading = self.meter.measure(&self.buffer);
        let reduction = if limiter_enabled {
            self.limiter.effect().gain_reduction_db()
        } else {
            0.0
        };
        p.report_meters(reading.lufs, reduction);

        if let Some(sink) = self.sink.as_mut() {
            sink.push(reading, &self.buffer);
        }
    }

    pub fn output(&self) -> &StereoBuffer {
        &self.buffer
    }
}
