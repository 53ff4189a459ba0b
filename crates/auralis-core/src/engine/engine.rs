//! Routing engine - channels, group buses, effect sends and master
//!
//! Per block:
//! 1. drain pending [`EngineCommand`]s
//! 2. load each channel's input (physical input, or the test tone on channel 0)
//! 3. run every channel strip (in parallel)
//! 4. sum channel outputs into their group bus, and into their effect-send
//!    bus scaled by the send level, in channel index order
//! 5. run group buses, add them to the master in bus order
//! 6. run effect-send buses, add them to the master in bus order
//! 7. run the master chain and copy it to the device outputs

use std::sync::Arc;

use rayon::prelude::*;

use super::channel::ChannelStrip;
use super::command::EngineCommand;
use super::fx_bus::FxBus;
use super::group_bus::GroupBus;
use super::handle::{MixerHandle, MixerParams};
use super::master_bus::MasterBus;
use crate::config::TestToneConfig;
use crate::types::{StereoBuffer, MAX_BLOCK_SIZE, NUM_FX_BUSES, NUM_GROUP_BUSES, SAMPLE_RATE};

/// Diagnostic sine oscillator
struct TestTone {
    phase: f32,
}

impl TestTone {
    fn fill(&mut self, buffer: &mut StereoBuffer, frequency_hz: f32, amplitude: f32, sample_rate: f32) {
        let step = frequency_hz / sample_rate;
        for sample in buffer.iter_mut() {
            let value = amplitude * (std::f32::consts::TAU * self.phase).sin();
            sample.left = value;
            sample.right = value;
            self.phase = (self.phase + step).fract();
        }
    }
}

/// The real-time mixing graph
///
/// Owned by the audio callback. The topology is fixed at construction;
/// everything adjustable is reached through [`RoutingEngine::handle`].
pub struct RoutingEngine {
    params: Arc<MixerParams>,
    channels: Vec<ChannelStrip>,
    group_buses: [GroupBus; NUM_GROUP_BUSES],
    fx_buses: [FxBus; NUM_FX_BUSES],
    master: MasterBus,
    commands: rtrb::Consumer<EngineCommand>,
    test_tone: TestTone,
    sample_rate: f32,
    block_size: usize,
    prepared: bool,
}

impl RoutingEngine {
    /// Build the fixed topology for `num_channels` input channels
    pub fn new(num_channels: usize, commands: rtrb::Consumer<EngineCommand>) -> Self {
        let params = Arc::new(MixerParams::new(num_channels));
        Self {
            channels: params.channels.iter().map(|p| ChannelStrip::new(p.clone())).collect(),
            group_buses: std::array::from_fn(|i| GroupBus::new(params.group_buses[i].clone())),
            fx_buses: std::array::from_fn(|i| FxBus::new(params.fx_buses[i].clone())),
            master: MasterBus::new(params.master.clone()),
            params,
            commands,
            test_tone: TestTone { phase: 0.0 },
            sample_rate: SAMPLE_RATE as f32,
            block_size: 0,
            prepared: false,
        }
    }

    /// Control-side handle sharing this engine's parameters
    pub fn handle(&self) -> MixerHandle {
        MixerHandle::new(self.params.clone())
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Output latency in samples (master limiter lookahead)
    pub fn latency_samples(&self) -> u32 {
        self.master.latency_samples()
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Configure the diagnostic tone that replaces channel 0's input
    pub fn set_test_tone(&self, config: &TestToneConfig) {
        let tone = &self.params.test_tone;
        tone.set_frequency_hz(config.frequency_hz);
        tone.set_amplitude(config.amplitude);
        tone.set_enabled(config.enabled);
    }

    /// Prepare every chain for a sample rate and host block size
    ///
    /// Must be called before the first [`RoutingEngine::process`]. Calling
    /// again with the same values does nothing.
    pub fn prepare(&mut self, sample_rate: f32, block_size: usize) {
        if self.prepared && self.sample_rate == sample_rate && self.block_size == block_size {
            return;
        }
        self.sample_rate = sample_rate;
        self.block_size = block_size;

        for strip in &mut self.channels {
            strip.prepare(sample_rate);
        }
        for bus in &mut self.group_buses {
            bus.prepare(sample_rate);
        }
        for bus in &mut self.fx_buses {
            bus.prepare(sample_rate);
        }
        self.master.prepare(sample_rate);
        self.test_tone.phase = 0.0;
        self.prepared = true;

        log::info!(
            "Engine prepared: {} Hz, block {}, {} channels, latency {} samples",
            sample_rate,
            block_size,
            self.channels.len(),
            self.master.latency_samples()
        );
        if block_size > MAX_BLOCK_SIZE {
            log::warn!("Host block {} exceeds {}, processing in chunks", block_size, MAX_BLOCK_SIZE);
        }
    }

    /// Clear processing state after the stream stops. Idempotent.
    pub fn release(&mut self) {
        if !self.prepared {
            return;
        }
        self.reset();
        self.prepared = false;
        log::info!("Engine released");
    }

    fn reset(&mut self) {
        for strip in &mut self.channels {
            strip.reset();
        }
        for bus in &mut self.group_buses {
            bus.reset();
        }
        for bus in &mut self.fx_buses {
            bus.reset();
        }
        self.master.reset();
    }

    /// Process one host period
    ///
    /// `inputs` and `outputs` are per-channel sample slices. Mismatched
    /// channel counts or lengths are tolerated: only the overlap is read,
    /// missing inputs are silence, output channels beyond stereo are zeroed.
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize) {
        let mut offset = 0;
        while offset < frames {
            let len = (frames - offset).min(MAX_BLOCK_SIZE);
            self.process_block(inputs, outputs, offset, len);
            offset += len;
        }
    }

    fn process_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                EngineCommand::SetMeterSink(sink) => {
                    // The old sink's memory is reclaimed by the GC thread
                    drop(self.master.replace_sink(sink));
                }
                EngineCommand::ResetState => self.reset(),
            }
        }
    }

    fn process_block(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], offset: usize, len: usize) {
        self.process_commands();

        let params = &*self.params;
        let routing = &*params.routing;
        let tone = &*params.test_tone;

        // 1. Inputs
        for (ch, strip) in self.channels.iter_mut().enumerate() {
            let buffer = strip.buffer_mut();
            buffer.set_len_from_capacity(len);

            if ch == 0 && tone.enabled() {
                self.test_tone
                    .fill(buffer, tone.frequency_hz(), tone.amplitude(), self.sample_rate);
                continue;
            }

            let source = routing
                .physical_input(ch)
                .filter(|&input| input < inputs.len())
                .or_else(|| (ch < inputs.len()).then_some(ch))
                .and_then(|input| inputs[input].get(offset..));
            match source {
                Some(samples) => {
                    let n = samples.len().min(len);
                    for (dst, &x) in buffer.as_mut_slice()[..n].iter_mut().zip(samples) {
                        dst.left = x;
                        dst.right = x;
                    }
                    buffer.as_mut_slice()[n..].fill(Default::default());
                }
                None => buffer.fill_silence(),
            }
        }

        // 2. Channel strips. On the rayon path the audio thread can park on
        // the join latch until the slowest strip finishes, so small blocks
        // stay inline.
        let process_strip = |(ch, strip): (usize, &mut ChannelStrip)| {
            if routing.is_enabled(ch) {
                strip.process();
            }
        };
        if strips_in_parallel(self.channels.len(), len) {
            self.channels.par_iter_mut().enumerate().for_each(process_strip);
        } else {
            self.channels.iter_mut().enumerate().for_each(process_strip);
        }

        // 3. Channel → group / effect-send summation
        for bus in &mut self.group_buses {
            bus.begin_block(len);
        }
        for bus in &mut self.fx_buses {
            bus.begin_block(len);
        }
        let any_solo = params.channels.iter().any(|ch| ch.solo());
        for (ch, strip) in self.channels.iter().enumerate() {
            let p = strip.params();
            if !routing.is_enabled(ch) || p.mute() || (any_solo && !p.solo()) {
                continue;
            }
            let channel_type = p.channel_type();
            self.group_buses[channel_type.group_bus().index()].accumulate(strip.output());
            if let Some(fx) = channel_type.fx_bus() {
                let level = p.fx_send();
                if level > 0.0 {
                    self.fx_buses[fx.index()].send(strip.output(), level);
                }
            }
        }

        // 4. Buses → master
        self.master.begin_block(len);
        for bus in &mut self.group_buses {
            bus.process();
            self.master.accumulate(bus.output());
        }
        for bus in &mut self.fx_buses {
            bus.process();
            self.master.accumulate(bus.output());
        }

        // 5. Master → device
        self.master.process();
        let mix = self.master.output();
        for (out_ch, output) in outputs.iter_mut().enumerate() {
            let Some(dst) = output.get_mut(offset..) else {
                continue;
            };
            let n = dst.len().min(len);
            match out_ch {
                0 => dst[..n].iter_mut().zip(mix.iter()).for_each(|(d, s)| *d = s.left),
                1 => dst[..n].iter_mut().zip(mix.iter()).for_each(|(d, s)| *d = s.right),
                _ => dst[..n].fill(0.0),
            }
        }
    }
}

/// Channel-frames per block below which strips run on the calling thread
const PARALLEL_MIN_WORK: usize = 8 * 256;

#[inline]
fn strips_in_parallel(channels: usize, frames: usize) -> bool {
    channels > 1 && channels * frames >= PARALLEL_MIN_WORK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::command::command_channel;
    use crate::engine::loudness::meter_tap;

    /// Engine with every processing stage switched off, so outputs are plain sums
    fn transparent_engine(channels: usize) -> (RoutingEngine, rtrb::Producer<EngineCommand>) {
        let (tx, rx) = command_channel();
        let mut engine = RoutingEngine::new(channels, rx);
        let mixer = engine.handle();
        for ch in mixer.channels() {
            ch.set_gate_enabled(false);
            ch.set_eq_enabled(false);
            ch.set_comp_enabled(false);
        }
        for i in 0..NUM_GROUP_BUSES {
            let bus = mixer.group_bus(i).unwrap();
            bus.set_eq_enabled(false);
            bus.set_comp_enabled(false);
        }
        for i in 0..NUM_FX_BUSES {
            mixer.fx_bus(i).unwrap().set_bypass(true);
        }
        mixer.master().set_compressor_enabled(false);
        mixer.master().set_limiter_enabled(false);
        engine.prepare(48000.0, 256);
        (engine, tx)
    }

    fn run(engine: &mut RoutingEngine, inputs: &[Vec<f32>], frames: usize) -> (Vec<f32>, Vec<f32>) {
        let input_refs: Vec<&[f32]> = inputs.iter().map(Vec::as_slice).collect();
        let mut left = vec![0.0; frames];
        let mut right = vec![0.0; frames];
        {
            let mut outputs: Vec<&mut [f32]> = vec![&mut left, &mut right];
            engine.process(&input_refs, &mut outputs, frames);
        }
        (left, right)
    }

    #[test]
    fn test_channels_sum_to_master() {
        let (mut engine, _tx) = transparent_engine(4);
        let inputs = vec![vec![0.1; 128], vec![0.2; 128], vec![0.0; 128], vec![0.3; 128]];
        let (left, right) = run(&mut engine, &inputs, 128);
        assert!((left[64] - 0.6).abs() < 1e-6);
        assert!((right[64] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_strips_sum_the_same_inline_and_parallel() {
        assert!(!strips_in_parallel(16, 16));
        assert!(strips_in_parallel(16, 512));
        assert!(!strips_in_parallel(1, MAX_BLOCK_SIZE));

        let inputs: Vec<Vec<f32>> = (0..16).map(|ch| vec![0.01 * ch as f32; 512]).collect();
        let expected: f32 = (0..16).map(|ch| 0.01 * ch as f32).sum();
        for frames in [16, 512] {
            let (mut engine, _tx) = transparent_engine(16);
            let (left, right) = run(&mut engine, &inputs, frames);
            assert!((left[frames - 1] - expected).abs() < 1e-5, "{frames} frames: {}", left[frames - 1]);
            assert!((right[0] - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_missing_inputs_are_silence() {
        let (mut engine, _tx) = transparent_engine(8);
        // Only two device inputs, one of them shorter than the block
        let inputs = vec![vec![0.25; 64], vec![0.5; 32]];
        let (left, _) = run(&mut engine, &inputs, 64);
        assert!((left[10] - 0.75).abs() < 1e-6);
        assert!((left[40] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_bus_sum_is_order_independent() {
        let a: Vec<f32> = (0..256).map(|i| (i as f32 * 0.013).sin() * 0.3).collect();
        let b: Vec<f32> = (0..256).map(|i| (i as f32 * 0.071).cos() * 0.2).collect();

        // Two channels on the same (vocal) group bus, inputs swapped
        let (mut first, _tx1) = transparent_engine(2);
        let (mut second, _tx2) = transparent_engine(2);
        let (l1, _) = run(&mut first, &[a.clone(), b.clone()], 256);
        let (l2, _) = run(&mut second, &[b, a], 256);

        for (x, y) in l1.iter().zip(&l2) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mute_and_solo() {
        let (mut engine, _tx) = transparent_engine(3);
        let mixer = engine.handle();
        let inputs = vec![vec![0.1; 64], vec![0.2; 64], vec![0.4; 64]];

        mixer.channel(1).unwrap().set_mute(true);
        let (left, _) = run(&mut engine, &inputs, 64);
        assert!((left[5] - 0.5).abs() < 1e-6);

        mixer.channel(2).unwrap().set_solo(true);
        let (left, _) = run(&mut engine, &inputs, 64);
        assert!((left[5] - 0.4).abs() < 1e-6);

        // A muted channel stays silent even when soloed
        mixer.channel(1).unwrap().set_solo(true);
        let (left, _) = run(&mut engine, &inputs, 64);
        assert!((left[5] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_physical_input_mapping() {
        let (mut engine, _tx) = transparent_engine(2);
        let mixer = engine.handle();
        mixer.channel(1).unwrap().set_mute(true);
        mixer.routing().set_physical_input(0, 2);

        let inputs = vec![vec![0.1; 32], vec![0.2; 32], vec![0.7; 32]];
        let (left, _) = run(&mut engine, &inputs, 32);
        assert!((left[0] - 0.7).abs() < 1e-6);

        // An assignment beyond the device falls back to the channel's own input
        mixer.routing().set_physical_input(0, 9);
        let (left, _) = run(&mut engine, &inputs, 32);
        assert!((left[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_disabled_channel_is_silent() {
        let (mut engine, _tx) = transparent_engine(2);
        engine.handle().routing().set_enabled(1, false);
        let (left, _) = run(&mut engine, &[vec![0.1; 16], vec![0.2; 16]], 16);
        assert!((left[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_sends_reach_master() {
        let (mut engine, _tx) = transparent_engine(2);
        let mixer = engine.handle();
        // Send bus straight through, so it adds send * input on top of the dry path
        mixer.fx_bus(0).unwrap().set_bypass(true);
        mixer.channel(0).unwrap().set_fx_send(0.5);

        let (left, _) = run(&mut engine, &[vec![0.2; 32], vec![0.0; 32]], 32);
        assert!((left[8] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_large_period_is_chunked() {
        let (mut engine, _tx) = transparent_engine(1);
        let frames = MAX_BLOCK_SIZE * 2 + 100;
        let (left, _) = run(&mut engine, &[vec![0.05; frames]], frames);
        assert!(left.iter().all(|&x| (x - 0.05).abs() < 1e-6));
    }

    #[test]
    fn test_extra_outputs_zeroed() {
        let (mut engine, _tx) = transparent_engine(1);
        let input = vec![0.3f32; 16];
        let mut outs = vec![vec![9.0f32; 16]; 3];
        {
            let mut refs: Vec<&mut [f32]> = outs.iter_mut().map(Vec::as_mut_slice).collect();
            engine.process(&[input.as_slice()], &mut refs, 16);
        }
        assert!((outs[0][3] - 0.3).abs() < 1e-6);
        assert!((outs[1][3] - 0.3).abs() < 1e-6);
        assert!(outs[2].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_test_tone_replaces_channel_zero() {
        let (mut engine, _tx) = transparent_engine(1);
        engine.set_test_tone(&TestToneConfig {
            enabled: true,
            frequency_hz: 1000.0,
            amplitude: 0.5,
        });

        let (left, _) = run(&mut engine, &[vec![0.0; 480]], 480);
        let peak = left.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        assert!((peak - 0.5).abs() < 0.01, "peak {peak}");
    }

    #[test]
    fn test_prepare_and_release_are_idempotent() {
        let (mut engine, _tx) = transparent_engine(1);
        assert!(engine.is_prepared());
        engine.prepare(48000.0, 256);
        assert!(engine.is_prepared());
        engine.release();
        engine.release();
        assert!(!engine.is_prepared());
        engine.prepare(44100.0, 128);
        assert_eq!(engine.sample_rate(), 44100.0);
    }

    #[test]
    fn test_meter_sink_installed_via_command() {
        let (mut engine, mut tx) = transparent_engine(1);
        let (tap, mut reader) = meter_tap();
        assert!(tx.push(EngineCommand::set_meter_sink(tap)).is_ok());

        run(&mut engine, &[vec![0.5; 256]], 256);
        let reading = reader.latest().expect("sink received no reading");
        assert_eq!(reading.lufs, engine.handle().master().current_lufs());
    }
}
