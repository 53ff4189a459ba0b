//! CPAL audio backend
//!
//! ```text
//!                    ┌───────────────────────┐
//!   device inputs ──►│     Input Stream      │──► CaptureTap (soundcheck)
//!                    └───────────┬───────────┘
//!                                │ interleaved frames
//!                    ┌───────────▼───────────┐
//!                    │  Input Sample Queue   │  <── lock-free ring buffer
//!                    │  (SPSC, 4 periods)    │      input produces, output consumes
//!                    └───────────┬───────────┘
//!                                │
//!                    ┌───────────▼───────────┐
//!   UI Commands ────►│     Output Stream     │──► device outputs
//!                    │ (owns RoutingEngine)  │
//!                    └───────────────────────┘
//! ```
//!
//! Both callbacks only ever move whole frames through the queue, so channel
//! interleaving stays aligned. When the output side runs dry it plays
//! silence for the missing frames; when the input side finds the queue full
//! it drops the whole period and counts an overrun.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig, SupportedStreamConfigRange};

use super::config::{AudioConfig, MAX_DEVICE_CHANNELS};
use super::device::{resolve_device, Direction};
use super::error::{AudioError, AudioResult};
use crate::engine::RoutingEngine;
use crate::soundcheck::CaptureTap;
use crate::types::MAX_BLOCK_SIZE;

/// Output channels the mixer writes; further device outputs get silence
const MIXER_OUTPUTS: usize = 2;

/// Periods of input the queue can hold
const QUEUE_PERIODS: usize = 4;

/// Running audio system
///
/// Keeps the streams alive. Drop this to stop audio.
pub struct AudioSystem {
    _input_stream: Option<Stream>,
    _output_stream: Stream,
    sample_rate: u32,
    buffer_size: u32,
    input_channels: usize,
    output_channels: usize,
    overruns: Arc<AtomicU64>,
}

impl AudioSystem {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Negotiated buffer size in frames
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Input periods dropped because the output side fell behind
    pub fn input_overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }
}

/// Open the devices, prepare the engine and start streaming
///
/// The engine moves into the output callback. `tap` is fed from the input
/// callback with the raw device input. A missing input device is not an
/// error: the mixer then runs on silence (and the test tone).
pub fn start_audio_system(
    config: &AudioConfig,
    mut engine: RoutingEngine,
    tap: Option<CaptureTap>,
) -> AudioResult<AudioSystem> {
    let output_device = resolve_device(config.output_device.as_ref(), Direction::Output)?;
    let output_name = output_device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Output device: {}", output_name);

    let output_ranges: Vec<_> = output_device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();
    let output_config = select_stream_config(&output_ranges, config, MIXER_OUTPUTS)?;
    let sample_rate = output_config.sample_rate.0;
    let buffer_size = config.buffer_size.frames();

    // Input is optional
    let input = match resolve_device(config.input_device.as_ref(), Direction::Input) {
        Ok(device) => {
            let ranges: Vec<_> = device
                .supported_input_configs()
                .map_err(|e| AudioError::ConfigError(e.to_string()))?
                .collect();
            let mut input_config = select_stream_config(&ranges, config, 1)?;
            if input_config.sample_rate.0 != sample_rate {
                return Err(AudioError::SampleRateMismatch {
                    input: input_config.sample_rate.0,
                    output: sample_rate,
                });
            }
            input_config.buffer_size = CpalBufferSize::Fixed(buffer_size);
            log::info!(
                "Input device: {} ({} channels)",
                device.name().unwrap_or_else(|_| "Unknown".to_string()),
                input_config.channels
            );
            Some((device, input_config))
        }
        Err(e) => {
            log::warn!("No audio input, running on silence: {}", e);
            None
        }
    };

    let output_config = StreamConfig {
        buffer_size: CpalBufferSize::Fixed(buffer_size),
        ..output_config
    };
    let output_channels = output_config.channels as usize;
    let device_inputs = input.as_ref().map_or(0, |(_, c)| c.channels as usize);
    let input_channels = config.input_channels(device_inputs);

    log::info!(
        "Audio config: {} in / {} out, {}Hz, {} frames (~{:.1}ms latency)",
        input_channels,
        output_channels,
        sample_rate,
        buffer_size,
        config.buffer_size.latency_ms(sample_rate)
    );

    engine.prepare(sample_rate as f32, buffer_size as usize);

    let queue_capacity = (input_channels * buffer_size as usize * QUEUE_PERIODS).max(1);
    let (producer, consumer) = rtrb::RingBuffer::<f32>::new(queue_capacity);
    let overruns = Arc::new(AtomicU64::new(0));

    let input_stream = match input {
        Some((device, input_config)) => {
            let state = InputState {
                tap,
                producer,
                device_channels: device_inputs,
                channels: input_channels,
                planar: vec![vec![0.0; MAX_BLOCK_SIZE]; input_channels],
                overruns: overruns.clone(),
            };
            Some(build_input_stream(&device, &input_config, state)?)
        }
        None => None,
    };

    let output_state = OutputState {
        engine,
        consumer,
        input_channels,
        inputs: vec![vec![0.0; MAX_BLOCK_SIZE]; input_channels],
        outputs: vec![vec![0.0; MAX_BLOCK_SIZE]; MIXER_OUTPUTS],
    };
    let output_stream = build_output_stream(&output_device, &output_config, output_state)?;

    if let Some(stream) = &input_stream {
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(format!("Input: {}", e)))?;
    }
    output_stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(format!("Output: {}", e)))?;

    log::info!("Audio streams started");

    Ok(AudioSystem {
        _input_stream: input_stream,
        _output_stream: output_stream,
        sample_rate,
        buffer_size,
        input_channels,
        output_channels,
        overruns,
    })
}

/// Best stream config among `ranges`
///
/// Prefers f32 at the requested rate with at least `min_channels`, falling
/// back to any f32 config with enough channels at its highest rate.
fn select_stream_config(
    ranges: &[SupportedStreamConfigRange],
    config: &AudioConfig,
    min_channels: usize,
) -> AudioResult<StreamConfig> {
    let target = config.target_sample_rate();
    let supports_rate = |c: &&SupportedStreamConfigRange| target >= c.min_sample_rate().0 && target <= c.max_sample_rate().0;

    let candidates: Vec<_> = ranges
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() as usize >= min_channels)
        .collect();

    // Widest config at the requested rate
    let best = candidates
        .iter()
        .copied()
        .filter(supports_rate)
        .max_by_key(|c| c.channels().min(MAX_DEVICE_CHANNELS as u16));

    let supported = match best {
        Some(range) => range.clone().with_sample_rate(cpal::SampleRate(target)),
        None => {
            let range = candidates
                .iter()
                .max_by_key(|c| c.channels().min(MAX_DEVICE_CHANNELS as u16))
                .ok_or_else(|| AudioError::ConfigError("No f32 stream configuration available".to_string()))?;
            let fallback = range.max_sample_rate();
            log::warn!(
                "Audio device doesn't support {}Hz, falling back to {}Hz",
                target,
                fallback.0
            );
            (*range).clone().with_sample_rate(fallback)
        }
    };

    Ok(supported.config())
}

/// State owned by the input callback
struct InputState {
    tap: Option<CaptureTap>,
    producer: rtrb::Producer<f32>,
    /// Channels per interleaved device frame
    device_channels: usize,
    /// Channels forwarded to the mixer
    channels: usize,
    planar: Vec<Vec<f32>>,
    overruns: Arc<AtomicU64>,
}

impl InputState {
    fn process(&mut self, data: &[f32]) {
        if self.device_channels == 0 {
            return;
        }
        for period in data.chunks(MAX_BLOCK_SIZE * self.device_channels) {
            let frames = period.len() / self.device_channels;
            deinterleave(period, self.device_channels, &mut self.planar, frames);

            if let Some(tap) = &self.tap {
                let mut refs: [&[f32]; MAX_DEVICE_CHANNELS] = [&[]; MAX_DEVICE_CHANNELS];
                for (slot, lane) in refs.iter_mut().zip(&self.planar) {
                    *slot = &lane[..frames];
                }
                tap.capture(&refs[..self.channels], frames);
            }

            if self.producer.slots() < frames * self.channels {
                self.overruns.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            for frame in 0..frames {
                for lane in &self.planar {
                    // Space checked above
                    let _ = self.producer.push(lane[frame]);
                }
            }
        }
    }
}

/// State owned by the output callback
struct OutputState {
    engine: RoutingEngine,
    consumer: rtrb::Consumer<f32>,
    input_channels: usize,
    inputs: Vec<Vec<f32>>,
    outputs: Vec<Vec<f32>>,
}

impl OutputState {
    fn process(&mut self, data: &mut [f32], device_channels: usize) {
        for period in data.chunks_mut(MAX_BLOCK_SIZE * device_channels) {
            let frames = period.len() / device_channels;
            self.pull_inputs(frames);

            let mut inputs: [&[f32]; MAX_DEVICE_CHANNELS] = [&[]; MAX_DEVICE_CHANNELS];
            for (slot, lane) in inputs.iter_mut().zip(&self.inputs) {
                *slot = &lane[..frames];
            }
            let [left, right] = &mut self.outputs[..] else {
                return;
            };
            let mut outputs: [&mut [f32]; MIXER_OUTPUTS] = [&mut left[..frames], &mut right[..frames]];
            self.engine
                .process(&inputs[..self.input_channels], &mut outputs, frames);

            interleave(&self.outputs, period, device_channels, frames);
        }
    }

    /// Fill the planar input lanes from the queue, silence for missing frames
    fn pull_inputs(&mut self, frames: usize) {
        if self.input_channels == 0 {
            return;
        }
        let available = (self.consumer.slots() / self.input_channels).min(frames);
        for frame in 0..available {
            for lane in self.inputs.iter_mut() {
                lane[frame] = self.consumer.pop().unwrap_or(0.0);
            }
        }
        for lane in self.inputs.iter_mut() {
            lane[available..frames].fill(0.0);
        }
    }
}

/// Split interleaved samples into the first `planar.len()` lanes
fn deinterleave(interleaved: &[f32], channels: usize, planar: &mut [Vec<f32>], frames: usize) {
    for (frame, samples) in interleaved.chunks_exact(channels).take(frames).enumerate() {
        for (lane, &sample) in planar.iter_mut().zip(samples) {
            lane[frame] = sample;
        }
    }
}

/// Write planar lanes into interleaved device frames, zeroing extra channels
fn interleave(planar: &[Vec<f32>], interleaved: &mut [f32], channels: usize, frames: usize) {
    for (frame, samples) in interleaved.chunks_exact_mut(channels).take(frames).enumerate() {
        for (ch, sample) in samples.iter_mut().enumerate() {
            *sample = planar.get(ch).map_or(0.0, |lane| lane[frame]);
        }
    }
}

fn build_input_stream(device: &cpal::Device, config: &StreamConfig, mut state: InputState) -> AudioResult<Stream> {
    device
        .build_input_stream(
            config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| state.process(data),
            move |err| {
                log::error!("Input audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

fn build_output_stream(device: &cpal::Device, config: &StreamConfig, mut state: OutputState) -> AudioResult<Stream> {
    let channels = config.channels as usize;
    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| state.process(data, channels),
            move |err| {
                log::error!("Output audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::command_channel;

    fn output_state(input_channels: usize, queue: usize) -> (OutputState, rtrb::Producer<f32>) {
        let (_tx, rx) = command_channel();
        let mut engine = RoutingEngine::new(4, rx);
        engine.prepare(48000.0, 256);
        let (producer, consumer) = rtrb::RingBuffer::<f32>::new(queue);
        let state = OutputState {
            engine,
            consumer,
            input_channels,
            inputs: vec![vec![0.0; MAX_BLOCK_SIZE]; input_channels],
            outputs: vec![vec![0.0; MAX_BLOCK_SIZE]; MIXER_OUTPUTS],
        };
        (state, producer)
    }

    #[test]
    fn test_interleave_roundtrip_and_extra_channels() {
        let interleaved = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut planar = vec![vec![0.0; 4]; 3];
        deinterleave(&interleaved, 3, &mut planar, 2);
        assert_eq!(planar[0][..2], [1.0, 4.0]);
        assert_eq!(planar[2][..2], [3.0, 6.0]);

        let mut out = [9.0f32; 8];
        interleave(&planar[..2], &mut out, 4, 2);
        assert_eq!(out, [1.0, 2.0, 0.0, 0.0, 4.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_output_pulls_whole_frames_and_pads() {
        let (mut state, mut producer) = output_state(2, 64);
        // Three frames of (ch0, ch1)
        for sample in [0.1, 0.2, 0.3, 0.4, 0.5, 0.6] {
            producer.push(sample).unwrap();
        }
        state.pull_inputs(5);
        assert_eq!(state.inputs[0][..5], [0.1, 0.3, 0.5, 0.0, 0.0]);
        assert_eq!(state.inputs[1][..5], [0.2, 0.4, 0.6, 0.0, 0.0]);
        assert_eq!(state.consumer.slots(), 0);
    }

    #[test]
    fn test_output_callback_without_input_is_silent() {
        let (mut state, _producer) = output_state(0, 1);
        let mut data = vec![1.0f32; 3 * 128];
        state.process(&mut data, 3);
        assert!(data.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_input_overrun_drops_whole_period() {
        let (producer, mut consumer) = rtrb::RingBuffer::<f32>::new(8);
        let overruns = Arc::new(AtomicU64::new(0));
        let mut state = InputState {
            tap: None,
            producer,
            device_channels: 3,
            channels: 2,
            planar: vec![vec![0.0; MAX_BLOCK_SIZE]; 2],
            overruns: overruns.clone(),
        };

        // 3 frames of 3 device channels, only the first two are forwarded
        state.process(&[1.0, 2.0, 9.0, 3.0, 4.0, 9.0, 5.0, 6.0, 9.0]);
        assert_eq!(consumer.slots(), 6);
        let forwarded: Vec<f32> = std::iter::from_fn(|| consumer.pop().ok()).collect();
        assert_eq!(forwarded, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        // 5 frames need 10 slots, the queue only has 8
        state.process(&[0.5; 15]);
        assert_eq!(overruns.load(Ordering::Relaxed), 1);
        assert_eq!(consumer.slots(), 0);
    }
}
