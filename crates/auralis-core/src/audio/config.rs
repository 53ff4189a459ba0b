//! Audio backend configuration
//!
//! Device selection and stream settings for the live mixer. Input and
//! output devices are chosen independently; both must run at the same
//! sample rate.

use serde::{Deserialize, Serialize};

use crate::types::MAX_BLOCK_SIZE;

/// Common low-latency buffer sizes (frames)
/// - 64 frames @ 48kHz = ~1.3ms
/// - 128 frames @ 48kHz = ~2.7ms
/// - 256 frames @ 48kHz = ~5.3ms
/// - 512 frames @ 48kHz = ~10.7ms (safe default for most systems)
pub const LOW_LATENCY_BUFFER_SIZES: [u32; 4] = [64, 128, 256, 512];

/// Default buffer size when no preference is specified (frames)
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Smallest fixed buffer size accepted (frames)
pub const MIN_BUFFER_SIZE: u32 = 64;

/// Default sample rate for the audio system (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Most device channels handled per direction
pub const MAX_DEVICE_CHANNELS: usize = 64;

/// Preferred buffer size for audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the system choose the default buffer size
    #[default]
    Default,
    /// Request a specific buffer size in frames (may be adjusted by the system)
    Fixed(u32),
    /// Smallest commonly stable size
    LowLatency,
}

impl BufferSize {
    /// Frames to request from the device
    ///
    /// Fixed sizes are clamped to `MIN_BUFFER_SIZE..=MAX_BLOCK_SIZE`.
    pub fn frames(&self) -> u32 {
        match self {
            BufferSize::Default => DEFAULT_BUFFER_SIZE,
            BufferSize::Fixed(frames) => (*frames).clamp(MIN_BUFFER_SIZE, MAX_BLOCK_SIZE as u32),
            BufferSize::LowLatency => LOW_LATENCY_BUFFER_SIZES[2],
        }
    }

    /// Latency in milliseconds for a given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> f32 {
        (self.frames() as f32 / sample_rate as f32) * 1000.0
    }
}

/// Audio device identifier
///
/// Includes both the device name and the host backend (JACK, ALSA, etc.)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host identifier (e.g., "JACK", "ALSA", "CoreAudio")
    /// If None, every host is searched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Display label that includes the host if available
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Configuration for the audio backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture device feeding the mixer channels (None = system default)
    pub input_device: Option<DeviceId>,

    /// Main output device (None = system default)
    pub output_device: Option<DeviceId>,

    /// Preferred buffer size
    pub buffer_size: BufferSize,

    /// Preferred sample rate (None = 48kHz)
    pub sample_rate: Option<u32>,

    /// Cap on device inputs read per period (None = all, up to 64)
    pub max_input_channels: Option<u16>,
}

impl AudioConfig {
    pub fn with_input_device(mut self, device: DeviceId) -> Self {
        self.input_device = Some(device);
        self
    }

    pub fn with_output_device(mut self, device: DeviceId) -> Self {
        self.output_device = Some(device);
        self
    }

    /// Set a fixed buffer size in frames
    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Device inputs to use when the device offers `available`
    pub fn input_channels(&self, available: usize) -> usize {
        let cap = self
            .max_input_channels
            .map_or(MAX_DEVICE_CHANNELS, |max| max as usize);
        available.min(cap).min(MAX_DEVICE_CHANNELS)
    }
}
