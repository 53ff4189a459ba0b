//! Audio host layer
//!
//! Opens the capture and playback devices through CPAL and drives the
//! mixer from the output callback.
//!
//! # Architecture
//!
//! The audio system follows a lock-free design for real-time safety:
//!
//! - **Control Thread**: mutates parameters through the [`crate::engine::MixerHandle`]
//!   atomics and sends [`crate::engine::EngineCommand`]s via a lock-free ringbuffer
//! - **Input Callback**: feeds the soundcheck capture tap and queues raw input
//! - **Output Callback**: owns the [`crate::engine::RoutingEngine`] exclusively
//!
//! # Example Usage
//!
//! ```ignore
//! use auralis_core::audio::{start_audio_system, AudioConfig};
//! use auralis_core::engine::{command_channel, RoutingEngine};
//!
//! let (command_tx, command_rx) = command_channel();
//! let engine = RoutingEngine::new(32, command_rx);
//! let mixer = engine.handle();
//! let system = start_audio_system(&AudioConfig::default(), engine, None)?;
//!
//! mixer.channel(0).unwrap().set_trim_db(3.0);
//! ```

mod config;
mod cpal_backend;
mod device;
mod error;

pub use config::{
    AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE, LOW_LATENCY_BUFFER_SIZES,
    MAX_DEVICE_CHANNELS, MIN_BUFFER_SIZE,
};
pub use cpal_backend::{start_audio_system, AudioSystem};
pub use device::{find_device_by_id, get_devices, resolve_device, AudioDevice, Direction};
pub use error::{AudioError, AudioResult};
