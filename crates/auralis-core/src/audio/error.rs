//! Audio host error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    /// Enumeration found nothing for the direction ("input" / "output")
    #[error("No audio {0} devices found")]
    NoDevices(&'static str),

    #[error("No default audio device: {0}")]
    NoDefaultDevice(String),

    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Device refused to report or accept a stream configuration
    #[error("Unusable device configuration: {0}")]
    ConfigError(String),

    #[error("Cannot open audio stream: {0}")]
    StreamBuildError(String),

    #[error("Cannot start audio stream: {0}")]
    StreamPlayError(String),

    /// Capture and playback must run at one rate; there is no resampler
    #[error("Sample rate mismatch: input={input}Hz, output={output}Hz")]
    SampleRateMismatch { input: u32, output: u32 },
}

pub type AudioResult<T> = Result<T, AudioError>;
