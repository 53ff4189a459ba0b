//! Mixer application configuration
//!
//! Every section is `#[serde(default)]`, so a partial YAML file only
//! overrides what it names.

use serde::{Deserialize, Serialize};

use crate::audio::AudioConfig;
use crate::engine::{MasterParams, StreamTarget};

/// Soundcheck run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundcheckConfig {
    /// Capture length per channel
    pub seconds_per_channel: u32,
    /// How often the analysis thread checks the capture count
    pub poll_interval_ms: u64,
    /// Capacity of the capture ring
    pub capture_seconds: u32,
    /// A full run taking longer than this is logged as a warning
    pub time_budget_secs: u64,
}

impl Default for SoundcheckConfig {
    fn default() -> Self {
        Self {
            seconds_per_channel: 5,
            poll_interval_ms: 100,
            capture_seconds: 5,
            time_budget_secs: 60,
        }
    }
}

/// Diagnostic tone on channel 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestToneConfig {
    pub enabled: bool,
    pub frequency_hz: f32,
    pub amplitude: f32,
}

impl Default for TestToneConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            frequency_hz: 60.0,
            amplitude: 0.5,
        }
    }
}

/// Master bus values applied at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub stream_target: StreamTarget,
    pub ceiling_db: f32,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            stream_target: StreamTarget::YouTube,
            ceiling_db: -1.0,
        }
    }
}

impl MasterConfig {
    pub fn apply(&self, master: &MasterParams) {
        master.set_stream_target(self.stream_target);
        master.set_ceiling_db(self.ceiling_db);
    }
}

/// Top-level config file (`mixer.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    pub audio: AudioConfig,
    pub soundcheck: SoundcheckConfig,
    pub test_tone: TestToneConfig,
    pub master: MasterConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MixerConfig::default();
        assert_eq!(config.soundcheck.seconds_per_channel, 5);
        assert_eq!(config.soundcheck.poll_interval_ms, 100);
        assert!(!config.test_tone.enabled);
        assert_eq!(config.master.stream_target, StreamTarget::YouTube);
    }

    #[test]
    fn test_master_config_applies() {
        let master = MasterParams::new();
        MasterConfig {
            stream_target: StreamTarget::Facebook,
            ceiling_db: -40.0,
        }
        .apply(&master);

        assert_eq!(master.target_lufs(), -16.0);
        // Out-of-range ceiling is clamped by the parameter block
        assert_eq!(master.ceiling_db(), -12.0);
    }
}
