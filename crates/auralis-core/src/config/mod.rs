//! Configuration for auralis
//!
//! - Generic YAML config loading/saving
//! - Default config locations
//! - `MixerConfig` with audio, soundcheck, test tone and master sections
//!
//! ```ignore
//! use auralis_core::config::{default_config_path, load_config, save_config, MixerConfig};
//!
//! let path = default_config_path("mixer.yaml");
//! let config: MixerConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod mixer;
mod paths;

pub use io::{load_config, save_config};
pub use mixer::{MasterConfig, MixerConfig, SoundcheckConfig, TestToneConfig};
pub use paths::{config_dir, default_config_path};
