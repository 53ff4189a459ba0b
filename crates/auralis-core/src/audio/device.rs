//! Audio device enumeration and lookup
//!
//! Devices are enumerated from ALL available audio hosts (JACK, ALSA,
//! PulseAudio, etc.). A multi-input interface usually shows up under ALSA
//! or JACK with its full channel count, while the default device of the
//! default host is often a stereo mixdown.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Host, HostId};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// Stream direction of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    fn label(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// Human-readable name for a host ID
fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        _ => name,
    }
}

fn get_host_by_name(name: &str) -> Option<Host> {
    cpal::available_hosts()
        .into_iter()
        .find(|&host_id| host_name(host_id) == name)
        .and_then(|host_id| cpal::host_from_id(host_id).ok())
}

fn devices_of(host: &Host, direction: Direction) -> Option<Vec<cpal::Device>> {
    let devices = match direction {
        Direction::Input => host.input_devices().map(|d| d.collect()),
        Direction::Output => host.output_devices().map(|d| d.collect()),
    };
    match devices {
        Ok(devices) => Some(devices),
        Err(e) => {
            log::debug!("Could not enumerate {} devices: {}", direction.label(), e);
            None
        }
    }
}

fn default_of(host: &Host, direction: Direction) -> Option<cpal::Device> {
    match direction {
        Direction::Input => host.default_input_device(),
        Direction::Output => host.default_output_device(),
    }
}

/// Information about an audio device
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Device identifier for configuration (includes host info)
    pub id: DeviceId,
    pub name: String,
    /// Host backend name (e.g., "ALSA", "JACK")
    pub host: String,
    pub direction: Direction,
    /// Whether this is the system default device for its host
    pub is_default: bool,
    /// Supported sample rates (common ones)
    pub sample_rates: Vec<u32>,
    pub max_channels: u16,
}

impl std::fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} ({} ch{})",
            self.host,
            self.name,
            self.max_channels,
            if self.is_default { ", default" } else { "" }
        )
    }
}

/// All devices of one direction from every host
///
/// Default devices first, then by host, then by name.
pub fn get_devices(direction: Direction) -> AudioResult<Vec<AudioDevice>> {
    let mut all_devices: Vec<AudioDevice> = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(h) => h,
            Err(e) => {
                log::debug!("Could not initialize host {:?}: {}", host_id, e);
                continue;
            }
        };
        let host_name_str = host_name(host_id);
        let default_device_name = default_of(&host, direction).and_then(|d| d.name().ok());

        for device in devices_of(&host, direction).unwrap_or_default() {
            let Ok(name) = device.name() else {
                continue;
            };

            let configs: Vec<_> = match direction {
                Direction::Input => device.supported_input_configs().map(|c| c.collect()),
                Direction::Output => device.supported_output_configs().map(|c| c.collect()),
            }
            .unwrap_or_default();
            if configs.is_empty() {
                continue;
            }

            let mut sample_rates: Vec<u32> = Vec::new();
            let mut max_channels: u16 = 0;
            for config in &configs {
                max_channels = max_channels.max(config.channels());
                for rate in [44100, 48000, 88200, 96000, 176400, 192000] {
                    if rate >= config.min_sample_rate().0
                        && rate <= config.max_sample_rate().0
                        && !sample_rates.contains(&rate)
                    {
                        sample_rates.push(rate);
                    }
                }
            }
            sample_rates.sort_unstable();

            all_devices.push(AudioDevice {
                id: DeviceId::with_host(&name, &host_name_str),
                is_default: default_device_name.as_ref() == Some(&name),
                name,
                host: host_name_str.clone(),
                direction,
                sample_rates,
                max_channels,
            });
        }
    }

    if all_devices.is_empty() {
        return Err(AudioError::NoDevices(direction.label()));
    }

    all_devices.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.host.cmp(&b.host))
            .then_with(|| a.name.cmp(&b.name))
    });

    log::info!(
        "Enumerated {} audio {} devices from {} hosts",
        all_devices.len(),
        direction.label(),
        cpal::available_hosts().len()
    );

    Ok(all_devices)
}

/// Find a device by its ID
///
/// Uses the host named in the ID if available, otherwise searches every host.
pub fn find_device_by_id(id: &DeviceId, direction: Direction) -> AudioResult<cpal::Device> {
    let matches = |d: &cpal::Device| d.name().ok().as_deref() == Some(id.name.as_str());

    if let Some(host) = id.host.as_deref().and_then(get_host_by_name) {
        return devices_of(&host, direction)
            .ok_or_else(|| AudioError::ConfigError(format!("cannot list {} devices", direction.label())))?
            .into_iter()
            .find(matches)
            .ok_or_else(|| AudioError::DeviceNotFound(id.display_label()));
    }

    cpal::available_hosts()
        .into_iter()
        .filter_map(|host_id| cpal::host_from_id(host_id).ok())
        .filter_map(|host| devices_of(&host, direction))
        .flatten()
        .find(matches)
        .ok_or_else(|| AudioError::DeviceNotFound(id.display_label()))
}

/// Default device of the default host
pub fn get_cpal_default_device(direction: Direction) -> AudioResult<cpal::Device> {
    default_of(&cpal::default_host(), direction)
        .ok_or_else(|| AudioError::NoDefaultDevice(format!("no default {} device", direction.label())))
}

/// Configured device, else the default one
pub fn resolve_device(id: Option<&DeviceId>, direction: Direction) -> AudioResult<cpal::Device> {
    match id {
        Some(id) => find_device_by_id(id, direction),
        None => get_cpal_default_device(direction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_enumeration() {
        // May find nothing on CI machines
        for direction in [Direction::Input, Direction::Output] {
            match get_devices(direction) {
                Ok(devices) => {
                    for device in &devices {
                        assert_eq!(device.direction, direction);
                        assert!(device.max_channels > 0);
                        println!("  - {}", device);
                    }
                }
                Err(AudioError::NoDevices(label)) => {
                    println!("No {} devices available (expected in CI)", label);
                }
                Err(e) => {
                    println!("Error enumerating devices: {}", e);
                }
            }
        }
    }

    #[test]
    fn test_missing_device_is_reported() {
        let id = DeviceId::with_host("definitely-not-a-device", "NoSuchHost");
        match find_device_by_id(&id, Direction::Output) {
            Err(AudioError::DeviceNotFound(label)) => assert!(label.contains("definitely-not-a-device")),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
