// CPAL output device discovery and selection

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use super::AudioError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

pub struct AudioDeviceManager {
    host: Host,
}

impl AudioDeviceManager {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Output devices reported by the default host
    pub fn list_output_devices(&self) -> Vec<AudioDeviceInfo> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|device| device.name().ok())
            .unwrap_or_default();

        let Ok(devices) = self.host.output_devices() else {
            log::warn!("Could not enumerate output devices");
            return Vec::new();
        };

        devices
            .filter_map(|device| device.name().ok())
            .map(|name| AudioDeviceInfo {
                is_default: name == default_name,
                name,
            })
            .collect()
    }

    pub fn get_output_device_by_name(&self, device_name: &str) -> Option<Device> {
        self.host
            .output_devices()
            .ok()?
            .find(|device| device.name().is_ok_and(|name| name == device_name))
    }

    /// The named device, or the host default when `device_name` is `None`
    pub fn select_output_device(&self, device_name: Option<&str>) -> Result<Device, AudioError> {
        match device_name {
            Some(name) => self
                .get_output_device_by_name(name)
                .ok_or_else(|| AudioError::DeviceNotFound(name.to_string())),
            None => self
                .host
                .default_output_device()
                .ok_or(AudioError::NoOutputDevice),
        }
    }
}

impl Default for AudioDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
