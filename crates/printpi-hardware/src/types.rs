//! Types shared by sensor driver implementations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Generic device information.
///
/// Describes the sensor behind a driver: a name, a model identifier and, for
/// the subprocess driver, the executable that talks to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "GT-511C3", "Mock Sensor").
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Executable invoked for each command, if any.
    pub executable: Option<PathBuf>,

    /// Optional firmware version string.
    pub firmware_version: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            executable: None,
            firmware_version: None,
        }
    }

    /// Set the executable.
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }
}
