//! Configuration loading for the fingerprint peripheral.
//!
//! Every section is optional; a missing file or key falls back to the
//! defaults in [`crate::constants`].
//!
//! # Config File Locations
//!
//! The most specific existing file is loaded:
//! 1. `--config <path>` (must exist)
//! 2. `./printpi.toml` (local override)
//! 3. `/etc/printpi/config.toml` (system)
//!
//! Environment variables (`PRINTPI_DRIVER`, `PRINTPI_TEMPLATE`,
//! `PRINTPI_LOG`) are applied on top.
//!
//! # Example Config
//!
//! ```toml
//! [driver]
//! executable = "/opt/softcom/SoftcomFingerPrintSDK"
//! step_verb = "enroll"
//!
//! [capture]
//! finger_timeout_ms = 3000
//! step_interval_ms = 3000
//! default_action = "identification"
//!
//! [transport]
//! template_path = "/var/lib/printpi/tpl.bin"
//! chunk_size = 15
//!
//! [catalog]
//! "1013" = "SENSOR DIRTY"
//! ```

use crate::constants::*;
use crate::error::{Error, Result};
use crate::types::{CaptureMode, StepVerb};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SYSTEM_CONFIG_PATH: &str = "/etc/printpi/config.toml";
pub const LOCAL_CONFIG_PATH: &str = "printpi.toml";

pub const ENV_DRIVER: &str = "PRINTPI_DRIVER";
pub const ENV_TEMPLATE: &str = "PRINTPI_TEMPLATE";
pub const ENV_LOG: &str = "PRINTPI_LOG";

/// Complete peripheral configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintpiConfig {
    pub driver: DriverConfig,
    pub capture: CaptureConfig,
    pub transport: TransportConfig,
    pub ble: BleConfig,
    /// Extra firmware error messages keyed by hexadecimal code.
    pub catalog: BTreeMap<String, String>,
    pub logging: LoggingConfig,
}

/// Sensor executable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub executable: PathBuf,
    pub call_timeout_ms: u64,
    pub step_verb: StepVerb,
    pub host_mode: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_DRIVER_PATH),
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            step_verb: StepVerb::default(),
            host_mode: true,
        }
    }
}

impl DriverConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Capture cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub finger_timeout_ms: u64,
    pub start_delay_ms: u64,
    pub prompt_delay_ms: u64,
    pub step_interval_ms: u64,
    pub default_action: CaptureMode,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            finger_timeout_ms: DEFAULT_FINGER_TIMEOUT_MS,
            start_delay_ms: DEFAULT_START_DELAY_MS,
            prompt_delay_ms: DEFAULT_PROMPT_DELAY_MS,
            step_interval_ms: DEFAULT_STEP_INTERVAL_MS,
            default_action: CaptureMode::default(),
        }
    }
}

/// Template artifact and chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub template_path: PathBuf,
    pub chunk_size: usize,
    pub delete_after_transfer: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            chunk_size: DEFAULT_CHUNK_SIZE,
            delete_after_transfer: true,
        }
    }
}

/// GATT front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    pub local_name: String,
    pub device_label: String,
    pub adapter: Option<String>,
    pub heartbeat_ms: u64,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            local_name: DEFAULT_LOCAL_NAME.to_string(),
            device_label: DEFAULT_DEVICE_LABEL.to_string(),
            adapter: None,
            heartbeat_ms: DEFAULT_HEARTBEAT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// File that was loaded, if any.
    pub file: Option<PathBuf>,
    /// Environment variables that overrode file values.
    pub env_overrides: Vec<String>,
}

impl PrintpiConfig {
    /// Discover, load, overlay and validate the configuration.
    ///
    /// # Errors
    /// Returns an error if an explicit `cli_path` does not exist, a file cannot
    /// be read or parsed, or the result fails validation.
    pub fn load(cli_path: Option<&Path>) -> Result<(Self, ConfigSources)> {
        let mut sources = ConfigSources::default();

        let mut config = match discover_config_file(cli_path)? {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                sources.file = Some(path);
                config
            }
            None => Self::default(),
        };

        sources.env_overrides = config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok((config, sources))
    }

    /// Load a single TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_toml_str(&contents, path)
    }

    /// Parse TOML text; `path` is only used in error messages.
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self> {
        toml::from_str(contents).map_err(|e: toml::de::Error| Error::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply `PRINTPI_*` overrides, returning the names of the variables used.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(v) = lookup(ENV_DRIVER).filter(|v| !v.is_empty()) {
            self.driver.executable = PathBuf::from(v);
            applied.push(ENV_DRIVER.to_string());
        }
        if let Some(v) = lookup(ENV_TEMPLATE).filter(|v| !v.is_empty()) {
            self.transport.template_path = PathBuf::from(v);
            applied.push(ENV_TEMPLATE.to_string());
        }
        if let Some(v) = lookup(ENV_LOG).filter(|v| !v.is_empty()) {
            self.logging.level = v;
            applied.push(ENV_LOG.to_string());
        }

        applied
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns `Error::Config` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let chunk = self.transport.chunk_size;
        if !(1..=MAX_CHUNK_SIZE).contains(&chunk) {
            return Err(Error::Config(format!(
                "transport.chunk_size must be 1-{MAX_CHUNK_SIZE}, got {chunk}"
            )));
        }

        if self.driver.call_timeout_ms == 0 {
            return Err(Error::Config(
                "driver.call_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.ble.heartbeat_ms == 0 {
            return Err(Error::Config(
                "ble.heartbeat_ms must be greater than zero".to_string(),
            ));
        }

        for code in self.catalog.keys() {
            let digits = code.trim().trim_start_matches("0x").trim_start_matches("0X");
            if u32::from_str_radix(digits, 16).is_err() {
                return Err(Error::Config(format!(
                    "catalog key {code:?} is not a hexadecimal code"
                )));
            }
        }

        Ok(())
    }
}

/// Pick the configuration file to load.
///
/// An explicit path must exist. Otherwise the local file wins over the system
/// file, and `None` means run on defaults.
pub fn discover_config_file(cli_path: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(Error::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let candidates = [PathBuf::from(LOCAL_CONFIG_PATH), PathBuf::from(SYSTEM_CONFIG_PATH)];
    let found = candidates.into_iter().find(|p| p.exists());
    if let Some(path) = &found {
        tracing::debug!("Using config file {}", path.display());
    }

    Ok(found)
}
