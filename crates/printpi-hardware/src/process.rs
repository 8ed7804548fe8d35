//! Sensor driver backed by the vendor SDK executable.
//!
//! Each command spawns the executable once with a verb and optional argument
//! and reads its single line of standard output. The exit status is never
//! inspected; the SDK prints its status and exits non-zero on success too.

use crate::error::{HardwareError, Result};
use crate::reply::DeviceReply;
use crate::traits::SensorDriver;
use crate::types::DeviceInfo;
use printpi_core::config::DriverConfig;
use printpi_core::constants::{
    START_HOST_ARGUMENT, VERB_CLOSE, VERB_FINGER, VERB_IDENTIFY, VERB_OPEN, VERB_START,
};
use printpi_core::types::StepVerb;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Settings of a [`ProcessDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDriverConfig {
    pub executable: PathBuf,
    pub call_timeout: Duration,
    pub step_verb: StepVerb,
    pub host_mode: bool,
}

impl From<&DriverConfig> for ProcessDriverConfig {
    fn from(config: &DriverConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            call_timeout: config.call_timeout(),
            step_verb: config.step_verb,
            host_mode: config.host_mode,
        }
    }
}

/// Drives the sensor by running its SDK executable once per command.
#[derive(Debug, Clone)]
pub struct ProcessDriver {
    config: ProcessDriverConfig,
}

impl ProcessDriver {
    pub fn new(config: ProcessDriverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessDriverConfig {
        &self.config
    }

    /// Run the executable and return its trimmed standard output.
    ///
    /// The call is bounded by the configured timeout plus `extra_wait`. The
    /// child is killed if the call times out or the future is dropped.
    async fn invoke(&self, verb: &str, args: &[&str], extra_wait: Duration) -> Result<String> {
        let executable = &self.config.executable;
        tracing::debug!(
            executable = %executable.display(),
            verb,
            ?args,
            "Invoking sensor driver"
        );

        let child = Command::new(executable)
            .arg(verb)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| HardwareError::spawn(executable.display().to_string(), e))?;

        let limit = self.config.call_timeout + extra_wait;
        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| HardwareError::timeout(limit.as_millis() as u64))??;

        if !output.stderr.is_empty() {
            tracing::debug!(
                verb,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Sensor driver wrote to stderr"
            );
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| {
            HardwareError::invalid_data(format!("{verb} produced non-UTF-8 output"))
        })?;
        let stdout = stdout.trim().to_string();

        tracing::debug!(verb, reply = %stdout, "Sensor driver replied");
        Ok(stdout)
    }
}

impl SensorDriver for ProcessDriver {
    async fn open(&mut self) -> Result<DeviceReply> {
        let raw = self.invoke(VERB_OPEN, &[], Duration::ZERO).await?;
        Ok(DeviceReply::acknowledgement(&raw))
    }

    async fn close(&mut self) -> Result<DeviceReply> {
        let raw = self.invoke(VERB_CLOSE, &[], Duration::ZERO).await?;
        Ok(DeviceReply::acknowledgement(&raw))
    }

    async fn poll_finger(&mut self, wait: Duration) -> Result<DeviceReply> {
        let millis = wait.as_millis().to_string();
        let raw = self.invoke(VERB_FINGER, &[millis.as_str()], wait).await?;
        Ok(DeviceReply::finger(&raw))
    }

    async fn start_capture(&mut self) -> Result<DeviceReply> {
        let args: &[&str] = if self.config.host_mode {
            &[START_HOST_ARGUMENT]
        } else {
            &[]
        };
        let raw = self.invoke(VERB_START, args, Duration::ZERO).await?;
        Ok(DeviceReply::enrollment_start(&raw))
    }

    async fn capture_step(&mut self, step: u8) -> Result<DeviceReply> {
        let step = step.to_string();
        let raw = self
            .invoke(self.config.step_verb.as_str(), &[step.as_str()], Duration::ZERO)
            .await?;
        Ok(DeviceReply::capture_step(&raw))
    }

    async fn identify(&mut self) -> Result<DeviceReply> {
        let raw = self.invoke(VERB_IDENTIFY, &[], Duration::ZERO).await?;
        Ok(DeviceReply::identification(&raw))
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new("GT-511C3", "Softcom Fingerprint SDK")
            .with_executable(self.config.executable.clone()))
    }
}
