//! Enum wrapper for sensor driver dispatch.
//!
//! Native `async fn` in traits (RPITIT) is not object-safe, so
//! `Box<dyn SensorDriver>` is not an option. [`AnySensorDriver`] gives the
//! session controller one concrete type whose futures are `Send`, which is
//! what `tokio::spawn` needs.
//!
//! # Examples
//!
//! ```
//! use printpi_hardware::devices::AnySensorDriver;
//! use printpi_hardware::mock::MockSensor;
//!
//! let (sensor, _handle) = MockSensor::new();
//! let driver = AnySensorDriver::Mock(sensor);
//! assert_eq!(driver.kind(), "mock");
//! ```

use crate::mock::MockSensor;
use crate::process::ProcessDriver;
use crate::traits::SensorDriver;
use crate::{DeviceInfo, DeviceReply, Result};
use std::time::Duration;

/// Enum wrapper for sensor driver dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySensorDriver {
    /// Vendor SDK executable.
    Process(ProcessDriver),

    /// Scripted mock sensor for development and testing.
    Mock(MockSensor),
}

impl AnySensorDriver {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Process(_) => "process",
            Self::Mock(_) => "mock",
        }
    }
}

impl From<ProcessDriver> for AnySensorDriver {
    fn from(driver: ProcessDriver) -> Self {
        Self::Process(driver)
    }
}

impl From<MockSensor> for AnySensorDriver {
    fn from(sensor: MockSensor) -> Self {
        Self::Mock(sensor)
    }
}

impl SensorDriver for AnySensorDriver {
    async fn open(&mut self) -> Result<DeviceReply> {
        match self {
            Self::Process(device) => device.open().await,
            Self::Mock(device) => device.open().await,
        }
    }

    async fn close(&mut self) -> Result<DeviceReply> {
        match self {
            Self::Process(device) => device.close().await,
            Self::Mock(device) => device.close().await,
        }
    }

    async fn poll_finger(&mut self, wait: Duration) -> Result<DeviceReply> {
        match self {
            Self::Process(device) => device.poll_finger(wait).await,
            Self::Mock(device) => device.poll_finger(wait).await,
        }
    }

    async fn start_capture(&mut self) -> Result<DeviceReply> {
        match self {
            Self::Process(device) => device.start_capture().await,
            Self::Mock(device) => device.start_capture().await,
        }
    }

    async fn capture_step(&mut self, step: u8) -> Result<DeviceReply> {
        match self {
            Self::Process(device) => device.capture_step(step).await,
            Self::Mock(device) => device.capture_step(step).await,
        }
    }

    async fn identify(&mut self) -> Result<DeviceReply> {
        match self {
            Self::Process(device) => device.identify().await,
            Self::Mock(device) => device.identify().await,
        }
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Process(device) => device.get_device_info().await,
            Self::Mock(device) => device.get_device_info().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::SensorVerb;

    #[tokio::test]
    async fn test_any_sensor_dispatches_to_mock() {
        let (sensor, handle) = MockSensor::new();
        let mut driver = AnySensorDriver::from(sensor);

        handle.reply(SensorVerb::Finger, "FAILED FINGER");
        let reply = driver.poll_finger(Duration::ZERO).await.unwrap();

        assert!(!reply.is_success());
        assert_eq!(handle.count(SensorVerb::Finger), 1);
    }

    #[tokio::test]
    async fn test_any_sensor_device_info() {
        let (sensor, _handle) = MockSensor::new();
        let driver = AnySensorDriver::Mock(sensor);

        let info = driver.get_device_info().await.unwrap();
        assert_eq!(info.name, "Mock Fingerprint Sensor");
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_any_sensor_futures_are_send() {
        let (sensor, _handle) = MockSensor::new();
        let mut driver = AnySensorDriver::Mock(sensor);
        assert_send(driver.capture_step(1));
    }
}
