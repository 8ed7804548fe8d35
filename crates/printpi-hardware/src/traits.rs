//! Sensor driver trait definition.
//!
//! [`SensorDriver`] is the contract between the capture session and the
//! fingerprint sensor. Every command is a single request that yields one
//! [`DeviceReply`]; a reply the sensor rejected is still `Ok`, while `Err` is
//! reserved for failures of the invocation itself.
//!
//! The trait uses native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! so it is not object-safe. Use [`AnySensorDriver`](crate::devices::AnySensorDriver)
//! where a single concrete type is needed.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::reply::DeviceReply;
use crate::types::DeviceInfo;
use std::time::Duration;

/// Fingerprint sensor abstraction.
///
/// Calls are strictly sequential: implementations may assume exclusive access
/// for the duration of each call, which `&mut self` enforces.
///
/// # Examples
///
/// ```
/// use printpi_hardware::mock::MockSensor;
/// use printpi_hardware::traits::SensorDriver;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> printpi_hardware::Result<()> {
///     let (mut sensor, _handle) = MockSensor::new();
///
///     assert!(sensor.open().await?.is_success());
///     let reply = sensor.poll_finger(Duration::from_millis(10)).await?;
///     assert!(reply.is_success());
///     sensor.close().await?;
///
///     Ok(())
/// }
/// ```
pub trait SensorDriver: Send + Sync {
    /// Power the sensor up and open the link to it.
    async fn open(&mut self) -> Result<DeviceReply>;

    /// Release the sensor.
    async fn close(&mut self) -> Result<DeviceReply>;

    /// Report whether a finger is on the sensor after waiting `wait`.
    async fn poll_finger(&mut self, wait: Duration) -> Result<DeviceReply>;

    /// Begin an enrollment and obtain the slot the sensor assigned.
    async fn start_capture(&mut self) -> Result<DeviceReply>;

    /// Run capture step `step` (1-based) of an enrollment.
    ///
    /// On the last step a successful reply means the template artifact has
    /// been written.
    async fn capture_step(&mut self, step: u8) -> Result<DeviceReply>;

    /// Capture a finger and match it against the sensor's database.
    async fn identify(&mut self) -> Result<DeviceReply>;

    /// Get device information.
    async fn get_device_info(&self) -> Result<DeviceInfo>;
}
