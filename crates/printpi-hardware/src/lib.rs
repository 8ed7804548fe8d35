//! Device driver adapter for the fingerprint sensor.
//!
//! The sensor is only reachable through its vendor SDK executable, which takes
//! one verb per invocation and answers with a single line of status text. This
//! crate hides that boundary behind the [`SensorDriver`] trait:
//!
//! - [`reply`] decodes status text into a typed [`DeviceReply`].
//! - [`catalog`] translates firmware error codes into user messages.
//! - [`process`] runs the SDK executable.
//! - [`mock`] provides a scripted sensor for tests and bench work.
//! - [`devices`] wraps both in [`AnySensorDriver`] for concrete dispatch.
//!
//! ```no_run
//! use printpi_hardware::{ProcessDriver, ProcessDriverConfig, SensorDriver};
//! use printpi_core::config::DriverConfig;
//! use std::time::Duration;
//!
//! async fn finger_present() -> printpi_hardware::Result<bool> {
//!     let mut driver = ProcessDriver::new(ProcessDriverConfig::from(&DriverConfig::default()));
//!     driver.open().await?;
//!     let reply = driver.poll_finger(Duration::from_millis(3000)).await?;
//!     driver.close().await?;
//!     Ok(reply.is_success())
//! }
//! ```
//!
//! # Error Handling
//!
//! [`HardwareError`] covers failures of the invocation itself. A reply the
//! sensor rejected is an `Ok(DeviceReply)` with `is_success() == false`.

pub mod catalog;
pub mod devices;
pub mod error;
pub mod mock;
pub mod process;
pub mod reply;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use catalog::{CatalogEntry, ErrorCatalog};
pub use devices::AnySensorDriver;
pub use error::{HardwareError, Result};
pub use process::{ProcessDriver, ProcessDriverConfig};
pub use reply::{DeviceReply, ErrorCode, StatusField, decode_status};
pub use traits::SensorDriver;
pub use types::DeviceInfo;
