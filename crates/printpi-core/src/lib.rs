//! Shared building blocks for the fingerprint peripheral.
//!
//! Constants for the sensor driver's status format, the domain types passed
//! between the driver adapter and the capture state machine, and the TOML
//! configuration.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::PrintpiConfig;
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
