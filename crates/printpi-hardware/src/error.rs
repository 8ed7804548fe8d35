//! Error types for sensor driver operations.
//!
//! These errors describe failures of the driver invocation itself (the process
//! could not be started, timed out, or produced unusable output). A reply that
//! the sensor rejected is not an error at this layer; it is a
//! [`DeviceReply`](crate::reply::DeviceReply) with `success == false`.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while invoking the sensor driver.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The driver executable could not be started.
    #[error("Failed to start driver {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new spawn error.
    pub fn spawn(executable: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            executable: executable.into(),
            source,
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}
