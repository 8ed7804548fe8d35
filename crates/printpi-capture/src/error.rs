//! Error types of the capture layer.
//!
//! [`CaptureError`] is returned by the controller API. [`TransportError`]
//! describes template artifact problems. [`SessionError`] is not a Rust error
//! path at all: it is the reason a session ended in `Failed`, and its
//! `Display` is the message the sink receives.

use printpi_core::constants::{
    MSG_DEVICE_ERROR, MSG_ENROLLMENT_NOT_STARTED, MSG_FINGER_NOT_PRESSED, MSG_NOT_IDENTIFIED,
    MSG_TEMPLATE_UNAVAILABLE,
};
use printpi_hardware::{ErrorCode, HardwareError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CaptureError>;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Core(#[from] printpi_core::Error),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The controller task is gone.
    #[error("Session controller stopped")]
    ControllerStopped,

    /// The sensor driver was lost with a crashed session.
    #[error("Sensor driver unavailable")]
    DriverUnavailable,
}

/// Template artifact errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Template not found at {}", path.display())]
    Missing { path: PathBuf },

    #[error("Template at {} is empty", path.display())]
    Empty { path: PathBuf },

    #[error("Failed to access template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Chunk size must be at least 1")]
    InvalidChunkSize,
}

impl TransportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a session ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SessionError {
    #[error("{}", MSG_FINGER_NOT_PRESSED)]
    FingerNotPressed,

    /// `start` did not report an enrollment slot.
    #[error("{}", MSG_ENROLLMENT_NOT_STARTED)]
    EnrollmentNotStarted { reply: String },

    /// The sensor rejected a capture step.
    #[error("{message}")]
    StepRejected {
        step: u8,
        code: ErrorCode,
        message: String,
    },

    #[error("{}", MSG_NOT_IDENTIFIED)]
    NotIdentified { reply: String },

    #[error("{}", MSG_TEMPLATE_UNAVAILABLE)]
    TemplateUnavailable { reason: String },

    /// A driver invocation failed outright.
    #[error("{}", MSG_DEVICE_ERROR)]
    Device { reason: String },
}
