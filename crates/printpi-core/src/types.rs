use crate::{
    Result,
    constants::{ENROLLMENT_STEPS, IDENTIFICATION_STEPS},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a capture session does with the finger on the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Build a new template over [`ENROLLMENT_STEPS`] captures.
    Enrollment,

    /// Match the finger against the sensor's database.
    #[default]
    Identification,
}

impl CaptureMode {
    /// Number of capture passes this mode performs.
    #[must_use]
    pub fn required_steps(&self) -> u8 {
        match self {
            CaptureMode::Enrollment => ENROLLMENT_STEPS,
            CaptureMode::Identification => IDENTIFICATION_STEPS,
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CaptureMode::Enrollment => write!(f, "enrollment"),
            CaptureMode::Identification => write!(f, "identification"),
        }
    }
}

impl std::str::FromStr for CaptureMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enrollment" | "enrol" | "enroll" => Ok(CaptureMode::Enrollment),
            "identification" | "identify" => Ok(CaptureMode::Identification),
            other => Err(Error::UnknownCaptureMode(other.to_string())),
        }
    }
}

/// Single-byte action code written by the client to the command characteristic.
///
/// `A` selects enrollment and `B` selects identification. Only the first byte
/// of the write is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionCode(u8);

impl ActionCode {
    pub const ENROLL: ActionCode = ActionCode(b'A');
    pub const IDENTIFY: ActionCode = ActionCode(b'B');

    /// Parse the value of a command write.
    ///
    /// # Errors
    /// Returns `Error::InvalidActionCode` for an empty write or an unknown code.
    pub fn parse(value: &[u8]) -> Result<Self> {
        match value.first() {
            Some(b'A') => Ok(Self::ENROLL),
            Some(b'B') => Ok(Self::IDENTIFY),
            _ => Err(Error::InvalidActionCode(value.to_vec())),
        }
    }

    #[must_use]
    pub fn as_byte(&self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn mode(&self) -> CaptureMode {
        if *self == Self::ENROLL {
            CaptureMode::Enrollment
        } else {
            CaptureMode::Identification
        }
    }
}

impl From<CaptureMode> for ActionCode {
    fn from(mode: CaptureMode) -> Self {
        match mode {
            CaptureMode::Enrollment => ActionCode::ENROLL,
            CaptureMode::Identification => ActionCode::IDENTIFY,
        }
    }
}

/// Enrollment slot assigned by the sensor on `start`.
///
/// The host variant of the driver lets the sensor choose the slot and reports
/// `-1`, so the value is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrollmentId(i32);

impl EnrollmentId {
    #[must_use]
    pub fn new(id: i32) -> Self {
        EnrollmentId(id)
    }

    #[must_use]
    pub fn as_i32(&self) -> i32 {
        self.0
    }

    /// True when the sensor picked the slot itself.
    #[must_use]
    pub fn is_host_assigned(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verb used for a capture step.
///
/// Two driver builds exist: the host build takes `enroll <n>` and the older
/// build takes `enrol <n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepVerb {
    #[default]
    Enroll,
    Enrol,
}

impl StepVerb {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StepVerb::Enroll => "enroll",
            StepVerb::Enrol => "enrol",
        }
    }
}

impl fmt::Display for StepVerb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
