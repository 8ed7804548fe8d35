//! Typed decoding of the sensor driver's status text.
//!
//! The driver reports everything through one line of standard output. A value
//! follows the `::` delimiter, a hexadecimal firmware code follows `##`, and a
//! few phrases (`ENROLL TIMEOUT`) carry no delimiter at all. This module maps
//! those conventions onto [`StatusField`] and, per verb, onto a
//! [`DeviceReply`].
//!
//! # Examples
//!
//! ```
//! use printpi_hardware::reply::{DeviceReply, ErrorCode};
//!
//! let reply = DeviceReply::capture_step("ENROLL SUCCESS ::41");
//! assert!(reply.is_success());
//! assert_eq!(reply.value(), Some(41));
//!
//! let reply = DeviceReply::capture_step("ENROLL FAILED ##100c");
//! assert!(!reply.is_success());
//! assert_eq!(reply.error_code(), Some(&ErrorCode::Numeric(0x100C)));
//! ```

use printpi_core::constants::{
    CODE_CAPTURE_TIMEOUT, CODE_ENROLL_FAILED, DELIMITER_ERROR, DELIMITER_VALUE, PHRASE_TIMEOUT, TOKEN_FINGER_PRESSED,
    TOKEN_SUCCESS,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status phrases the driver prints without a delimiter, and the firmware
/// code each one stands for.
const STATUS_PHRASES: &[(&str, u32)] = &[(PHRASE_TIMEOUT, CODE_CAPTURE_TIMEOUT)];

/// Word marking a rejected capture step that still carries a `::` value.
///
/// The driver prints `ENROLL FAILED ::<step>`; the value is the step number,
/// not a result.
const FAILURE_WORD: &str = "FAIL";

/// Firmware error code reported by the driver.
///
/// Codes are normalised on parse: surrounding whitespace is trimmed, letters
/// are uppercased and a `0X` / `X` prefix is dropped, so `x100C`, `100c` and
/// `0x100C` are the same code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Hexadecimal firmware code.
    Numeric(u32),

    /// Text that is not a hexadecimal code, kept uppercased.
    Raw(String),
}

impl ErrorCode {
    /// Parse the text following a delimiter.
    pub fn parse(text: &str) -> Self {
        let normalized = text.trim().to_ascii_uppercase();
        let digits = normalized
            .strip_prefix("0X")
            .or_else(|| normalized.strip_prefix('X'))
            .unwrap_or(&normalized);

        match u32::from_str_radix(digits, 16) {
            Ok(code) => ErrorCode::Numeric(code),
            Err(_) => ErrorCode::Raw(normalized),
        }
    }

    /// Numeric value of the code, if it has one.
    #[must_use]
    pub fn as_numeric(&self) -> Option<u32> {
        match self {
            ErrorCode::Numeric(code) => Some(*code),
            ErrorCode::Raw(_) => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Numeric(code) => write!(f, "0x{code:04X}"),
            ErrorCode::Raw(text) => write!(f, "{text}"),
        }
    }
}

/// Payload extracted from a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusField {
    /// A decimal value followed `::`.
    Value(i64),

    /// A code followed `##`, or non-numeric text followed `::`.
    Error(ErrorCode),

    /// The line carries no delimiter.
    Absent,
}

/// Extract the delimited payload of a status line.
///
/// `::` takes precedence over `##`. Only the first whitespace-separated token
/// after the delimiter is considered.
pub fn decode_status(text: &str) -> StatusField {
    let text = text.trim();

    if let Some((_, rest)) = text.split_once(DELIMITER_VALUE) {
        let token = rest.split_whitespace().next().unwrap_or("");
        return match token.parse::<i64>() {
            Ok(value) => StatusField::Value(value),
            Err(_) => StatusField::Error(ErrorCode::parse(token)),
        };
    }

    if let Some((_, rest)) = text.split_once(DELIMITER_ERROR) {
        let token = rest.split_whitespace().next().unwrap_or("");
        return StatusField::Error(ErrorCode::parse(token));
    }

    StatusField::Absent
}

/// Structured result of one driver invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceReply {
    raw: String,
    success: bool,
    value: Option<i64>,
    error: Option<ErrorCode>,
}

impl DeviceReply {
    fn new(raw: &str, success: bool, value: Option<i64>, error: Option<ErrorCode>) -> Self {
        Self {
            raw: raw.trim().to_string(),
            success,
            value,
            error,
        }
    }

    /// Reply to `open` or `close`: success iff the text is exactly `SUCCESS`.
    pub fn acknowledgement(raw: &str) -> Self {
        Self::new(raw, raw.trim() == TOKEN_SUCCESS, None, None)
    }

    /// Reply to `finger`: success iff the text is exactly `SUCCESS FINGER`.
    pub fn finger(raw: &str) -> Self {
        Self::new(raw, raw.trim() == TOKEN_FINGER_PRESSED, None, None)
    }

    /// Reply to `start`: success iff an identifier follows `::`.
    pub fn enrollment_start(raw: &str) -> Self {
        match decode_status(raw) {
            StatusField::Value(id) => Self::new(raw, true, Some(id), None),
            StatusField::Error(code) => Self::new(raw, false, None, Some(code)),
            StatusField::Absent => Self::new(raw, false, None, None),
        }
    }

    /// Reply to a capture step.
    ///
    /// A numeric value means the step was accepted, whether it follows `::`
    /// or is the whole line. Anything else is an error code: the delimited
    /// text, a known status phrase, or failing both the whole line as a raw
    /// code. A line reporting a failure is rejected even with a `::` value,
    /// and maps to the enrollment-failed firmware code.
    pub fn capture_step(raw: &str) -> Self {
        match decode_status(raw) {
            StatusField::Value(_) if raw.to_ascii_uppercase().contains(FAILURE_WORD) => {
                Self::new(raw, false, None, Some(ErrorCode::Numeric(CODE_ENROLL_FAILED)))
            }
            StatusField::Value(value) => Self::new(raw, true, Some(value), None),
            StatusField::Error(code) => Self::new(raw, false, None, Some(code)),
            StatusField::Absent => {
                if let Ok(value) = raw.trim().parse::<i64>() {
                    return Self::new(raw, true, Some(value), None);
                }

                let upper = raw.trim().to_ascii_uppercase();
                let code = STATUS_PHRASES
                    .iter()
                    .find(|(phrase, _)| upper.contains(phrase))
                    .map(|(_, code)| ErrorCode::Numeric(*code))
                    .unwrap_or(ErrorCode::Raw(upper));
                Self::new(raw, false, None, Some(code))
            }
        }
    }

    /// Reply to `identify`: success iff a non-negative identity follows `::`.
    pub fn identification(raw: &str) -> Self {
        match decode_status(raw) {
            StatusField::Value(id) if id >= 0 => Self::new(raw, true, Some(id), None),
            StatusField::Value(_) | StatusField::Absent => Self::new(raw, false, None, None),
            StatusField::Error(code) => Self::new(raw, false, None, Some(code)),
        }
    }

    /// Trimmed status text as printed by the driver.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Numeric payload of a successful reply.
    pub fn value(&self) -> Option<i64> {
        self.value
    }

    /// Firmware code of a failed reply, when one was reported.
    pub fn error_code(&self) -> Option<&ErrorCode> {
        self.error.as_ref()
    }
}

impl fmt::Display for DeviceReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.raw)
    }
}
