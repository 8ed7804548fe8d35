//! Core constants for the fingerprint peripheral.
//!
//! This module collects every literal the capture flow depends on: the status
//! tokens printed by the sensor executable, the delimiters used to embed values
//! in those tokens, the default step cadence, the notification payload limits
//! and the GATT identifiers of the fingerprint service.
//!
//! # Driver Status Format
//!
//! The sensor executable writes a single line to standard output:
//!
//! ```text
//! SUCCESS                 open / close accepted
//! SUCCESS FINGER          finger detected
//! ENROLL START ::7        enrollment slot assigned
//! ENROLL SUCCESS ::41     capture step accepted
//! ENROLL FAILED ##100c    capture step rejected with a firmware code
//! SUCCESS ::12            identification matched slot 12
//! ```
//!
//! | Delimiter | Name | Purpose |
//! |-----------|------|---------|
//! | `::` | DELIMITER_VALUE | Precedes a numeric value (slot, step, match) |
//! | `##` | DELIMITER_ERROR | Precedes a hexadecimal firmware error code |
//!
//! # Usage
//!
//! ```
//! use printpi_core::constants::*;
//!
//! let status = "ENROLL START ::7";
//! let (_, value) = status.split_once(DELIMITER_VALUE).unwrap();
//! assert_eq!(value.trim(), "7");
//! assert_eq!(ENROLLMENT_STEPS, 3);
//! ```

use uuid::Uuid;

// ============================================================================
// Driver Status Tokens
// ============================================================================

/// Output of `open` and `close` when the sensor acknowledged the command.
pub const TOKEN_SUCCESS: &str = "SUCCESS";

/// Output of `finger` when a finger was detected on the sensor.
pub const TOKEN_FINGER_PRESSED: &str = "SUCCESS FINGER";

/// Phrase printed by the driver when a capture loop ran out of attempts.
///
/// The driver prints `ENROLL TIMEOUT` without any delimiter, so the reply
/// decoder maps this phrase onto [`CODE_CAPTURE_TIMEOUT`].
pub const PHRASE_TIMEOUT: &str = "TIMEOUT";

// ============================================================================
// Driver Status Delimiters
// ============================================================================

/// Primary delimiter, followed by a decimal value.
///
/// # Examples
///
/// ```
/// use printpi_core::constants::DELIMITER_VALUE;
///
/// let parts: Vec<&str> = "SUCCESS ::12".split(DELIMITER_VALUE).collect();
/// assert_eq!(parts, vec!["SUCCESS ", "12"]);
/// ```
pub const DELIMITER_VALUE: &str = "::";

/// Fallback delimiter, followed by a hexadecimal firmware error code.
///
/// # Examples
///
/// ```
/// use printpi_core::constants::DELIMITER_ERROR;
///
/// let parts: Vec<&str> = "ENROLL FAILED ##100c".split(DELIMITER_ERROR).collect();
/// assert_eq!(parts[1], "100c");
/// ```
pub const DELIMITER_ERROR: &str = "##";

// ============================================================================
// Driver Verbs
// ============================================================================

pub const VERB_OPEN: &str = "open";
pub const VERB_CLOSE: &str = "close";
pub const VERB_FINGER: &str = "finger";
pub const VERB_START: &str = "start";
pub const VERB_IDENTIFY: &str = "identify";

/// Argument passed to `start` so the sensor picks the enrollment slot itself.
pub const START_HOST_ARGUMENT: &str = "host";

// ============================================================================
// Firmware Error Codes
// ============================================================================

/// Highest enrollment slot on the sensor (slots are 0..=199).
///
/// A rejected third step reporting a value in this range means the finger is
/// already enrolled in that slot.
pub const MAX_ENROLLMENT_SLOT: u32 = 199;

/// Capture timed out.
pub const CODE_CAPTURE_TIMEOUT: u32 = 0x1001;

/// Image quality too low to extract features.
pub const CODE_BAD_FINGER: u32 = 0x100C;

/// Enrollment template could not be built.
pub const CODE_ENROLL_FAILED: u32 = 0x100D;

/// No finger on the sensor.
pub const CODE_FINGER_NOT_PRESSED: u32 = 0x1012;

// ============================================================================
// Capture Cadence
// ============================================================================

/// Number of capture steps needed to build an enrollment template.
pub const ENROLLMENT_STEPS: u8 = 3;

/// Number of capture passes for an identification.
pub const IDENTIFICATION_STEPS: u8 = 1;

/// Default wait passed to `finger`, in milliseconds.
///
/// The driver sleeps this long before sampling the sensor, giving the user
/// time to put a finger down after the first prompt.
pub const DEFAULT_FINGER_TIMEOUT_MS: u64 = 3000;

/// Default delay between finger detection and `start` / `identify`.
pub const DEFAULT_START_DELAY_MS: u64 = 2000;

/// Default delay inside a capture step before the re-place prompt.
pub const DEFAULT_PROMPT_DELAY_MS: u64 = 2000;

/// Default delay before each capture step invocation.
pub const DEFAULT_STEP_INTERVAL_MS: u64 = 3000;

/// Default hard timeout on a single driver invocation.
///
/// The `finger` wait is added on top of this value.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;

// ============================================================================
// Notification Payloads
// ============================================================================

/// Largest notification payload this peripheral will ever emit as one chunk.
///
/// A default ATT MTU of 23 leaves 20 bytes of characteristic value.
pub const MAX_NOTIFICATION_PAYLOAD: usize = 20;

/// Default template chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 15;

/// Literal sent after the last template chunk.
///
/// Sixteen bytes long. Chunks never reach that length, so a receiver can tell
/// the marker apart from a chunk by length alone.
pub const TRANSFER_COMPLETE_MARKER: &str = "PROCESS FINISHED";

/// Largest template chunk, one byte shorter than [`TRANSFER_COMPLETE_MARKER`].
pub const MAX_CHUNK_SIZE: usize = TRANSFER_COMPLETE_MARKER.len() - 1;

/// Default location of the template written by the driver.
pub const DEFAULT_TEMPLATE_PATH: &str = "./tpl.bin";

/// Default location of the sensor executable.
pub const DEFAULT_DRIVER_PATH: &str = "./SoftcomFingerPrintSDK";

// ============================================================================
// User Messages
// ============================================================================

pub const MSG_PLACE_FINGER: &str = "PLACE FINGER";

pub const MSG_REMOVE_FINGER: &str = "REMOVE FINGER";

/// Prompt used when `open` did not acknowledge but the flow carries on.
pub const MSG_DEVICE_NOT_READY: &str = "DEVICE NOT READY, PLACE FINGER";

pub const MSG_FINGER_NOT_PRESSED: &str = "Finger is not pressed";

pub const MSG_ENROLLMENT_NOT_STARTED: &str = "ENROLLMENT COULD NOT START";

pub const MSG_NOT_IDENTIFIED: &str =
    "Could not identify finger. Please try again or contact administrator.";

pub const MSG_TEMPLATE_UNAVAILABLE: &str = "TEMPLATE NOT AVAILABLE";

pub const MSG_DEVICE_ERROR: &str = "DEVICE ERROR";

/// Final message of a session stopped by its subscriber.
pub const MSG_CAPTURE_CANCELLED: &str = "CAPTURE CANCELLED";

/// Catalog fallback for codes the firmware table does not know.
pub const MSG_UNDEFINED_ERROR: &str = "UNDEFINED ERROR";

/// Suffix appended to a successful identification message.
pub const MSG_PROCESS_FINISHED_SUFFIX: &str = "[PROCESS FINISHED]";

// ============================================================================
// GATT Surface
// ============================================================================

/// Advertised name of the peripheral.
pub const DEFAULT_LOCAL_NAME: &str = "FingerprintPi";

/// Value of the read-only identification characteristic.
pub const DEFAULT_DEVICE_LABEL: &str = "MOONSHOT DOING SOFTWORK";

/// Period of the indicate-characteristic counter.
pub const DEFAULT_HEARTBEAT_MS: u64 = 2000;

pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x23edd8d1_70be_477d_b4e3_0fda81aa8d62);

/// Read-only characteristic exposing [`DEFAULT_DEVICE_LABEL`].
pub const LABEL_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xbe3674ee_001b_4d02_a641_0bde9e03d971);

/// Write characteristic accepting an action code.
pub const COMMAND_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x781ea64d_950f_488a_9682_e81d2a279e47);

/// Notify characteristic carrying session output.
pub const RESULT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xdbb9219f_8c07_4f69_a70b_2aabde4a3675);

/// Indicate characteristic carrying a heartbeat counter.
pub const HEARTBEAT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xa2758540_14e7_420b_b3e4_d70504462b6b);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chunk_fits_payload() {
        assert!(DEFAULT_CHUNK_SIZE <= MAX_CHUNK_SIZE);
        assert!(MAX_CHUNK_SIZE < TRANSFER_COMPLETE_MARKER.len());
        assert!(MAX_CHUNK_SIZE <= MAX_NOTIFICATION_PAYLOAD);
    }

    #[test]
    fn test_service_uuid_formatting() {
        assert_eq!(
            SERVICE_UUID.to_string(),
            "23edd8d1-70be-477d-b4e3-0fda81aa8d62"
        );
        assert_eq!(
            RESULT_CHARACTERISTIC_UUID.simple().to_string(),
            "dbb9219f8c074f69a70b2aabde4a3675"
        );
    }

    #[test]
    fn test_firmware_codes_are_above_slot_range() {
        for code in [
            CODE_CAPTURE_TIMEOUT,
            CODE_BAD_FINGER,
            CODE_ENROLL_FAILED,
            CODE_FINGER_NOT_PRESSED,
        ] {
            assert!(code > MAX_ENROLLMENT_SLOT);
        }
    }
}
