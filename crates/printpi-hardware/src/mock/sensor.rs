//! Mock fingerprint sensor for testing and development.
//!
//! The mock answers each verb from a scripted reply queue and falls back to a
//! happy-path reply when the queue is empty. Every call is appended to a log
//! shared with the [`MockSensorHandle`], so tests can assert the exact order
//! and number of driver invocations.

use crate::{
    HardwareError, Result,
    reply::DeviceReply,
    traits::SensorDriver,
    types::DeviceInfo,
};
use printpi_core::constants::{ENROLLMENT_STEPS, TOKEN_FINGER_PRESSED, TOKEN_SUCCESS};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Driver command, as seen by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorVerb {
    Open,
    Close,
    Finger,
    Start,
    Step,
    Identify,
}

impl fmt::Display for SensorVerb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SensorVerb::Open => "open",
            SensorVerb::Close => "close",
            SensorVerb::Finger => "finger",
            SensorVerb::Start => "start",
            SensorVerb::Step => "step",
            SensorVerb::Identify => "identify",
        };
        write!(f, "{name}")
    }
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorCall {
    pub verb: SensorVerb,

    /// Step number for [`SensorVerb::Step`], wait in milliseconds for
    /// [`SensorVerb::Finger`].
    pub argument: Option<u64>,
}

#[derive(Debug, Clone)]
struct ScriptedReply {
    outcome: std::result::Result<String, String>,
    latency: Duration,
}

#[derive(Debug, Default)]
struct SensorState {
    replies: HashMap<SensorVerb, VecDeque<ScriptedReply>>,
    calls: Vec<SensorCall>,
    template: Option<(PathBuf, Vec<u8>)>,
}

fn lock(state: &Mutex<SensorState>) -> MutexGuard<'_, SensorState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock fingerprint sensor.
///
/// Default replies, used whenever no reply is scripted for a verb:
///
/// | Verb | Reply |
/// |------|-------|
/// | open, close | `SUCCESS` |
/// | finger | `SUCCESS FINGER` |
/// | start | `ENROLL START ::0` |
/// | step n | `ENROLL SUCCESS ::n` |
/// | identify | `SUCCESS ::0` |
///
/// `poll_finger` sleeps for the requested wait before answering, as the real
/// driver does, so the cadence of a session is the same under a paused clock.
///
/// # Examples
///
/// ```
/// use printpi_hardware::mock::{MockSensor, SensorVerb};
/// use printpi_hardware::traits::SensorDriver;
///
/// #[tokio::main]
/// async fn main() -> printpi_hardware::Result<()> {
///     let (mut sensor, handle) = MockSensor::new();
///     handle.reply(SensorVerb::Step, "ENROLL FAILED ##100c");
///
///     let reply = sensor.capture_step(1).await?;
///     assert!(!reply.is_success());
///     assert_eq!(handle.count(SensorVerb::Step), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockSensor {
    state: Arc<Mutex<SensorState>>,
    name: String,
}

impl MockSensor {
    /// Create a new mock sensor with the default name.
    pub fn new() -> (Self, MockSensorHandle) {
        Self::with_name("Mock Fingerprint Sensor".to_string())
    }

    /// Create a new mock sensor with a custom name.
    pub fn with_name(name: String) -> (Self, MockSensorHandle) {
        let state = Arc::new(Mutex::new(SensorState::default()));

        let sensor = Self {
            state: Arc::clone(&state),
            name,
        };

        (sensor, MockSensorHandle { state })
    }

    /// Log the call and take the next scripted reply for `verb`.
    fn next_reply(&self, verb: SensorVerb, argument: Option<u64>) -> Option<ScriptedReply> {
        let mut state = lock(&self.state);
        state.calls.push(SensorCall { verb, argument });
        state.replies.get_mut(&verb).and_then(VecDeque::pop_front)
    }

    async fn respond(
        &self,
        verb: SensorVerb,
        argument: Option<u64>,
        default: impl FnOnce() -> String,
    ) -> Result<String> {
        let scripted = self.next_reply(verb, argument);

        let (outcome, latency) = match scripted {
            Some(reply) => (reply.outcome, reply.latency),
            None => (Ok(default()), Duration::ZERO),
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        outcome.map_err(HardwareError::communication)
    }

    async fn write_template(&self) -> Result<()> {
        let template = lock(&self.state).template.clone();
        if let Some((path, bytes)) = template {
            tokio::fs::write(&path, bytes).await?;
            tracing::debug!(path = %path.display(), "Mock sensor wrote template");
        }
        Ok(())
    }
}

impl SensorDriver for MockSensor {
    async fn open(&mut self) -> Result<DeviceReply> {
        let raw = self
            .respond(SensorVerb::Open, None, || TOKEN_SUCCESS.to_string())
            .await?;
        Ok(DeviceReply::acknowledgement(&raw))
    }

    async fn close(&mut self) -> Result<DeviceReply> {
        let raw = self
            .respond(SensorVerb::Close, None, || TOKEN_SUCCESS.to_string())
            .await?;
        Ok(DeviceReply::acknowledgement(&raw))
    }

    async fn poll_finger(&mut self, wait: Duration) -> Result<DeviceReply> {
        let millis = wait.as_millis() as u64;
        let scripted = self.next_reply(SensorVerb::Finger, Some(millis));

        tokio::time::sleep(wait).await;

        let (outcome, latency) = match scripted {
            Some(reply) => (reply.outcome, reply.latency),
            None => (Ok(TOKEN_FINGER_PRESSED.to_string()), Duration::ZERO),
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let raw = outcome.map_err(HardwareError::communication)?;
        Ok(DeviceReply::finger(&raw))
    }

    async fn start_capture(&mut self) -> Result<DeviceReply> {
        let raw = self
            .respond(SensorVerb::Start, None, || "ENROLL START ::0".to_string())
            .await?;
        Ok(DeviceReply::enrollment_start(&raw))
    }

    async fn capture_step(&mut self, step: u8) -> Result<DeviceReply> {
        let raw = self
            .respond(SensorVerb::Step, Some(u64::from(step)), || {
                format!("ENROLL SUCCESS ::{step}")
            })
            .await?;

        let reply = DeviceReply::capture_step(&raw);
        if reply.is_success() && step == ENROLLMENT_STEPS {
            self.write_template().await?;
        }
        Ok(reply)
    }

    async fn identify(&mut self) -> Result<DeviceReply> {
        let raw = self
            .respond(SensorVerb::Identify, None, || "SUCCESS ::0".to_string())
            .await?;
        Ok(DeviceReply::identification(&raw))
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new(self.name.clone(), "Mock Sensor v1.0").with_firmware_version("1.0.0"))
    }
}

/// Handle for scripting a [`MockSensor`] and inspecting its call log.
#[derive(Debug, Clone)]
pub struct MockSensorHandle {
    state: Arc<Mutex<SensorState>>,
}

impl MockSensorHandle {
    /// Queue the raw status text for the next call of `verb`.
    pub fn reply(&self, verb: SensorVerb, raw: impl Into<String>) {
        self.reply_after(verb, raw, Duration::ZERO);
    }

    /// Queue the raw status text, delivered after `latency`.
    pub fn reply_after(&self, verb: SensorVerb, raw: impl Into<String>, latency: Duration) {
        self.push(
            verb,
            ScriptedReply {
                outcome: Ok(raw.into()),
                latency,
            },
        );
    }

    /// Make the next call of `verb` fail as if the driver could not be run.
    pub fn fail(&self, verb: SensorVerb, message: impl Into<String>) {
        self.push(
            verb,
            ScriptedReply {
                outcome: Err(message.into()),
                latency: Duration::ZERO,
            },
        );
    }

    fn push(&self, verb: SensorVerb, reply: ScriptedReply) {
        lock(&self.state)
            .replies
            .entry(verb)
            .or_default()
            .push_back(reply);
    }

    /// Write `bytes` to `path` when the final enrollment step succeeds.
    pub fn produce_template(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        lock(&self.state).template = Some((path.into(), bytes));
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<SensorCall> {
        lock(&self.state).calls.clone()
    }

    /// Verbs of all calls made so far, in order.
    pub fn verbs(&self) -> Vec<SensorVerb> {
        lock(&self.state).calls.iter().map(|call| call.verb).collect()
    }

    /// Number of calls made with `verb`.
    pub fn count(&self, verb: SensorVerb) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| call.verb == verb)
            .count()
    }

    /// Scripted replies not yet consumed.
    pub fn pending(&self) -> usize {
        lock(&self.state).replies.values().map(VecDeque::len).sum()
    }
}
