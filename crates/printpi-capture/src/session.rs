//! One enrollment or identification run.
//!
//! A [`CaptureSession`] drives the sensor through
//! open → finger poll → capture steps → finalize, pushing prompts and results
//! to a [`ResultSink`] as it goes. Every delay and every driver call races the
//! session's cancellation token with a biased `select!`, so once
//! [`SessionCanceller::cancel`] is called the session performs no further
//! step, pushes no stale output, closes the device exactly once and ends in
//! `Cancelled`.
//!
//! Timing uses `tokio::time`, so tests run whole sessions under a paused
//! clock.
//!
//! ```text
//! open ─► finger(wait) ─► [start] ─► step 1 ─► step 2 ─► step 3 ─► template
//!                           │
//!                           └──────► identify ─► "<id> : Identified @ ..."
//! ```

use crate::error::SessionError;
use crate::sink::ResultSink;
use crate::state_machine::{CaptureState, StateMachine, StateTransition};
use crate::transport::TemplateTransport;
use printpi_core::config::CaptureConfig;
use printpi_core::constants::{
    MSG_CAPTURE_CANCELLED, MSG_DEVICE_NOT_READY, MSG_PLACE_FINGER, MSG_PROCESS_FINISHED_SUFFIX,
    MSG_REMOVE_FINGER,
};
use printpi_core::{CaptureMode, EnrollmentId};
use printpi_hardware::{DeviceReply, ErrorCatalog, ErrorCode, HardwareError, SensorDriver};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Fixed cadence of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTimings {
    /// Wait passed to the finger poll.
    pub finger_timeout: Duration,
    /// Delay between finger detection and `start` / `identify`.
    pub start_delay: Duration,
    /// Delay into steps 2 and up before the re-place prompt.
    pub prompt_delay: Duration,
    /// Delay before each capture step.
    pub step_interval: Duration,
}

impl CaptureTimings {
    /// All delays zero.
    pub fn immediate() -> Self {
        Self {
            finger_timeout: Duration::ZERO,
            start_delay: Duration::ZERO,
            prompt_delay: Duration::ZERO,
            step_interval: Duration::ZERO,
        }
    }
}

impl Default for CaptureTimings {
    fn default() -> Self {
        Self::from(&CaptureConfig::default())
    }
}

impl From<&CaptureConfig> for CaptureTimings {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            finger_timeout: Duration::from_millis(config.finger_timeout_ms),
            start_delay: Duration::from_millis(config.start_delay_ms),
            prompt_delay: Duration::from_millis(config.prompt_delay_ms),
            step_interval: Duration::from_millis(config.step_interval_ms),
        }
    }
}

/// Everything a session needs besides the driver and the sink.
///
/// Cheap to clone; the controller hands a copy to every session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub timings: CaptureTimings,
    pub catalog: Arc<ErrorCatalog>,
    pub transport: Arc<TemplateTransport>,
}

impl SessionContext {
    pub fn new(timings: CaptureTimings, catalog: ErrorCatalog, transport: TemplateTransport) -> Self {
        Self {
            timings,
            catalog: Arc::new(catalog),
            transport: Arc::new(transport),
        }
    }
}

/// Successful result of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionResult {
    /// Template streamed to the sink.
    Enrolled {
        id: EnrollmentId,
        bytes: usize,
        chunks: usize,
    },

    /// Finger matched an enrolled slot.
    Identified { id: i64 },
}

/// Terminal outcome of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOutcome {
    Succeeded(SessionResult),
    Failed(SessionError),
    Cancelled,
}

impl SessionOutcome {
    pub fn terminal_state(&self) -> CaptureState {
        match self {
            SessionOutcome::Succeeded(_) => CaptureState::Succeeded,
            SessionOutcome::Failed(_) => CaptureState::Failed,
            SessionOutcome::Cancelled => CaptureState::Cancelled,
        }
    }
}

/// What happened during a session, returned by [`CaptureSession::run`].
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub mode: CaptureMode,
    pub outcome: SessionOutcome,
    /// Capture step (or identify) invocations made.
    pub steps_invoked: u8,
    pub assigned_id: Option<EnrollmentId>,
    pub history: Vec<StateTransition>,
    pub elapsed: Duration,
}

impl SessionReport {
    pub fn final_state(&self) -> CaptureState {
        self.outcome.terminal_state()
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        match &self.outcome {
            SessionOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Requests cancellation of a running session.
///
/// Cancelling more than once, or after the session finished, has no effect.
#[derive(Debug, Clone, Default)]
pub struct SessionCanceller {
    token: CancellationToken,
}

impl SessionCanceller {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Why the session stopped early.
enum Halt {
    Cancelled,
    Failed(SessionError),
}

type Flow<T> = std::result::Result<T, Halt>;

/// One capture run for an immutable mode.
#[derive(Debug)]
pub struct CaptureSession {
    mode: CaptureMode,
    context: SessionContext,
    token: CancellationToken,
    machine: StateMachine,
    step_index: u8,
    steps_invoked: u8,
    assigned_id: Option<EnrollmentId>,
}

impl CaptureSession {
    pub fn new(mode: CaptureMode, context: SessionContext) -> Self {
        Self {
            mode,
            context,
            token: CancellationToken::new(),
            machine: StateMachine::new(),
            step_index: 0,
            steps_invoked: 0,
            assigned_id: None,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn state(&self) -> &CaptureState {
        self.machine.current_state()
    }

    /// Handle that cancels this session from another task.
    pub fn canceller(&self) -> SessionCanceller {
        SessionCanceller {
            token: self.token.clone(),
        }
    }

    /// Run the session to a terminal state.
    ///
    /// Exactly one final message reaches the sink: the success result (or
    /// template stream plus marker), the failure message, or the cancellation
    /// message after the device was closed.
    pub async fn run<D, S>(mut self, driver: &mut D, sink: &S) -> SessionReport
    where
        D: SensorDriver,
        S: ResultSink + ?Sized,
    {
        let started = Instant::now();
        tracing::info!(mode = %self.mode, "Capture session started");

        let flow = match self.mode {
            CaptureMode::Enrollment => self.enroll(driver, sink).await,
            CaptureMode::Identification => self.identify(driver, sink).await,
        };

        // A cancel that raced a failure still wins.
        let flow = match flow {
            Err(Halt::Failed(_)) if self.token.is_cancelled() => Err(Halt::Cancelled),
            other => other,
        };

        let outcome = match flow {
            Ok(result) => {
                self.finish(CaptureState::Succeeded);
                SessionOutcome::Succeeded(result)
            }
            Err(Halt::Failed(error)) => {
                sink.push_text(&error.to_string());
                self.finish(CaptureState::Failed);
                SessionOutcome::Failed(error)
            }
            Err(Halt::Cancelled) => {
                self.close_after_cancel(driver).await;
                sink.push_text(MSG_CAPTURE_CANCELLED);
                self.finish(CaptureState::Cancelled);
                SessionOutcome::Cancelled
            }
        };

        let report = SessionReport {
            mode: self.mode,
            outcome,
            steps_invoked: self.steps_invoked,
            assigned_id: self.assigned_id,
            history: self.machine.into_history(),
            elapsed: started.elapsed(),
        };

        tracing::info!(
            mode = %report.mode,
            state = %report.final_state(),
            steps = report.steps_invoked,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Capture session finished"
        );

        report
    }

    /// Open the device, wait for a finger and prompt for it.
    async fn prepare<D: SensorDriver, S: ResultSink + ?Sized>(
        &mut self,
        driver: &mut D,
        sink: &S,
    ) -> Flow<()> {
        self.transition(CaptureState::DeviceOpening)?;
        let opened = self.call(driver.open()).await?.is_success();
        if !opened {
            tracing::warn!("Sensor did not acknowledge open, continuing");
        }

        self.transition(CaptureState::AwaitingFingerPress)?;
        let wait = self.context.timings.finger_timeout;
        let finger = self.call(driver.poll_finger(wait)).await?;
        if !finger.is_success() {
            tracing::info!(reply = %finger, "No finger on the sensor");
            return Err(Halt::Failed(SessionError::FingerNotPressed));
        }

        self.emit(
            sink,
            if opened {
                MSG_PLACE_FINGER
            } else {
                MSG_DEVICE_NOT_READY
            },
        )
    }

    async fn enroll<D: SensorDriver, S: ResultSink + ?Sized>(
        &mut self,
        driver: &mut D,
        sink: &S,
    ) -> Flow<SessionResult> {
        self.prepare(driver, sink).await?;

        self.pause(self.context.timings.start_delay).await?;
        let start = self.call(driver.start_capture()).await?;
        let id = enrollment_id(&start).ok_or_else(|| {
            Halt::Failed(SessionError::EnrollmentNotStarted {
                reply: start.raw().to_string(),
            })
        })?;
        self.assigned_id = Some(id);
        tracing::info!(id = %id, "Enrollment started");

        let transport = Arc::clone(&self.context.transport);
        self.guard(transport.discard_stale())
            .await?
            .map_err(|e| Halt::Failed(SessionError::TemplateUnavailable { reason: e.to_string() }))?;

        let required = self.mode.required_steps();
        for step in 1..=required {
            self.transition(CaptureState::CapturingStep)?;
            self.step_index = step;
            self.wait_for_step(step, sink).await?;

            let reply = self.call(driver.capture_step(step)).await?;
            self.steps_invoked += 1;
            tracing::debug!(step, reply = %reply, "Capture step finished");

            if !reply.is_success() {
                return Err(Halt::Failed(self.rejected(step, &reply)));
            }
            if step < required {
                self.emit(sink, MSG_REMOVE_FINGER)?;
            }
        }

        self.transition(CaptureState::Finalizing)?;
        self.transition(CaptureState::StreamingTemplate)?;
        let summary = self
            .guard(transport.stream(sink))
            .await?
            .map_err(|e| {
                tracing::warn!(error = %e, "Template transfer failed");
                Halt::Failed(SessionError::TemplateUnavailable { reason: e.to_string() })
            })?;

        Ok(SessionResult::Enrolled {
            id,
            bytes: summary.bytes,
            chunks: summary.chunks,
        })
    }

    async fn identify<D: SensorDriver, S: ResultSink + ?Sized>(
        &mut self,
        driver: &mut D,
        sink: &S,
    ) -> Flow<SessionResult> {
        self.prepare(driver, sink).await?;

        self.transition(CaptureState::CapturingStep)?;
        self.step_index = 1;
        self.pause(self.context.timings.start_delay).await?;

        let reply = self.call(driver.identify()).await?;
        self.steps_invoked += 1;
        self.transition(CaptureState::Finalizing)?;

        match reply.value() {
            Some(id) if reply.is_success() => {
                tracing::info!(id, "Finger identified");
                let message = format!(
                    "{id} : Identified @ {} {MSG_PROCESS_FINISHED_SUFFIX}",
                    chrono::Local::now().to_rfc3339()
                );
                self.emit(sink, &message)?;
                Ok(SessionResult::Identified { id })
            }
            _ => Err(Halt::Failed(SessionError::NotIdentified {
                reply: reply.raw().to_string(),
            })),
        }
    }

    /// Delay before step `step`, with the re-place prompt for steps after the
    /// first.
    async fn wait_for_step<S: ResultSink + ?Sized>(&self, step: u8, sink: &S) -> Flow<()> {
        let timings = self.context.timings;
        if step > 1 {
            self.pause(timings.prompt_delay).await?;
            self.emit(sink, MSG_PLACE_FINGER)?;
            self.pause(timings.step_interval.saturating_sub(timings.prompt_delay))
                .await
        } else {
            self.pause(timings.step_interval).await
        }
    }

    fn rejected(&self, step: u8, reply: &DeviceReply) -> SessionError {
        let code = reply
            .error_code()
            .cloned()
            .unwrap_or_else(|| ErrorCode::Raw(reply.raw().to_ascii_uppercase()));
        let message = self.context.catalog.translate(&code).to_string();
        tracing::warn!(step, code = %code, message = %message, "Capture step rejected");

        SessionError::StepRejected {
            step,
            code,
            message,
        }
    }

    /// Race `future` against cancellation. Cancellation wins ties.
    async fn guard<F: Future>(&self, future: F) -> Flow<F::Output> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Halt::Cancelled),
            output = future => Ok(output),
        }
    }

    async fn pause(&self, duration: Duration) -> Flow<()> {
        if duration.is_zero() {
            return self.check_cancelled();
        }
        self.guard(tokio::time::sleep(duration)).await
    }

    async fn call<F>(&self, invocation: F) -> Flow<DeviceReply>
    where
        F: Future<Output = Result<DeviceReply, HardwareError>>,
    {
        match self.guard(invocation).await? {
            Ok(reply) => Ok(reply),
            Err(e) => {
                tracing::error!(state = %self.state(), error = %e, "Sensor driver call failed");
                Err(Halt::Failed(SessionError::Device {
                    reason: e.to_string(),
                }))
            }
        }
    }

    /// Push a message unless the session has been cancelled.
    fn emit<S: ResultSink + ?Sized>(&self, sink: &S, message: &str) -> Flow<()> {
        self.check_cancelled()?;
        sink.push_text(message);
        Ok(())
    }

    fn check_cancelled(&self) -> Flow<()> {
        if self.token.is_cancelled() {
            Err(Halt::Cancelled)
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, state: CaptureState) -> Flow<()> {
        self.check_cancelled()?;
        self.machine.transition_to(state).map(|_| ()).map_err(|e| {
            tracing::error!(error = %e, "Capture state machine rejected transition");
            Halt::Failed(SessionError::Device {
                reason: e.to_string(),
            })
        })
    }

    fn finish(&mut self, state: CaptureState) {
        let result = if state == CaptureState::Cancelled {
            self.machine.cancel().map(|_| ())
        } else {
            self.machine.transition_to(state).map(|_| ())
        };
        if let Err(e) = result {
            tracing::error!(error = %e, "Failed to record terminal state");
        }
    }

    async fn close_after_cancel<D: SensorDriver>(&self, driver: &mut D) {
        tracing::info!(state = %self.state(), step = self.step_index, "Capture session cancelled, closing sensor");
        match driver.close().await {
            Ok(reply) if reply.is_success() => {}
            Ok(reply) => tracing::warn!(reply = %reply, "Sensor did not acknowledge close"),
            Err(e) => tracing::warn!(error = %e, "Failed to close sensor"),
        }
    }
}

fn enrollment_id(reply: &DeviceReply) -> Option<EnrollmentId> {
    if !reply.is_success() {
        return None;
    }
    reply
        .value()
        .and_then(|value| i32::try_from(value).ok())
        .map(EnrollmentId::new)
}
