//! Session controller.
//!
//! The controller is an actor task that owns the sensor driver and the
//! selected action. Front ends talk to it through a cloneable
//! [`ControllerHandle`]:
//!
//! ```text
//! ┌──────────┐  select_action   ┌────────────────┐   run(&mut driver)   ┌────────────────┐
//! │ BLE /    │─────────────────►│                │─────────────────────►│ CaptureSession │
//! │ console  │  subscribe(sink) │  Controller    │                      │ (spawned task) │
//! │ front end│─────────────────►│  actor (mpsc)  │◄─────────────────────│                │
//! └──────────┘  unsubscribe     └────────────────┘  (driver, report)    └────────────────┘
//! ```
//!
//! At most one session runs at a time. A subscribe while a session is still
//! running cancels that session, waits for it to close the device and only
//! then starts the new one. The driver travels into the session task and back,
//! so no two sessions ever share it.
//!
//! # Examples
//!
//! ```no_run
//! use printpi_capture::controller::SessionController;
//! use printpi_capture::session::SessionContext;
//! use printpi_capture::sink::ChannelSink;
//! use printpi_hardware::AnySensorDriver;
//! use printpi_hardware::mock::MockSensor;
//! use std::sync::Arc;
//!
//! # async fn example(context: SessionContext) -> printpi_capture::Result<()> {
//! let (sensor, _script) = MockSensor::new();
//! let handle = SessionController::new(AnySensorDriver::Mock(sensor), context).start();
//!
//! handle.select_action(b"A").await?;
//! let (sink, mut notifications) = ChannelSink::new();
//! let ticket = handle.subscribe(Arc::new(sink)).await?;
//!
//! while let Some(payload) = notifications.recv().await {
//!     println!("{}", String::from_utf8_lossy(&payload));
//! }
//! let report = ticket.report().await?;
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```

use crate::error::{CaptureError, Result};
use crate::session::{CaptureSession, SessionCanceller, SessionContext, SessionReport};
use crate::sink::ResultSink;
use printpi_core::{ActionCode, CaptureMode};
use printpi_hardware::AnySensorDriver;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};

const COMMAND_BUFFER: usize = 32;

type SessionTask = JoinHandle<(AnySensorDriver, SessionReport)>;

enum Command {
    SelectAction {
        value: Vec<u8>,
        reply: oneshot::Sender<Result<CaptureMode>>,
    },
    CurrentAction {
        reply: oneshot::Sender<CaptureMode>,
    },
    Subscribe {
        sink: Arc<dyn ResultSink>,
        reply: oneshot::Sender<Result<SessionTicket>>,
    },
    Unsubscribe {
        reply: oneshot::Sender<bool>,
    },
    Shutdown {
        reply: oneshot::Sender<Option<AnySensorDriver>>,
    },
}

/// Receipt for a started session.
#[derive(Debug)]
pub struct SessionTicket {
    mode: CaptureMode,
    report: oneshot::Receiver<SessionReport>,
}

impl SessionTicket {
    /// Mode snapshotted when the session started.
    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    /// Wait for the session to reach a terminal state.
    ///
    /// # Errors
    /// `ControllerStopped` if the session task was lost.
    pub async fn report(self) -> Result<SessionReport> {
        self.report.await.map_err(|_| CaptureError::ControllerStopped)
    }
}

struct RunningSession {
    mode: CaptureMode,
    canceller: SessionCanceller,
    task: SessionTask,
    report_tx: oneshot::Sender<SessionReport>,
}

enum Event {
    Command(Option<Command>),
    Finished(std::result::Result<(AnySensorDriver, SessionReport), JoinError>),
}

/// Owns the driver and the action selector until [`start`](Self::start)
/// moves it into its own task.
pub struct SessionController {
    driver: Option<AnySensorDriver>,
    context: SessionContext,
    action: CaptureMode,
    running: Option<RunningSession>,
}

impl SessionController {
    pub fn new(driver: AnySensorDriver, context: SessionContext) -> Self {
        Self {
            driver: Some(driver),
            context,
            action: CaptureMode::default(),
            running: None,
        }
    }

    /// Action used until the first command write.
    pub fn with_default_action(mut self, mode: CaptureMode) -> Self {
        self.action = mode;
        self
    }

    /// Spawn the actor on the current runtime.
    pub fn start(self) -> ControllerHandle {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(self.run(rx));
        ControllerHandle { commands }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::info!(action = %self.action, "Session controller started");

        loop {
            let event = tokio::select! {
                command = commands.recv() => Event::Command(command),
                finished = session_done(&mut self.running) => Event::Finished(finished),
            };

            match event {
                Event::Command(Some(Command::Shutdown { reply })) => {
                    self.stop_session().await;
                    let _ = reply.send(self.driver.take());
                    break;
                }
                Event::Command(Some(command)) => self.handle(command).await,
                Event::Command(None) => {
                    self.stop_session().await;
                    break;
                }
                Event::Finished(result) => {
                    if let Some(running) = self.running.take() {
                        self.reclaim(running.report_tx, result);
                    }
                }
            }
        }

        tracing::info!("Session controller stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::SelectAction { value, reply } => {
                let _ = reply.send(self.select_action(&value));
            }
            Command::CurrentAction { reply } => {
                let _ = reply.send(self.action);
            }
            Command::Subscribe { sink, reply } => {
                let _ = reply.send(self.subscribe(sink).await);
            }
            Command::Unsubscribe { reply } => {
                let _ = reply.send(self.stop_session().await);
            }
            Command::Shutdown { .. } => {}
        }
    }

    fn select_action(&mut self, value: &[u8]) -> Result<CaptureMode> {
        match ActionCode::parse(value) {
            Ok(code) => {
                self.action = code.mode();
                tracing::info!(action = %self.action, "Action selected");
                Ok(self.action)
            }
            Err(e) => {
                tracing::warn!(error = %e, action = %self.action, "Rejected action code");
                Err(e.into())
            }
        }
    }

    async fn subscribe(&mut self, sink: Arc<dyn ResultSink>) -> Result<SessionTicket> {
        if self.stop_session().await {
            tracing::info!("Previous session preempted by a new subscription");
        }

        let Some(mut driver) = self.driver.take() else {
            tracing::error!("Cannot start session, sensor driver was lost");
            return Err(CaptureError::DriverUnavailable);
        };

        let mode = self.action;
        let session = CaptureSession::new(mode, self.context.clone());
        let canceller = session.canceller();
        let task = tokio::spawn(async move {
            let report = session.run(&mut driver, &*sink).await;
            (driver, report)
        });

        let (report_tx, report) = oneshot::channel();
        self.running = Some(RunningSession {
            mode,
            canceller,
            task,
            report_tx,
        });

        Ok(SessionTicket { mode, report })
    }

    /// Cancel the running session and wait for it to hand the driver back.
    ///
    /// Returns whether a session was still in progress.
    async fn stop_session(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };

        let in_progress = !running.task.is_finished();
        if in_progress {
            tracing::debug!(mode = %running.mode, "Cancelling running session");
            running.canceller.cancel();
        }

        let result = running.task.await;
        self.reclaim(running.report_tx, result);
        in_progress
    }

    fn reclaim(
        &mut self,
        report_tx: oneshot::Sender<SessionReport>,
        result: std::result::Result<(AnySensorDriver, SessionReport), JoinError>,
    ) {
        match result {
            Ok((driver, report)) => {
                self.driver = Some(driver);
                match report.last_error() {
                    Some(error) => tracing::info!(
                        mode = %report.mode,
                        state = %report.final_state(),
                        steps = report.steps_invoked,
                        error = %error,
                        "Session report"
                    ),
                    None => tracing::info!(
                        mode = %report.mode,
                        state = %report.final_state(),
                        steps = report.steps_invoked,
                        "Session report"
                    ),
                }
                let _ = report_tx.send(report);
            }
            Err(e) => {
                tracing::error!(error = %e, "Session task ended abnormally");
            }
        }
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("action", &self.action)
            .field("driver_available", &self.driver.is_some())
            .field("running", &self.running.as_ref().map(|r| r.mode))
            .finish()
    }
}

async fn session_done(
    running: &mut Option<RunningSession>,
) -> std::result::Result<(AnySensorDriver, SessionReport), JoinError> {
    match running {
        Some(session) => (&mut session.task).await,
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running [`SessionController`].
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<Command>,
}

impl ControllerHandle {
    /// Handle a command write. Only the first byte is significant.
    ///
    /// # Errors
    /// `Core(InvalidActionCode)` for anything but `A` or `B`; the selection
    /// is left unchanged.
    pub async fn select_action(&self, value: &[u8]) -> Result<CaptureMode> {
        self.request(|reply| Command::SelectAction {
            value: value.to_vec(),
            reply,
        })
        .await?
    }

    pub async fn current_action(&self) -> Result<CaptureMode> {
        self.request(|reply| Command::CurrentAction { reply }).await
    }

    /// Start a session with the current action, preempting a running one.
    pub async fn subscribe(&self, sink: Arc<dyn ResultSink>) -> Result<SessionTicket> {
        self.request(|reply| Command::Subscribe { sink, reply })
            .await?
    }

    /// Cancel the running session, if any, and wait for it to close the
    /// device. Returns whether a session was cancelled.
    pub async fn unsubscribe(&self) -> Result<bool> {
        self.request(|reply| Command::Unsubscribe { reply }).await
    }

    /// Stop the controller, returning the driver if it is still owned.
    pub async fn shutdown(&self) -> Result<Option<AnySensorDriver>> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| CaptureError::ControllerStopped)?;
        response.await.map_err(|_| CaptureError::ControllerStopped)
    }
}

impl fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}
