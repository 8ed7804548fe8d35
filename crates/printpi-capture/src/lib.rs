//! Capture flow of the fingerprint peripheral.
//!
//! - [`state_machine`] validates the capture lifecycle.
//! - [`session`] runs one enrollment or identification against a
//!   [`SensorDriver`](printpi_hardware::SensorDriver).
//! - [`transport`] streams the enrollment template in notification-sized chunks.
//! - [`sink`] is the outbound channel for everything a session produces.
//! - [`controller`] owns the driver and the action selector, and starts or
//!   cancels sessions on behalf of a front end.
//!
//! # State Flow
//!
//! ```text
//! Idle ─► DeviceOpening ─► AwaitingFingerPress ─► CapturingStep ─┬─► Finalizing ─► StreamingTemplate ─► Succeeded
//!                  │                 │                   ▲  │     │         │                  │
//!                  │                 │                   └──┘     │         └────► Succeeded   │
//!                  └────────┬────────┴──────────┬─────────────────┴─────────────────┬────────┘
//!                           ▼                   ▼                                   ▼
//!                         Failed             Failed                              Failed
//!
//! any non-terminal state ─► Cancelled
//! ```

pub mod controller;
pub mod error;
pub mod session;
pub mod sink;
pub mod state_machine;
pub mod transport;

pub use controller::{ControllerHandle, SessionController, SessionTicket};
pub use error::{CaptureError, Result, SessionError, TransportError};
pub use session::{
    CaptureSession, CaptureTimings, SessionCanceller, SessionContext, SessionOutcome,
    SessionReport, SessionResult,
};
pub use sink::{ChannelSink, RecordingSink, ResultSink};
pub use state_machine::{CaptureState, StateMachine, StateTransition};
pub use transport::{TemplateChunk, TemplateTransport, TransferSummary, chunk_template};
