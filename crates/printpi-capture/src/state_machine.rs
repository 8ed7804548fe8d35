//! Capture session state machine.
//!
//! # States
//!
//! - `Idle`: session created, nothing sent to the sensor yet
//! - `DeviceOpening`: `open` in flight
//! - `AwaitingFingerPress`: polling for a finger, then starting the enrollment
//! - `CapturingStep`: one capture step (or the identification pass) in flight
//! - `Finalizing`: all steps accepted, result being resolved
//! - `StreamingTemplate`: template chunks being pushed to the sink
//! - `Succeeded`, `Failed`, `Cancelled`: terminal
//!
//! # Valid Transitions
//!
//! - Idle → DeviceOpening → AwaitingFingerPress → CapturingStep
//! - CapturingStep → CapturingStep → Finalizing
//! - Finalizing → StreamingTemplate → Succeeded
//! - Finalizing → Succeeded (identification)
//! - DeviceOpening, AwaitingFingerPress, CapturingStep, Finalizing and
//!   StreamingTemplate → Failed
//! - any non-terminal state → Cancelled
//!
//! # Examples
//!
//! ```
//! use printpi_capture::{CaptureState, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! assert_eq!(machine.current_state(), &CaptureState::Idle);
//!
//! machine.transition_to(CaptureState::DeviceOpening).unwrap();
//! assert!(machine.transition_to(CaptureState::Succeeded).is_err());
//!
//! machine.cancel().unwrap();
//! assert!(machine.current_state().is_terminal());
//! ```

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use printpi_core::{Error, Result};

/// Maximum number of state transitions to keep in history.
///
/// An enrollment takes eight transitions, so this holds every transition of
/// any session.
const MAX_HISTORY_SIZE: usize = 100;

/// Phase of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    DeviceOpening,
    AwaitingFingerPress,
    CapturingStep,
    Finalizing,
    StreamingTemplate,
    Succeeded,
    Failed,
    Cancelled,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            CaptureState::Idle => "Idle",
            CaptureState::DeviceOpening => "DeviceOpening",
            CaptureState::AwaitingFingerPress => "AwaitingFingerPress",
            CaptureState::CapturingStep => "CapturingStep",
            CaptureState::Finalizing => "Finalizing",
            CaptureState::StreamingTemplate => "StreamingTemplate",
            CaptureState::Succeeded => "Succeeded",
            CaptureState::Failed => "Failed",
            CaptureState::Cancelled => "Cancelled",
        };
        write!(f, "{}", state_str)
    }
}

impl CaptureState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use printpi_capture::CaptureState;
    ///
    /// assert!(CaptureState::Idle.can_transition_to(&CaptureState::DeviceOpening));
    /// assert!(CaptureState::CapturingStep.can_transition_to(&CaptureState::CapturingStep));
    /// assert!(!CaptureState::Idle.can_transition_to(&CaptureState::Succeeded));
    /// assert!(!CaptureState::Failed.can_transition_to(&CaptureState::Cancelled));
    /// ```
    pub fn can_transition_to(&self, target: &CaptureState) -> bool {
        if *target == CaptureState::Cancelled {
            return !self.is_terminal();
        }

        matches!(
            (self, target),
            // From Idle
            (CaptureState::Idle, CaptureState::DeviceOpening)
            // From DeviceOpening
            | (CaptureState::DeviceOpening, CaptureState::AwaitingFingerPress | CaptureState::Failed)
            // From AwaitingFingerPress
            | (CaptureState::AwaitingFingerPress, CaptureState::CapturingStep | CaptureState::Failed)
            // From CapturingStep
            | (CaptureState::CapturingStep, CaptureState::CapturingStep | CaptureState::Finalizing | CaptureState::Failed)
            // From Finalizing
            | (CaptureState::Finalizing, CaptureState::StreamingTemplate | CaptureState::Succeeded | CaptureState::Failed)
            // From StreamingTemplate
            | (CaptureState::StreamingTemplate, CaptureState::Succeeded | CaptureState::Failed)
        )
    }

    /// True for states with no exits.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CaptureState::Succeeded | CaptureState::Failed | CaptureState::Cancelled
        )
    }
}

/// A recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: CaptureState,
    pub to: CaptureState,
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: CaptureState, to: CaptureState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }
}

/// Validated state holder for one capture session.
///
/// Not thread-safe; the session that owns it is the only writer.
#[derive(Debug)]
pub struct StateMachine {
    current_state: CaptureState,
    history: VecDeque<StateTransition>,
}

impl StateMachine {
    /// New machine in `Idle` with an empty history.
    pub fn new() -> Self {
        Self {
            current_state: CaptureState::Idle,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn current_state(&self) -> &CaptureState {
        &self.current_state
    }

    /// Transition history, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Move to `new_state`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the requested transition is
    /// not valid for the current state. The machine is left unchanged.
    pub fn transition_to(&mut self, new_state: CaptureState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        tracing::debug!(from = %transition.from, to = %transition.to, "Capture state changed");

        self.current_state = new_state;
        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }

        Ok(transition)
    }

    /// Move to `Cancelled`.
    ///
    /// Returns `Ok(None)` when the machine is already terminal; cancelling a
    /// finished session has no effect.
    pub fn cancel(&mut self) -> Result<Option<StateTransition>> {
        if self.current_state.is_terminal() {
            return Ok(None);
        }
        self.transition_to(CaptureState::Cancelled).map(Some)
    }

    /// Consume the machine, returning its history.
    pub fn into_history(self) -> Vec<StateTransition> {
        self.history.into()
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    const ALL_STATES: [CaptureState; 9] = [
        CaptureState::Idle,
        CaptureState::DeviceOpening,
        CaptureState::AwaitingFingerPress,
        CaptureState::CapturingStep,
        CaptureState::Finalizing,
        CaptureState::StreamingTemplate,
        CaptureState::Succeeded,
        CaptureState::Failed,
        CaptureState::Cancelled,
    ];

    /// Valid path from `Idle` to each state.
    fn path_to(state: CaptureState) -> &'static [CaptureState] {
        use CaptureState::*;
        match state {
            Idle => &[],
            DeviceOpening => &[DeviceOpening],
            AwaitingFingerPress => &[DeviceOpening, AwaitingFingerPress],
            CapturingStep => &[DeviceOpening, AwaitingFingerPress, CapturingStep],
            Finalizing => &[DeviceOpening, AwaitingFingerPress, CapturingStep, Finalizing],
            StreamingTemplate => &[
                DeviceOpening,
                AwaitingFingerPress,
                CapturingStep,
                Finalizing,
                StreamingTemplate,
            ],
            Succeeded => &[
                DeviceOpening,
                AwaitingFingerPress,
                CapturingStep,
                Finalizing,
                Succeeded,
            ],
            Failed => &[DeviceOpening, Failed],
            Cancelled => &[Cancelled],
        }
    }

    fn machine_in(state: CaptureState) -> StateMachine {
        let mut machine = StateMachine::new();
        for next in path_to(state) {
            machine.transition_to(*next).unwrap();
        }
        assert_eq!(machine.current_state(), &state);
        machine
    }

    #[test]
    fn test_new_machine_starts_idle() {
        let machine = StateMachine::new();
        assert_eq!(machine.current_state(), &CaptureState::Idle);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_enrollment_path() {
        let mut machine = StateMachine::new();
        for state in [
            CaptureState::DeviceOpening,
            CaptureState::AwaitingFingerPress,
            CaptureState::CapturingStep,
            CaptureState::CapturingStep,
            CaptureState::CapturingStep,
            CaptureState::Finalizing,
            CaptureState::StreamingTemplate,
            CaptureState::Succeeded,
        ] {
            machine.transition_to(state).unwrap();
        }

        assert_eq!(machine.current_state(), &CaptureState::Succeeded);
        assert_eq!(machine.history().len(), 8);
        assert_eq!(machine.history()[0].from, CaptureState::Idle);
    }

    #[test]
    fn test_identification_path_skips_streaming() {
        let machine = machine_in(CaptureState::Succeeded);
        assert!(
            machine
                .history()
                .iter()
                .all(|t| t.to != CaptureState::StreamingTemplate)
        );
    }

    #[rstest]
    #[case(CaptureState::Idle, CaptureState::Succeeded)]
    #[case(CaptureState::Idle, CaptureState::CapturingStep)]
    #[case(CaptureState::AwaitingFingerPress, CaptureState::Finalizing)]
    #[case(CaptureState::StreamingTemplate, CaptureState::CapturingStep)]
    #[case(CaptureState::Idle, CaptureState::Failed)]
    fn test_invalid_transitions(#[case] from: CaptureState, #[case] to: CaptureState) {
        let mut machine = machine_in(from);
        let recorded = machine.history().len();

        let result = machine.transition_to(to);

        assert!(matches!(result, Err(Error::InvalidStateTransition { .. })));
        assert_eq!(machine.current_state(), &from);
        assert_eq!(machine.history().len(), recorded);
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for terminal in ALL_STATES.iter().filter(|s| s.is_terminal()) {
            for target in ALL_STATES {
                assert!(
                    !terminal.can_transition_to(&target),
                    "{terminal} -> {target} should be rejected"
                );
            }
        }
    }

    #[test]
    fn test_every_live_state_can_cancel() {
        for state in ALL_STATES.iter().filter(|s| !s.is_terminal()) {
            let mut machine = machine_in(*state);
            assert!(machine.cancel().unwrap().is_some());
        }
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut machine = machine_in(CaptureState::AwaitingFingerPress);

        let first = machine.cancel().unwrap();
        assert_eq!(
            first.map(|t| (t.from, t.to)),
            Some((CaptureState::AwaitingFingerPress, CaptureState::Cancelled))
        );

        assert!(machine.cancel().unwrap().is_none());
        assert_eq!(machine.history().len(), 3);
    }

    #[test]
    fn test_cancel_after_failure_is_noop() {
        let mut machine = machine_in(CaptureState::Failed);
        assert!(machine.cancel().unwrap().is_none());
        assert_eq!(machine.current_state(), &CaptureState::Failed);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut machine = machine_in(CaptureState::CapturingStep);
        for _ in 0..(MAX_HISTORY_SIZE + 20) {
            machine.transition_to(CaptureState::CapturingStep).unwrap();
        }
        assert_eq!(machine.history().len(), MAX_HISTORY_SIZE);
        assert_eq!(machine.into_history().len(), MAX_HISTORY_SIZE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transitions_are_timestamped() {
        let mut machine = StateMachine::new();
        machine.transition_to(CaptureState::DeviceOpening).unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        machine.transition_to(CaptureState::AwaitingFingerPress).unwrap();

        let history = machine.history();
        assert_eq!(
            history[1].timestamp - history[0].timestamp,
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_state_display_and_serialization() {
        assert_eq!(CaptureState::StreamingTemplate.to_string(), "StreamingTemplate");
        let json = serde_json::to_string(&CaptureState::AwaitingFingerPress).unwrap();
        assert_eq!(json, "\"awaiting_finger_press\"");
    }
}
