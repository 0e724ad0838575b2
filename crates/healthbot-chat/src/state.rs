//! Session state machine.
//!
//! Valid transitions:
//! - Idle -> Listening (voice input started)
//! - Idle -> AwaitingResponse (typed message submitted)
//! - Listening -> AwaitingResponse (utterance recognized)
//! - Listening -> Idle (recognition failed or heard nothing)
//! - AwaitingResponse -> Idle (reply or apology appended)

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::error::ChatError;

/// Phase of the conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Ready for a new submission or listen.
    Idle,
    /// Waiting on the speech recognizer.
    Listening,
    /// One backend request is in flight.
    AwaitingResponse,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Listening => write!(f, "Listening"),
            SessionState::AwaitingResponse => write!(f, "AwaitingResponse"),
        }
    }
}

impl SessionState {
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            (SessionState::Idle, SessionState::Listening)
                | (SessionState::Idle, SessionState::AwaitingResponse)
                | (SessionState::Listening, SessionState::AwaitingResponse)
                | (SessionState::Listening, SessionState::Idle)
                | (SessionState::AwaitingResponse, SessionState::Idle)
        )
    }
}

/// Owned session state with validated transitions.
///
/// Transitions are checked and applied under one lock, so two racing
/// callers can never both leave `Idle`.
#[derive(Debug)]
pub struct StateMachine {
    state: Mutex<SessionState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Idle),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> SessionState {
        *self.lock()
    }

    /// Move to `target` if the current state allows it.
    pub fn transition(&self, target: SessionState) -> Result<(), ChatError> {
        let mut state = self.lock();
        if state.can_transition_to(&target) {
            tracing::debug!("Session state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(ChatError::InvalidTransition {
                from: *state,
                to: target,
            })
        }
    }
}

/// Returns the session to `Idle` when dropped.
///
/// Held for the lifetime of every operation that leaves `Idle`, so a
/// dropped or failed operation can never strand the session.
pub(crate) struct IdleOnDrop<'a> {
    machine: &'a StateMachine,
}

impl<'a> IdleOnDrop<'a> {
    pub(crate) fn new(machine: &'a StateMachine) -> Self {
        Self { machine }
    }
}

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        let mut state = self.machine.lock();
        if *state != SessionState::Idle {
            tracing::debug!("Session state: {} -> Idle", *state);
            *state = SessionState::Idle;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Idle.to_string(), "Idle");
        assert_eq!(SessionState::Listening.to_string(), "Listening");
        assert_eq!(SessionState::AwaitingResponse.to_string(), "AwaitingResponse");
    }

    #[test]
    fn test_valid_transitions() {
        assert!(SessionState::Idle.can_transition_to(&SessionState::Listening));
        assert!(SessionState::Idle.can_transition_to(&SessionState::AwaitingResponse));
        assert!(SessionState::Listening.can_transition_to(&SessionState::AwaitingResponse));
        assert!(SessionState::Listening.can_transition_to(&SessionState::Idle));
        assert!(SessionState::AwaitingResponse.can_transition_to(&SessionState::Idle));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!SessionState::Idle.can_transition_to(&SessionState::Idle));
        assert!(!SessionState::Listening.can_transition_to(&SessionState::Listening));
        assert!(!SessionState::AwaitingResponse.can_transition_to(&SessionState::Listening));
        assert!(!SessionState::AwaitingResponse
            .can_transition_to(&SessionState::AwaitingResponse));
    }

    #[test]
    fn test_state_machine_starts_idle() {
        let sm = StateMachine::new();
        assert_eq!(sm.current(), SessionState::Idle);
    }

    #[test]
    fn test_voice_cycle() {
        let sm = StateMachine::new();
        sm.transition(SessionState::Listening).unwrap();
        sm.transition(SessionState::AwaitingResponse).unwrap();
        sm.transition(SessionState::Idle).unwrap();
        assert_eq!(sm.current(), SessionState::Idle);
    }

    #[test]
    fn test_second_submission_rejected_while_awaiting() {
        let sm = StateMachine::new();
        sm.transition(SessionState::AwaitingResponse).unwrap();

        let err = sm.transition(SessionState::AwaitingResponse).unwrap_err();
        assert!(matches!(
            err,
            ChatError::InvalidTransition {
                from: SessionState::AwaitingResponse,
                to: SessionState::AwaitingResponse,
            }
        ));
        assert!(sm.transition(SessionState::Listening).is_err());
        assert_eq!(sm.current(), SessionState::AwaitingResponse);
    }

    #[test]
    fn test_idle_on_drop() {
        let sm = StateMachine::new();
        sm.transition(SessionState::AwaitingResponse).unwrap();
        {
            let _guard = IdleOnDrop::new(&sm);
            assert_eq!(sm.current(), SessionState::AwaitingResponse);
        }
        assert_eq!(sm.current(), SessionState::Idle);
    }
}
