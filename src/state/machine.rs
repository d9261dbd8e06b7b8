use thiserror::Error;

/// High-level phases of the account session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// The shell has not started listening to auth transitions yet.
    Uninitialized,
    /// Waiting for the first auth-state delivery.
    Loading,
    /// A populated profile document backs the current identity.
    Authenticated,
    /// No identity, a missing profile document, or a recovered error.
    Unauthenticated,
}

/// Events applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The shell registered its auth-state listener.
    Start,
    /// The auth provider reported no identity, or the profile document does
    /// not exist.
    SignedOut,
    /// A populated profile document and the role list arrived.
    ProfileReady,
    /// A feed or role fetch failed; errors are transient and always route
    /// back to the unauthenticated state.
    TransportFailed,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// State machine implementing the session flow of the shell controller.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    phase: SessionPhase,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
        }
    }
}

impl SessionMachine {
    /// Create a machine in the uninitialized state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Apply an event, returning the new phase.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        self.phase = self.compute_transition(event)?;
        Ok(self.phase)
    }

    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        use SessionEvent::*;
        use SessionPhase::*;

        let next = match (self.phase, event) {
            (Uninitialized, Start) => Loading,
            (Loading | Authenticated | Unauthenticated, SignedOut) => Unauthenticated,
            (Loading | Authenticated | Unauthenticated, ProfileReady) => Authenticated,
            (Loading | Authenticated | Unauthenticated, TransportFailed) => Unauthenticated,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(machine: &mut SessionMachine, event: SessionEvent) -> SessionPhase {
        machine.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_uninitialized() {
        let machine = SessionMachine::new();
        assert_eq!(machine.phase(), SessionPhase::Uninitialized);
    }

    #[test]
    fn full_sign_in_and_out_flow() {
        let mut machine = SessionMachine::new();

        assert_eq!(apply(&mut machine, SessionEvent::Start), SessionPhase::Loading);
        assert_eq!(
            apply(&mut machine, SessionEvent::ProfileReady),
            SessionPhase::Authenticated
        );
        assert_eq!(
            apply(&mut machine, SessionEvent::SignedOut),
            SessionPhase::Unauthenticated
        );
        assert_eq!(
            apply(&mut machine, SessionEvent::ProfileReady),
            SessionPhase::Authenticated
        );
    }

    #[test]
    fn errors_route_back_to_unauthenticated() {
        let mut machine = SessionMachine::new();
        apply(&mut machine, SessionEvent::Start);
        apply(&mut machine, SessionEvent::ProfileReady);

        assert_eq!(
            apply(&mut machine, SessionEvent::TransportFailed),
            SessionPhase::Unauthenticated
        );
    }

    #[test]
    fn events_before_start_are_invalid() {
        let mut machine = SessionMachine::new();
        let err = machine.apply(SessionEvent::ProfileReady).unwrap_err();
        assert_eq!(err.from, SessionPhase::Uninitialized);
        assert_eq!(err.event, SessionEvent::ProfileReady);
    }

    #[test]
    fn start_cannot_be_applied_twice() {
        let mut machine = SessionMachine::new();
        apply(&mut machine, SessionEvent::Start);
        assert!(machine.apply(SessionEvent::Start).is_err());
    }
}
