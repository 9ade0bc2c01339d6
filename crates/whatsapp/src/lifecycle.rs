//! Connection lifecycle state machine.
//!
//! [`transition`] is pure: it maps a state and an event to the next state and
//! the action the bridge has to carry out. [`Lifecycle`] applies transitions
//! and mirrors them into the shared [`BridgeStatus`].

use std::time::Duration;

use {
    satele_channels::{BridgeStatus, ConnectionState},
    tracing::{info, warn},
};

use crate::connector::CloseReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A connection attempt starts.
    Connect,
    PairingChallenge(String),
    Open { own_id: String },
    Close(CloseReason),
    /// The attempt failed before any session event.
    ConnectFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    None,
    /// Emit the pairing artifact out of band.
    ShowPairing,
    /// Make the session available to the gateway.
    PublishSession,
    /// Withdraw the session and try again after the delay.
    ScheduleReconnect(Duration),
    /// Withdraw the session and stop reconnecting.
    Halt,
}

/// Next state and action for `event` in `state`.
pub fn transition(
    state: ConnectionState,
    event: &LifecycleEvent,
    reconnect_delay: Duration,
) -> (ConnectionState, LifecycleAction) {
    use {ConnectionState as S, LifecycleAction as A, LifecycleEvent as E};

    if state.is_terminal() {
        return (S::LoggedOut, A::None);
    }

    match event {
        E::Connect => (S::Connecting, A::None),
        E::PairingChallenge(_) => match state {
            S::Connecting | S::AwaitingPairing => (S::AwaitingPairing, A::ShowPairing),
            other => (other, A::None),
        },
        E::Open { .. } => (S::Connected, A::PublishSession),
        E::Close(reason) if reason.is_logout() => (S::LoggedOut, A::Halt),
        E::Close(_) | E::ConnectFailed(_) => {
            (S::Disconnected, A::ScheduleReconnect(reconnect_delay))
        },
    }
}

/// Owner of the process-wide connection state.
pub struct Lifecycle {
    status: BridgeStatus,
    reconnect_delay: Duration,
}

impl Lifecycle {
    pub fn new(status: BridgeStatus, reconnect_delay: Duration) -> Self {
        Self {
            status,
            reconnect_delay,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.status.state()
    }

    pub fn status(&self) -> &BridgeStatus {
        &self.status
    }

    pub fn apply(&self, event: &LifecycleEvent) -> LifecycleAction {
        let from = self.status.state();
        let (to, action) = transition(from, event, self.reconnect_delay);

        self.status.set_state(to);
        match event {
            LifecycleEvent::PairingChallenge(code) if action == LifecycleAction::ShowPairing => {
                self.status.set_pairing_code(code.as_str());
            },
            LifecycleEvent::Open { own_id } if to == ConnectionState::Connected => {
                self.status.set_own_id(own_id.as_str());
            },
            _ => {},
        }

        match (event, action) {
            (_, LifecycleAction::ScheduleReconnect(delay)) => {
                let reason = match event {
                    LifecycleEvent::Close(reason) => reason.to_string(),
                    LifecycleEvent::ConnectFailed(error) => error.clone(),
                    _ => String::new(),
                };
                warn!(%from, reason = %reason, delay_secs = delay.as_secs(), "connection closed, reconnecting");
            },
            (_, LifecycleAction::Halt) => {
                warn!(%from, "session logged out, not reconnecting");
            },
            (LifecycleEvent::Open { own_id }, _) => {
                info!(own_id = %own_id, "WhatsApp connected");
            },
            _ if from != to => info!(%from, %to, "connection state changed"),
            _ => {},
        }

        action
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    const DELAY: Duration = Duration::from_secs(5);

    fn open() -> LifecycleEvent {
        LifecycleEvent::Open {
            own_id: "111:2@s.whatsapp.net".into(),
        }
    }

    #[rstest]
    #[case(ConnectionState::Disconnected, LifecycleEvent::Connect, ConnectionState::Connecting, LifecycleAction::None)]
    #[case(ConnectionState::Connecting, LifecycleEvent::PairingChallenge("2@abc".into()), ConnectionState::AwaitingPairing, LifecycleAction::ShowPairing)]
    #[case(ConnectionState::AwaitingPairing, LifecycleEvent::PairingChallenge("2@def".into()), ConnectionState::AwaitingPairing, LifecycleAction::ShowPairing)]
    #[case(ConnectionState::Connected, LifecycleEvent::PairingChallenge("2@abc".into()), ConnectionState::Connected, LifecycleAction::None)]
    #[case(ConnectionState::Connecting, open(), ConnectionState::Connected, LifecycleAction::PublishSession)]
    #[case(ConnectionState::AwaitingPairing, open(), ConnectionState::Connected, LifecycleAction::PublishSession)]
    #[case(ConnectionState::Connected, LifecycleEvent::Close(CloseReason::new(Some(428), "closed")), ConnectionState::Disconnected, LifecycleAction::ScheduleReconnect(DELAY))]
    #[case(ConnectionState::Connected, LifecycleEvent::Close(CloseReason::connection_lost("eof")), ConnectionState::Disconnected, LifecycleAction::ScheduleReconnect(DELAY))]
    #[case(ConnectionState::Connecting, LifecycleEvent::ConnectFailed("refused".into()), ConnectionState::Disconnected, LifecycleAction::ScheduleReconnect(DELAY))]
    #[case(ConnectionState::Connected, LifecycleEvent::Close(CloseReason::logged_out()), ConnectionState::LoggedOut, LifecycleAction::Halt)]
    #[case(ConnectionState::AwaitingPairing, LifecycleEvent::Close(CloseReason::logged_out()), ConnectionState::LoggedOut, LifecycleAction::Halt)]
    #[case(ConnectionState::LoggedOut, LifecycleEvent::Connect, ConnectionState::LoggedOut, LifecycleAction::None)]
    fn transitions(
        #[case] from: ConnectionState,
        #[case] event: LifecycleEvent,
        #[case] to: ConnectionState,
        #[case] action: LifecycleAction,
    ) {
        assert_eq!(transition(from, &event, DELAY), (to, action));
    }

    #[test]
    fn status_tracks_pairing_and_identity() {
        let status = BridgeStatus::new();
        let lifecycle = Lifecycle::new(status.clone(), DELAY);

        lifecycle.apply(&LifecycleEvent::Connect);
        assert_eq!(
            lifecycle.apply(&LifecycleEvent::PairingChallenge("2@code".into())),
            LifecycleAction::ShowPairing
        );
        assert_eq!(status.snapshot().pairing_code.as_deref(), Some("2@code"));

        assert_eq!(lifecycle.apply(&open()), LifecycleAction::PublishSession);
        let snapshot = status.snapshot();
        assert_eq!(snapshot.state, ConnectionState::Connected);
        assert_eq!(snapshot.pairing_code, None);
        assert_eq!(snapshot.own_id.as_deref(), Some("111:2@s.whatsapp.net"));

        lifecycle.apply(&LifecycleEvent::Close(CloseReason::connection_lost("eof")));
        assert_eq!(status.snapshot().own_id, None);
    }

    #[test]
    fn logout_is_final() {
        let status = BridgeStatus::new();
        let lifecycle = Lifecycle::new(status.clone(), DELAY);

        lifecycle.apply(&LifecycleEvent::Connect);
        lifecycle.apply(&open());
        assert_eq!(
            lifecycle.apply(&LifecycleEvent::Close(CloseReason::logged_out())),
            LifecycleAction::Halt
        );
        assert_eq!(lifecycle.apply(&LifecycleEvent::Connect), LifecycleAction::None);
        assert_eq!(status.state(), ConnectionState::LoggedOut);
    }
}
