//! Bridge event loop.
//!
//! Drives one session at a time: connects, feeds lifecycle events to the
//! state machine, publishes the session for the gateway while it is open,
//! persists rotated credentials and pushes every inbound message through the
//! [`Pipeline`] in arrival order. Non-logout closes reconnect after the fixed
//! delay; a logout stops the loop.

use std::sync::Arc;

use {
    satele_channels::{BridgeStatus, SessionSlot},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    Result,
    connector::{CloseReason, Connection, Credentials, SessionConnector, SessionEvent},
    credentials::CredentialStore,
    lifecycle::{Lifecycle, LifecycleAction, LifecycleEvent},
    pipeline::Pipeline,
};

/// Out-of-band display of the pairing artifact.
pub trait PairingDisplay: Send + Sync {
    fn show(&self, code: &str);
}

/// Writes the pairing code to the log.
pub struct LogPairingDisplay;

impl PairingDisplay for LogPairingDisplay {
    fn show(&self, code: &str) {
        info!(
            pairing_code = code,
            "scan the pairing code from WhatsApp > Linked devices"
        );
    }
}

pub struct Bridge {
    connector: Arc<dyn SessionConnector>,
    credentials: CredentialStore,
    pipeline: Pipeline,
    slot: SessionSlot,
    lifecycle: Lifecycle,
    pairing: Arc<dyn PairingDisplay>,
}

impl Bridge {
    pub fn new(
        connector: Arc<dyn SessionConnector>,
        credentials: CredentialStore,
        pipeline: Pipeline,
        slot: SessionSlot,
        lifecycle: Lifecycle,
    ) -> Self {
        Self {
            connector,
            credentials,
            pipeline,
            slot,
            lifecycle,
            pairing: Arc::new(LogPairingDisplay),
        }
    }

    #[must_use]
    pub fn with_pairing_display(mut self, pairing: Arc<dyn PairingDisplay>) -> Self {
        self.pairing = pairing;
        self
    }

    pub fn slot(&self) -> &SessionSlot {
        &self.slot
    }

    pub fn status(&self) -> &BridgeStatus {
        self.lifecycle.status()
    }

    /// Run until cancelled or logged out.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut credentials = self.credentials.load().await?;
        if credentials.is_none() {
            info!(dir = %self.credentials.dir().display(), "no stored session, pairing required");
        }

        loop {
            self.lifecycle.apply(&LifecycleEvent::Connect);

            let attempt = tokio::select! {
                () = cancel.cancelled() => break,
                attempt = self.connector.connect(credentials.clone()) => attempt,
            };
            let action = match attempt {
                Ok(connection) => {
                    match self.drive(connection, &mut credentials, &cancel).await {
                        Some(action) => action,
                        None => break,
                    }
                },
                Err(e) => self
                    .lifecycle
                    .apply(&LifecycleEvent::ConnectFailed(e.to_string())),
            };

            match action {
                LifecycleAction::ScheduleReconnect(delay) => {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {},
                    }
                },
                LifecycleAction::Halt => break,
                other => {
                    debug!(?other, "unexpected action after connection ended");
                    break;
                },
            }
        }

        self.slot.clear().await;
        info!(state = %self.lifecycle.state(), "bridge stopped");
        Ok(())
    }

    /// Consume one connection's events until it closes. `None` on
    /// cancellation.
    async fn drive(
        &self,
        connection: Connection,
        credentials: &mut Option<Credentials>,
        cancel: &CancellationToken,
    ) -> Option<LifecycleAction> {
        let Connection {
            session,
            mut events,
        } = connection;

        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => return None,
                event = events.recv() => event,
            };
            let event = event.unwrap_or_else(|| {
                SessionEvent::Close(CloseReason::connection_lost("session event stream ended"))
            });

            match event {
                SessionEvent::PairingChallenge(code) => {
                    let action = self
                        .lifecycle
                        .apply(&LifecycleEvent::PairingChallenge(code.clone()));
                    if action == LifecycleAction::ShowPairing {
                        self.pairing.show(&code);
                    }
                },
                SessionEvent::Open { own_id } => {
                    let action = self.lifecycle.apply(&LifecycleEvent::Open { own_id });
                    if action == LifecycleAction::PublishSession {
                        self.slot.publish(Arc::clone(&session)).await;
                    }
                },
                SessionEvent::Close(reason) => {
                    self.slot.clear().await;
                    return Some(self.lifecycle.apply(&LifecycleEvent::Close(reason)));
                },
                SessionEvent::CredentialsUpdate(update) => {
                    if let Err(e) = self.credentials.save(&update).await {
                        warn!(error = %e, "failed to persist session credentials");
                    }
                    *credentials = Some(update);
                },
                SessionEvent::Messages(messages) => {
                    for message in &messages {
                        let outcome = self.pipeline.process(session.as_ref(), message).await;
                        debug!(?outcome, "processed inbound message");
                    }
                },
            }
        }
    }
}
