//! WhatsApp bridge core.
//!
//! Inbound events from a linked WhatsApp session are classified, admitted,
//! staged and routed to a backend webhook. The session itself is provided by
//! a Baileys sidecar reached over a websocket.

pub mod admission;
pub mod backend;
pub mod bridge;
pub mod classify;
pub mod connector;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod media;
pub mod pipeline;
pub mod process;
pub mod router;
pub mod sidecar;
pub mod types;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod test_support;

pub use {
    admission::{AdmissionFilter, Rejection},
    backend::{Backend, ForwardPayload, WebhookBackend},
    bridge::{Bridge, LogPairingDisplay, PairingDisplay},
    classify::{ClassifiedMessage, InboundMedia, classify},
    connector::{CloseReason, Connection, Credentials, SessionConnector, SessionEvent},
    credentials::CredentialStore,
    error::{Error, Result},
    lifecycle::{Lifecycle, LifecycleAction, LifecycleEvent, transition},
    media::{MediaAttachment, MediaDownloader},
    pipeline::{Outcome, Pipeline},
    process::{SidecarLaunch, SidecarProcess, find_sidecar_dir},
    router::{RouteOutcome, Trigger, TriggerRouter},
    sidecar::{SidecarConnector, SidecarSession},
    types::WaMessage,
};
