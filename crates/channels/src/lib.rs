//! Session seam shared by the bridge and the outbound gateway.
//!
//! The chat transport itself lives behind [`SessionProvider`]; this crate
//! holds the trait, the published session slot, the connection status and
//! the sender whitelist.

pub mod error;
pub mod gating;
pub mod provider;
pub mod slot;
pub mod status;

pub use {
    error::{Error, Result},
    gating::{Whitelist, bare_id},
    provider::{MediaRef, MediaStream, MediaType, OutboundContent, SessionProvider},
    slot::SessionSlot,
    status::{BridgeStatus, ConnectionState, StatusSnapshot},
};
