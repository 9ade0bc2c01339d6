use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{Error, Result, provider::SessionProvider};

/// Published handle to the current session.
///
/// The connection lifecycle is the only writer; the gateway handlers only
/// read. A handle is cleared as soon as its connection closes, so readers
/// never observe a session that has been replaced.
#[derive(Clone, Default)]
pub struct SessionSlot {
    inner: Arc<RwLock<Option<Arc<dyn SessionProvider>>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published session.
    pub async fn publish(&self, session: Arc<dyn SessionProvider>) {
        *self.inner.write().await = Some(session);
    }

    /// Withdraw the published session.
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    pub async fn current(&self) -> Option<Arc<dyn SessionProvider>> {
        self.inner.read().await.clone()
    }

    /// The current session, or [`Error::NotConnected`].
    pub async fn require(&self) -> Result<Arc<dyn SessionProvider>> {
        self.current().await.ok_or(Error::NotConnected)
    }
}
