//! Persistence of reusable session credentials.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Result, connector::Credentials};

const CREDENTIALS_FILE: &str = "creds.json";

/// Stores session credentials under the auth directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    /// Read stored credentials. `None` when the session was never paired.
    pub async fn load(&self) -> Result<Option<Credentials>> {
        match tokio::fs::read(self.path()).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist credentials. The previous file is only replaced once the new
    /// content is fully written.
    pub async fn save(&self, credentials: &Credentials) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let data = serde_json::to_vec_pretty(credentials)?;
        let tmp = self.dir.join(format!("{CREDENTIALS_FILE}.tmp"));
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, self.path()).await?;
        debug!(path = %self.path().display(), "saved session credentials");
        Ok(())
    }
}
