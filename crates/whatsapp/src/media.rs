//! Media downloader: fetch an inbound payload and store it under the media
//! directory.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    futures::StreamExt,
    satele_channels::{MediaType, SessionProvider},
    tracing::{debug, warn},
};

use crate::{Error, Result, classify::InboundMedia};

/// A payload written to local storage. The file outlives this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub media_type: MediaType,
    pub extension: String,
    pub file_name: String,
    pub path: PathBuf,
}

impl MediaAttachment {
    /// Path as sent to the backend.
    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

pub struct MediaDownloader {
    dir: PathBuf,
    timeout: Duration,
    last_stamp: AtomicU64,
}

impl MediaDownloader {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        let dir = dir.into();
        let dir = std::path::absolute(&dir).unwrap_or(dir);
        Self {
            dir,
            timeout,
            last_stamp: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Download and store the payload of `media`.
    ///
    /// Failures are logged and reported as `None`; the caller carries on with
    /// the text content alone.
    pub async fn download(
        &self,
        session: &dyn SessionProvider,
        media: &InboundMedia,
    ) -> Option<MediaAttachment> {
        let (Some(message), Some(media_type), Some(extension)) =
            (media.message(), media.media_type(), media.extension())
        else {
            return None;
        };

        let fetch = async {
            let reference = message.media_ref()?;
            let mut stream = session.download_media(&reference, media_type).await?;
            let mut buffer = Vec::new();
            while let Some(chunk) = stream.next().await {
                buffer.extend_from_slice(&chunk?);
            }
            Ok::<_, Error>(buffer)
        };

        let bytes = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                warn!(%media_type, error = %e, "media download failed");
                return None;
            },
            Err(_) => {
                warn!(%media_type, timeout_secs = self.timeout.as_secs(), "media download timed out");
                return None;
            },
        };

        match self.store(&bytes, &extension).await {
            Ok((file_name, path)) => {
                debug!(%media_type, path = %path.display(), size = bytes.len(), "media stored");
                Some(MediaAttachment {
                    media_type,
                    extension,
                    file_name,
                    path,
                })
            },
            Err(e) => {
                warn!(%media_type, error = %e, "failed to store media");
                None
            },
        }
    }

    async fn store(&self, bytes: &[u8], extension: &str) -> Result<(String, PathBuf)> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!("{}.{extension}", self.next_stamp());
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok((file_name, path))
    }

    /// Millisecond timestamp, bumped past the previous one so that two
    /// downloads in the same millisecond never share a file name.
    fn next_stamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        let mut last = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(last.saturating_add(1));
            match self.last_stamp.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }
}
