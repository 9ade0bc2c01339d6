use std::{path::PathBuf, pin::Pin};

use {
    async_trait::async_trait,
    bytes::Bytes,
    futures::Stream,
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// Media category as the transport names it when fetching content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Image,
    Document,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Image => write!(f, "image"),
            Self::Document => write!(f, "document"),
        }
    }
}

/// Opaque reference to an inbound media payload, handed back to the
/// provider verbatim when the content is fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(pub serde_json::Value);

/// Chunked media content in arrival order.
pub type MediaStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Payload of an outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundContent {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Document {
        path: PathBuf,
        mimetype: String,
        file_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl OutboundContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// A live, authenticated chat-transport session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Identity of the account owning the session, once known.
    fn own_id(&self) -> Option<String>;

    /// Send one message to `to`.
    async fn send(&self, to: &str, content: OutboundContent) -> Result<()>;

    /// Start fetching the full content of an inbound media payload.
    async fn download_media(&self, media: &MediaRef, media_type: MediaType)
    -> Result<MediaStream>;
}
