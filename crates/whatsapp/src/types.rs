//! Wire types: the Baileys message subset the bridge reads, and the JSON
//! protocol spoken with the sidecar.

use {
    satele_channels::{MediaRef, MediaType, OutboundContent},
    serde::{Deserialize, Serialize},
};

use crate::connector::Credentials;

/// Server suffix of individual user JIDs.
pub const USER_JID_SUFFIX: &str = "@s.whatsapp.net";

/// One inbound message notification (`WAMessage`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaMessage {
    pub key: MessageKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    /// Chat the message belongs to.
    #[serde(default)]
    pub remote_jid: String,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Author inside a group chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
}

/// Content union of a message. Only the variants the bridge acts on are typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_text_message: Option<ExtendedTextMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_message: Option<MediaMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_message: Option<MediaMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_message: Option<MediaMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedTextMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Image, document or audio sub-message.
///
/// Fields the bridge does not read (media key, direct path, ...) are kept in
/// `rest` so the sub-message can be handed back verbatim for download.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    /// Push-to-talk flag on audio: set for recorded voice notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ptt: Option<bool>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl MediaMessage {
    pub fn is_voice_note(&self) -> bool {
        self.ptt == Some(true)
    }

    /// Reference used to fetch this payload's content.
    pub fn media_ref(&self) -> serde_json::Result<MediaRef> {
        serde_json::to_value(self).map(MediaRef)
    }
}

// ── Sidecar protocol ────────────────────────────────────────────────────────

/// Messages sent from the bridge to the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GatewayMessage {
    /// Open a transport session, resuming from stored credentials if any.
    Login { credentials: Option<Credentials> },
    #[serde(rename_all = "camelCase")]
    Send {
        request_id: String,
        to: String,
        content: OutboundContent,
    },
    #[serde(rename_all = "camelCase")]
    DownloadMedia {
        request_id: String,
        message: MediaRef,
        media_type: MediaType,
    },
}

/// Messages received from the sidecar.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SidecarMessage {
    /// Pairing challenge to display out of band.
    Qr { qr: String },
    Connected { jid: String },
    #[serde(rename_all = "camelCase")]
    Disconnected {
        #[serde(default)]
        status_code: Option<u16>,
        #[serde(default)]
        reason: Option<String>,
    },
    CredsUpdate { credentials: Credentials },
    Messages { messages: Vec<WaMessage> },
    #[serde(rename_all = "camelCase")]
    SendResult {
        request_id: String,
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    /// Base64 chunk of a media download.
    #[serde(rename_all = "camelCase")]
    MediaChunk { request_id: String, data: String },
    #[serde(rename_all = "camelCase")]
    MediaEnd { request_id: String },
    #[serde(rename_all = "camelCase")]
    MediaError { request_id: String, error: String },
    Error { error: String },
}
