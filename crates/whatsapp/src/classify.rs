//! Inbound message classification: display text, media kind, target identity.

use satele_channels::{MediaType, bare_id};

use crate::types::{MediaMessage, MessageContent, USER_JID_SUFFIX, WaMessage};

/// Media carried by an event. Decided once per event, in priority order
/// voice note, image, document.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InboundMedia {
    #[default]
    None,
    Voice(MediaMessage),
    Image(MediaMessage),
    Document(MediaMessage),
}

impl InboundMedia {
    fn detect(content: &MessageContent) -> Self {
        if let Some(audio) = content
            .audio_message
            .as_ref()
            .filter(|a| a.is_voice_note())
        {
            Self::Voice(audio.clone())
        } else if let Some(image) = &content.image_message {
            Self::Image(image.clone())
        } else if let Some(document) = &content.document_message {
            Self::Document(document.clone())
        } else {
            Self::None
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn is_voice(&self) -> bool {
        matches!(self, Self::Voice(_))
    }

    pub fn message(&self) -> Option<&MediaMessage> {
        match self {
            Self::None => None,
            Self::Voice(m) | Self::Image(m) | Self::Document(m) => Some(m),
        }
    }

    /// Transport media type used to fetch the content.
    pub fn media_type(&self) -> Option<MediaType> {
        match self {
            Self::None => None,
            Self::Voice(_) => Some(MediaType::Audio),
            Self::Image(_) => Some(MediaType::Image),
            Self::Document(_) => Some(MediaType::Document),
        }
    }

    /// File extension for the stored payload.
    pub fn extension(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Voice(_) => Some("ogg".into()),
            Self::Image(_) => Some("jpg".into()),
            Self::Document(d) => Some(document_extension(d.file_name.as_deref())),
        }
    }

    /// Marker appended to the text once the payload is downloaded.
    pub fn marker(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Voice(_) => Some("[VOICE]".into()),
            Self::Image(_) => Some("[IMAGE]".into()),
            Self::Document(d) => Some(format!(
                "[FILE: {}]",
                d.file_name.as_deref().unwrap_or("unknown")
            )),
        }
    }
}

/// Extension declared by a document's file name, or `bin`.
pub fn document_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map_or_else(|| "bin".to_string(), String::from)
}

/// Derived view of one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedMessage {
    /// Extracted text before any media marker.
    pub text: Option<String>,
    pub media: InboundMedia,
    /// Originating chat identity, used for the whitelist.
    pub sender: String,
    /// Identity replies are addressed to.
    pub target: String,
    pub from_me: bool,
}

/// Classify one event. `None` when it carries neither text nor media.
///
/// `own_id` is the session owner's identity; self-authored events are
/// addressed to its canonical form.
pub fn classify(event: &WaMessage, own_id: Option<&str>) -> Option<ClassifiedMessage> {
    let content = event.message.as_ref()?;
    let sender = event.key.remote_jid.clone();
    if sender.is_empty() {
        return None;
    }

    let text = extract_text(content);
    let media = InboundMedia::detect(content);
    if text.is_none() && media.is_none() {
        return None;
    }

    let from_me = event.key.from_me;
    let target = match (from_me, own_id) {
        (true, Some(own)) => canonical_user_jid(own),
        _ => sender.clone(),
    };

    Some(ClassifiedMessage {
        text,
        media,
        sender,
        target,
        from_me,
    })
}

/// Text by precedence: plain body, extended body, image caption, document
/// caption. Empty strings are skipped.
pub fn extract_text(content: &MessageContent) -> Option<String> {
    [
        content.conversation.as_deref(),
        content
            .extended_text_message
            .as_ref()
            .and_then(|m| m.text.as_deref()),
        content
            .image_message
            .as_ref()
            .and_then(|m| m.caption.as_deref()),
        content
            .document_message
            .as_ref()
            .and_then(|m| m.caption.as_deref()),
    ]
    .into_iter()
    .flatten()
    .find(|t| !t.is_empty())
    .map(String::from)
}

/// `15551234567:4@s.whatsapp.net` becomes `15551234567@s.whatsapp.net`.
pub fn canonical_user_jid(jid: &str) -> String {
    format!("{}{USER_JID_SUFFIX}", bare_id(jid))
}

/// Join extracted text and a media marker with one space.
pub fn compose_text(text: Option<&str>, marker: Option<&str>) -> Option<String> {
    match (text.filter(|t| !t.is_empty()), marker) {
        (Some(t), Some(m)) => Some(format!("{t} {m}")),
        (Some(t), None) => Some(t.to_string()),
        (None, Some(m)) => Some(m.to_string()),
        (None, None) => None,
    }
}
