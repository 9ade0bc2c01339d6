//! Trigger routing: decide whether an admitted message goes to the backend
//! and acknowledge it when it does.

use std::sync::Arc;

use {
    regex::Regex,
    satele_channels::{OutboundContent, SessionProvider},
    tracing::{debug, info, warn},
};

use crate::{
    Error, Result,
    backend::{Backend, ForwardPayload},
    classify::ClassifiedMessage,
    media::MediaAttachment,
};

/// Case-insensitive whole-word trigger.
#[derive(Debug, Clone)]
pub struct Trigger {
    word: String,
    pattern: Regex,
}

impl Trigger {
    pub fn new(word: &str) -> Result<Self> {
        let word = word.trim();
        if word.is_empty() {
            return Err(Error::message("trigger word is empty"));
        }
        let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))?;
        Ok(Self {
            word: word.to_string(),
            pattern,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Trigger word with its first letter upper-cased, as shown in
    /// acknowledgments.
    pub fn display_name(&self) -> String {
        let mut chars = self.word.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Result of routing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// No trigger and not an actionable voice note.
    Ignored,
    /// Forwarded and acknowledged.
    Forwarded,
    WebhookFailed,
    /// Forwarded, but the acknowledgment could not be sent.
    AckFailed,
}

pub struct TriggerRouter {
    trigger: Trigger,
    backend: Arc<dyn Backend>,
}

impl TriggerRouter {
    pub fn new(trigger: Trigger, backend: Arc<dyn Backend>) -> Self {
        Self { trigger, backend }
    }

    /// Whether `text` (with any media marker) should be forwarded.
    pub fn should_forward(
        &self,
        msg: &ClassifiedMessage,
        text: &str,
        attachment: Option<&MediaAttachment>,
    ) -> bool {
        self.trigger.matches(text) || (msg.media.is_voice() && attachment.is_some())
    }

    pub fn ack_text(&self, voice: bool) -> String {
        let name = self.trigger.display_name();
        if voice {
            format!("🎙️ [{name}] Listening...")
        } else {
            format!("🤖 [{name}] Working...")
        }
    }

    /// Forward to the backend, then acknowledge to the target. Failures are
    /// logged and reported in the outcome; nothing is retried.
    pub async fn route(
        &self,
        session: &dyn SessionProvider,
        msg: &ClassifiedMessage,
        text: &str,
        attachment: Option<&MediaAttachment>,
    ) -> RouteOutcome {
        if !self.should_forward(msg, text, attachment) {
            debug!(sender = %msg.sender, "no trigger, ignoring message");
            return RouteOutcome::Ignored;
        }

        let payload = ForwardPayload::new(
            text,
            msg.target.as_str(),
            msg.from_me,
            attachment.map(MediaAttachment::path_string),
        );
        if let Err(e) = self.backend.forward(&payload).await {
            warn!(target_id = %msg.target, error = %e, "webhook call failed");
            return RouteOutcome::WebhookFailed;
        }
        info!(
            target_id = %msg.target,
            from_me = msg.from_me,
            media = attachment.is_some(),
            "forwarded message to backend"
        );

        let ack = OutboundContent::text(self.ack_text(msg.media.is_voice()));
        match session.send(&msg.target, ack).await {
            Ok(()) => RouteOutcome::Forwarded,
            Err(e) => {
                warn!(target_id = %msg.target, error = %e, "failed to send acknowledgment");
                RouteOutcome::AckFailed
            },
        }
    }
}
