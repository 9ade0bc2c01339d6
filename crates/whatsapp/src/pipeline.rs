//! Per-event pipeline: classify, admit, stage media, route.

use {satele_channels::SessionProvider, tracing::debug};

use crate::{
    admission::{AdmissionFilter, Rejection},
    classify::{classify, compose_text},
    media::MediaDownloader,
    router::{RouteOutcome, TriggerRouter},
    types::WaMessage,
};

/// What happened to one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No text and no usable media.
    Skipped,
    Rejected(Rejection),
    Routed(RouteOutcome),
}

pub struct Pipeline {
    admission: AdmissionFilter,
    downloader: MediaDownloader,
    router: TriggerRouter,
}

impl Pipeline {
    pub fn new(admission: AdmissionFilter, downloader: MediaDownloader, router: TriggerRouter) -> Self {
        Self {
            admission,
            downloader,
            router,
        }
    }

    /// Run one event to completion.
    pub async fn process(&self, session: &dyn SessionProvider, event: &WaMessage) -> Outcome {
        let own_id = session.own_id();
        let Some(msg) = classify(event, own_id.as_deref()) else {
            return Outcome::Skipped;
        };

        if let Err(rejection) = self.admission.check_sender(&msg.sender, msg.from_me) {
            debug!(sender = %msg.sender, %rejection, "dropping message");
            return Outcome::Rejected(rejection);
        }

        let attachment = if msg.media.is_none() {
            None
        } else {
            self.downloader.download(session, &msg.media).await
        };
        let marker = attachment.as_ref().and_then(|_| msg.media.marker());

        let Some(text) = compose_text(msg.text.as_deref(), marker.as_deref()) else {
            return Outcome::Skipped;
        };

        if let Err(rejection) = self.admission.check_text(&text) {
            debug!(sender = %msg.sender, %rejection, "dropping message");
            return Outcome::Rejected(rejection);
        }

        Outcome::Routed(
            self.router
                .route(session, &msg, &text, attachment.as_ref())
                .await,
        )
    }
}
