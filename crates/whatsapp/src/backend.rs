//! Backend webhook client.

use std::time::Duration;

use {async_trait::async_trait, reqwest::Client, serde::Serialize, tracing::debug};

use crate::Result;

/// Transport tag sent with every forwarded message.
pub const SOURCE_TAG: &str = "whatsapp";

/// Body of the webhook call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardPayload {
    pub text: String,
    /// Resolved target identity.
    pub sender: String,
    pub source: &'static str,
    pub from_me: bool,
    pub media_path: Option<String>,
}

impl ForwardPayload {
    pub fn new(
        text: impl Into<String>,
        sender: impl Into<String>,
        from_me: bool,
        media_path: Option<String>,
    ) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
            source: SOURCE_TAG,
            from_me,
            media_path,
        }
    }
}

/// Receiver of forwarded messages.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn forward(&self, payload: &ForwardPayload) -> Result<()>;
}

/// Posts forwarded messages as JSON to a fixed URL.
pub struct WebhookBackend {
    client: Client,
    url: String,
}

impl WebhookBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Backend for WebhookBackend {
    async fn forward(&self, payload: &ForwardPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;
        debug!(status = %response.status(), url = %self.url, "webhook accepted message");
        Ok(())
    }
}
