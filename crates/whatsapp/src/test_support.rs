//! In-process doubles for the session, the connector and the backend.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use {
    async_trait::async_trait,
    bytes::Bytes,
    satele_channels::{
        Error, MediaRef, MediaStream, MediaType, OutboundContent, SessionProvider,
    },
    tokio::{sync::mpsc, time::Instant},
};

use crate::{
    backend::{Backend, ForwardPayload},
    connector::{Connection, Credentials, SessionConnector, SessionEvent},
    types::{MediaMessage, MessageContent, MessageKey, WaMessage},
};

pub fn text_event(remote_jid: &str, from_me: bool, text: &str) -> WaMessage {
    WaMessage {
        key: MessageKey {
            remote_jid: remote_jid.into(),
            from_me,
            id: Some("3EB0C0FFEE".into()),
            participant: None,
        },
        message: Some(MessageContent {
            conversation: Some(text.into()),
            ..Default::default()
        }),
        push_name: None,
    }
}

pub fn voice_event(remote_jid: &str, from_me: bool, text: Option<&str>) -> WaMessage {
    WaMessage {
        key: MessageKey {
            remote_jid: remote_jid.into(),
            from_me,
            ..Default::default()
        },
        message: Some(MessageContent {
            conversation: text.map(String::from),
            audio_message: Some(MediaMessage {
                ptt: Some(true),
                mimetype: Some("audio/ogg; codecs=opus".into()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        push_name: None,
    }
}

#[derive(Default)]
struct SessionState {
    own_id: Mutex<Option<String>>,
    sent: Mutex<Vec<(String, OutboundContent)>>,
    fail_sends: AtomicBool,
    media: Mutex<Option<Vec<satele_channels::Result<Bytes>>>>,
    downloads: Mutex<Vec<MediaType>>,
}

/// Session that records sends and serves one scripted media download.
#[derive(Clone, Default)]
pub struct MockSession {
    state: Arc<SessionState>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_own_id(self, own_id: &str) -> Self {
        *self.state.own_id.lock().unwrap() = Some(own_id.into());
        self
    }

    pub fn with_media(self, chunks: Vec<satele_channels::Result<Bytes>>) -> Self {
        *self.state.media.lock().unwrap() = Some(chunks);
        self
    }

    pub fn failing_sends(self) -> Self {
        self.state.fail_sends.store(true, Ordering::SeqCst);
        self
    }

    pub fn sent(&self) -> Vec<(String, OutboundContent)> {
        self.state.sent.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<(String, String)> {
        self.sent()
            .into_iter()
            .filter_map(|(to, content)| match content {
                OutboundContent::Text { text } => Some((to, text)),
                OutboundContent::Document { .. } => None,
            })
            .collect()
    }

    pub fn downloads(&self) -> Vec<MediaType> {
        self.state.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionProvider for MockSession {
    fn own_id(&self) -> Option<String> {
        self.state.own_id.lock().unwrap().clone()
    }

    async fn send(&self, to: &str, content: OutboundContent) -> satele_channels::Result<()> {
        if self.state.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::rejected("send refused"));
        }
        self.state.sent.lock().unwrap().push((to.into(), content));
        Ok(())
    }

    async fn download_media(
        &self,
        _media: &MediaRef,
        media_type: MediaType,
    ) -> satele_channels::Result<MediaStream> {
        self.state.downloads.lock().unwrap().push(media_type);
        match self.state.media.lock().unwrap().take() {
            Some(chunks) => Ok(Box::pin(futures::stream::iter(chunks))),
            None => Err(Error::rejected("no media available")),
        }
    }
}

/// Backend that records payloads.
#[derive(Default)]
pub struct MockBackend {
    payloads: Mutex<Vec<ForwardPayload>>,
    fail: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn payloads(&self) -> Vec<ForwardPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn forward(&self, payload: &ForwardPayload) -> crate::Result<()> {
        if self.fail {
            return Err(crate::Error::message("webhook unreachable"));
        }
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// One scripted connection.
pub enum Script {
    /// Deliver the events, then end the event stream.
    Events(Vec<SessionEvent>),
    /// Deliver the events and keep the stream open.
    Hold(Vec<SessionEvent>),
    /// Fail the connection attempt.
    Fail,
}

#[derive(Debug)]
pub struct Attempt {
    pub at: Instant,
    pub credentials: Option<Credentials>,
}

/// Connector that plays back scripts in order. Once the scripts run out,
/// every attempt gets a connection that stays open and silent.
pub struct MockConnector {
    session: MockSession,
    scripts: Mutex<VecDeque<Script>>,
    attempts: mpsc::UnboundedSender<Attempt>,
    held: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
}

impl MockConnector {
    pub fn new(session: MockSession) -> (Self, mpsc::UnboundedReceiver<Attempt>) {
        let (attempts, rx) = mpsc::unbounded_channel();
        let connector = Self {
            session,
            scripts: Mutex::default(),
            attempts,
            held: Mutex::default(),
        };
        (connector, rx)
    }

    pub fn script(self, script: Script) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }
}

#[async_trait]
impl SessionConnector for MockConnector {
    async fn connect(
        &self,
        credentials: Option<Credentials>,
    ) -> satele_channels::Result<Connection> {
        let _ = self.attempts.send(Attempt {
            at: Instant::now(),
            credentials,
        });

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Hold(Vec::new()));
        let (tx, rx) = mpsc::unbounded_channel();
        match script {
            Script::Fail => return Err(Error::NotConnected),
            Script::Events(events) => {
                for event in events {
                    let _ = tx.send(event);
                }
            },
            Script::Hold(events) => {
                for event in events {
                    let _ = tx.send(event);
                }
                self.held.lock().unwrap().push(tx);
            },
        }

        Ok(Connection {
            session: Arc::new(self.session.clone()),
            events: rx,
        })
    }
}
