//! Websocket client for the Baileys sidecar.
//!
//! One websocket connection carries one transport session. The reader task
//! turns sidecar messages into [`SessionEvent`]s and completes pending send
//! and download requests by request id.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
    task::{Context, Poll},
    time::Duration,
};

use {
    async_trait::async_trait,
    base64::{Engine as _, engine::general_purpose::STANDARD},
    bytes::Bytes,
    futures::{SinkExt, StreamExt},
    satele_channels::{
        Error, MediaRef, MediaStream, MediaType, OutboundContent, Result, SessionProvider,
    },
    tokio::sync::{mpsc, oneshot},
    tokio_stream::wrappers::ReceiverStream,
    tokio_tungstenite::tungstenite::Message,
    tracing::{debug, info, warn},
};

use crate::{
    connector::{CloseReason, Connection, Credentials, SessionConnector, SessionEvent},
    types::{GatewayMessage, SidecarMessage},
};

/// Chunks buffered per download before the reader waits on the consumer.
const MEDIA_CHUNK_BUFFER: usize = 32;

enum Pending {
    Send(oneshot::Sender<Result<()>>),
    Media(mpsc::Sender<MediaFrame>),
}

/// What the reader task hands to a download stream.
enum MediaFrame {
    Chunk(Bytes),
    End,
    Failed(Error),
}

type PendingMap = Arc<Mutex<HashMap<String, Pending>>>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<String, Pending>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connects to a sidecar listening on a websocket URL.
pub struct SidecarConnector {
    url: String,
    send_timeout: Duration,
}

impl SidecarConnector {
    pub fn new(url: impl Into<String>, send_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            send_timeout,
        }
    }
}

#[async_trait]
impl SessionConnector for SidecarConnector {
    async fn connect(&self, credentials: Option<Credentials>) -> Result<Connection> {
        debug!(url = %self.url, "connecting to WhatsApp sidecar");
        let (ws, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| Error::transport("connect to sidecar", e))?;
        let (mut sink, stream) = ws.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<GatewayMessage>(64);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let own_id = Arc::new(OnceLock::new());

        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "failed to encode sidecar message");
                        continue;
                    },
                };
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    warn!(error = %e, "sidecar write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(read_loop(
            stream,
            event_tx,
            Arc::clone(&pending),
            Arc::clone(&own_id),
        ));

        outbound_tx
            .send(GatewayMessage::Login { credentials })
            .await
            .map_err(|_| Error::NotConnected)?;

        info!(url = %self.url, "connected to WhatsApp sidecar");

        let session = SidecarSession {
            outbound: outbound_tx,
            pending,
            own_id,
            send_timeout: self.send_timeout,
        };
        Ok(Connection {
            session: Arc::new(session),
            events: event_rx,
        })
    }
}

async fn read_loop<S>(
    mut stream: S,
    events: mpsc::UnboundedSender<SessionEvent>,
    pending: PendingMap,
    own_id: Arc<OnceLock<String>>,
) where
    S: futures::Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    let mut close = CloseReason::connection_lost("sidecar connection closed");

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                close = CloseReason::connection_lost(format!("sidecar read failed: {e}"));
                break;
            },
        };

        let msg: SidecarMessage = match serde_json::from_str(text.as_str()) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "ignoring malformed sidecar message");
                continue;
            },
        };

        let event = match msg {
            SidecarMessage::Qr { qr } => SessionEvent::PairingChallenge(qr),
            SidecarMessage::Connected { jid } => {
                let _ = own_id.set(jid.clone());
                SessionEvent::Open { own_id: jid }
            },
            SidecarMessage::Disconnected {
                status_code,
                reason,
            } => {
                close = CloseReason::new(
                    status_code,
                    reason.unwrap_or_else(|| "connection closed".into()),
                );
                break;
            },
            SidecarMessage::CredsUpdate { credentials } => {
                SessionEvent::CredentialsUpdate(credentials)
            },
            SidecarMessage::Messages { messages } => SessionEvent::Messages(messages),
            SidecarMessage::SendResult {
                request_id,
                success,
                error,
            } => {
                complete_send(&pending, &request_id, success, error);
                continue;
            },
            SidecarMessage::MediaChunk { request_id, data } => {
                forward_chunk(&pending, &request_id, &data).await;
                continue;
            },
            SidecarMessage::MediaEnd { request_id } => {
                finish_media(&pending, &request_id, MediaFrame::End).await;
                continue;
            },
            SidecarMessage::MediaError { request_id, error } => {
                finish_media(&pending, &request_id, MediaFrame::Failed(Error::rejected(error)))
                    .await;
                continue;
            },
            SidecarMessage::Error { error } => {
                warn!(error, "sidecar error");
                continue;
            },
        };

        if events.send(event).is_err() {
            debug!("session event receiver dropped");
            break;
        }
    }

    fail_pending(&pending);
    let _ = events.send(SessionEvent::Close(close));
}

fn complete_send(pending: &PendingMap, request_id: &str, success: bool, error: Option<String>) {
    match lock(pending).remove(request_id) {
        Some(Pending::Send(tx)) => {
            let result = if success {
                Ok(())
            } else {
                Err(Error::rejected(
                    error.unwrap_or_else(|| "send failed".into()),
                ))
            };
            let _ = tx.send(result);
        },
        Some(Pending::Media(_)) | None => {
            debug!(request_id, "send result for unknown request");
        },
    }
}

async fn forward_chunk(pending: &PendingMap, request_id: &str, data: &str) {
    let sender = match lock(pending).get(request_id) {
        Some(Pending::Media(tx)) => tx.clone(),
        _ => {
            debug!(request_id, "media chunk for unknown request");
            return;
        },
    };
    let frame = match STANDARD.decode(data) {
        Ok(bytes) => MediaFrame::Chunk(Bytes::from(bytes)),
        Err(e) => MediaFrame::Failed(Error::invalid_input(format!("media chunk: {e}"))),
    };
    let failed = matches!(frame, MediaFrame::Failed(_));
    if sender.send(frame).await.is_err() || failed {
        lock(pending).remove(request_id);
    }
}

async fn finish_media(pending: &PendingMap, request_id: &str, frame: MediaFrame) {
    let sender = match lock(pending).remove(request_id) {
        Some(Pending::Media(tx)) => tx,
        _ => return,
    };
    let _ = sender.send(frame).await;
}

/// Fails every in-flight request. Download senders are dropped, which their
/// streams report as an interrupted transfer.
fn fail_pending(pending: &PendingMap) {
    let drained: Vec<Pending> = lock(pending).drain().map(|(_, request)| request).collect();
    for request in drained {
        if let Pending::Send(tx) = request {
            let _ = tx.send(Err(Error::NotConnected));
        }
    }
}

/// Chunk stream of one download.
///
/// Ends cleanly only on `mediaEnd`. A channel that closes before that yields
/// `NotConnected`. Dropping the stream unregisters the request.
struct MediaDownload {
    request_id: String,
    frames: ReceiverStream<MediaFrame>,
    pending: PendingMap,
    done: bool,
}

impl futures::Stream for MediaDownload {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        let item = match futures::ready!(this.frames.poll_next_unpin(cx)) {
            Some(MediaFrame::Chunk(bytes)) => return Poll::Ready(Some(Ok(bytes))),
            Some(MediaFrame::End) => None,
            Some(MediaFrame::Failed(e)) => Some(Err(e)),
            None => Some(Err(Error::NotConnected)),
        };
        this.done = true;
        Poll::Ready(item)
    }
}

impl Drop for MediaDownload {
    fn drop(&mut self) {
        lock(&self.pending).remove(&self.request_id);
    }
}

/// Session handle backed by one sidecar websocket.
pub struct SidecarSession {
    outbound: mpsc::Sender<GatewayMessage>,
    pending: PendingMap,
    own_id: Arc<OnceLock<String>>,
    send_timeout: Duration,
}

#[async_trait]
impl SessionProvider for SidecarSession {
    fn own_id(&self) -> Option<String> {
        self.own_id.get().cloned()
    }

    async fn send(&self, to: &str, content: OutboundContent) -> Result<()> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(request_id.clone(), Pending::Send(tx));

        let msg = GatewayMessage::Send {
            request_id: request_id.clone(),
            to: to.to_string(),
            content,
        };
        if self.outbound.send(msg).await.is_err() {
            lock(&self.pending).remove(&request_id);
            return Err(Error::NotConnected);
        }

        match tokio::time::timeout(self.send_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::NotConnected),
            Err(_) => {
                lock(&self.pending).remove(&request_id);
                Err(Error::timeout("send"))
            },
        }
    }

    async fn download_media(&self, media: &MediaRef, media_type: MediaType) -> Result<MediaStream> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(MEDIA_CHUNK_BUFFER);
        lock(&self.pending).insert(request_id.clone(), Pending::Media(tx));

        let msg = GatewayMessage::DownloadMedia {
            request_id: request_id.clone(),
            message: media.clone(),
            media_type,
        };
        if self.outbound.send(msg).await.is_err() {
            lock(&self.pending).remove(&request_id);
            return Err(Error::NotConnected);
        }

        Ok(Box::pin(MediaDownload {
            request_id,
            frames: ReceiverStream::new(rx),
            pending: Arc::clone(&self.pending),
            done: false,
        }))
    }
}
