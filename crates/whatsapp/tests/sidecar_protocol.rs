//! Drives the websocket session provider against an in-process fake sidecar.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use {
    futures::{SinkExt, StreamExt},
    satele_channels::{MediaRef, MediaType, OutboundContent, SessionProvider},
    satele_whatsapp::{SessionConnector, SessionEvent, SidecarConnector},
    serde_json::{Value, json},
    tokio::net::TcpListener,
    tokio_tungstenite::tungstenite::Message,
};

type Ws = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

async fn recv_json(ws: &mut Ws) -> Value {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Close(_) => panic!("client closed"),
            _ => continue,
        }
    }
}

async fn send_json(ws: &mut Ws, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

async fn fake_sidecar() -> (String, tokio::sync::oneshot::Receiver<Ws>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _ = tx.send(ws);
    });
    (format!("ws://{addr}"), rx)
}

#[tokio::test]
async fn full_session_over_websocket() {
    let (url, accepted) = fake_sidecar().await;
    let connector = SidecarConnector::new(url, Duration::from_secs(5));

    let mut conn = connector.connect(None).await.unwrap();
    let mut ws = accepted.await.unwrap();

    let login = recv_json(&mut ws).await;
    assert_eq!(login["type"], "login");
    assert_eq!(login["credentials"], Value::Null);

    send_json(&mut ws, json!({ "type": "qr", "qr": "2@pairing" })).await;
    send_json(&mut ws, json!({ "type": "connected", "jid": "111:4@s.whatsapp.net" })).await;
    send_json(&mut ws, json!({
        "type": "messages",
        "messages": [{
            "key": { "remoteJid": "222@s.whatsapp.net", "fromMe": false, "id": "A1" },
            "message": { "conversation": "hey satele" }
        }]
    }))
    .await;
    send_json(&mut ws, json!({ "type": "credsUpdate", "credentials": { "me": { "id": "111" } } }))
        .await;

    assert_eq!(
        conn.events.recv().await.unwrap(),
        SessionEvent::PairingChallenge("2@pairing".into())
    );
    assert_eq!(conn.events.recv().await.unwrap(), SessionEvent::Open {
        own_id: "111:4@s.whatsapp.net".into()
    });
    match conn.events.recv().await.unwrap() {
        SessionEvent::Messages(messages) => {
            assert_eq!(messages.len(), 1);
            assert_eq!(
                messages[0].message.as_ref().unwrap().conversation.as_deref(),
                Some("hey satele")
            );
        },
        other => panic!("unexpected event {other:?}"),
    }
    assert!(matches!(
        conn.events.recv().await.unwrap(),
        SessionEvent::CredentialsUpdate(_)
    ));
    assert_eq!(
        conn.session.own_id().as_deref(),
        Some("111:4@s.whatsapp.net")
    );

    // Send: completes on the matching sendResult.
    let session = conn.session.clone();
    let send = tokio::spawn(async move {
        session
            .send("222@s.whatsapp.net", OutboundContent::text("🤖 [Satele] Working..."))
            .await
    });
    let request = recv_json(&mut ws).await;
    assert_eq!(request["type"], "send");
    assert_eq!(request["to"], "222@s.whatsapp.net");
    assert_eq!(request["content"]["text"], "🤖 [Satele] Working...");
    send_json(&mut ws, json!({
        "type": "sendResult",
        "requestId": request["requestId"],
        "success": true
    }))
    .await;
    send.await.unwrap().unwrap();

    // Failed send surfaces the sidecar error.
    let session = conn.session.clone();
    let send = tokio::spawn(async move {
        session
            .send("222@s.whatsapp.net", OutboundContent::text("hi"))
            .await
    });
    let request = recv_json(&mut ws).await;
    send_json(&mut ws, json!({
        "type": "sendResult",
        "requestId": request["requestId"],
        "success": false,
        "error": "not on WhatsApp"
    }))
    .await;
    let err = send.await.unwrap().unwrap_err();
    assert!(err.to_string().contains("not on WhatsApp"));

    // Download: chunks arrive in order.
    let media = MediaRef(json!({ "ptt": true, "directPath": "/v/x" }));
    let mut stream = conn
        .session
        .download_media(&media, MediaType::Audio)
        .await
        .unwrap();
    let request = recv_json(&mut ws).await;
    assert_eq!(request["type"], "downloadMedia");
    assert_eq!(request["mediaType"], "audio");
    assert_eq!(request["message"]["directPath"], "/v/x");
    let id = request["requestId"].clone();
    for data in ["aGVs", "bG8="] {
        send_json(&mut ws, json!({ "type": "mediaChunk", "requestId": id, "data": data })).await;
    }
    send_json(&mut ws, json!({ "type": "mediaEnd", "requestId": id })).await;

    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(body, b"hello");

    // Logout closes the session with the terminal status.
    send_json(&mut ws, json!({ "type": "disconnected", "statusCode": 401, "reason": "logged out" }))
        .await;
    match conn.events.recv().await.unwrap() {
        SessionEvent::Close(reason) => assert!(reason.is_logout()),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn dropped_socket_is_recoverable_close() {
    let (url, accepted) = fake_sidecar().await;
    let connector = SidecarConnector::new(url, Duration::from_secs(5));

    let mut conn = connector.connect(None).await.unwrap();
    let mut ws = accepted.await.unwrap();
    recv_json(&mut ws).await;

    let session = conn.session.clone();
    let pending = tokio::spawn(async move {
        session
            .send("222@s.whatsapp.net", OutboundContent::text("hi"))
            .await
    });
    recv_json(&mut ws).await;
    drop(ws);

    match conn.events.recv().await.unwrap() {
        SessionEvent::Close(reason) => {
            assert!(!reason.is_logout());
            assert_eq!(reason.status_code, None);
        },
        other => panic!("unexpected event {other:?}"),
    }
    assert!(matches!(
        pending.await.unwrap(),
        Err(satele_channels::Error::NotConnected)
    ));
}

#[tokio::test]
async fn download_cut_off_by_socket_drop_is_an_error() {
    let (url, accepted) = fake_sidecar().await;
    let connector = SidecarConnector::new(url, Duration::from_secs(5));

    let mut conn = connector.connect(None).await.unwrap();
    let mut ws = accepted.await.unwrap();
    recv_json(&mut ws).await;

    let media = MediaRef(json!({ "ptt": true }));
    let mut stream = conn
        .session
        .download_media(&media, MediaType::Audio)
        .await
        .unwrap();
    let request = recv_json(&mut ws).await;
    let id = request["requestId"].clone();

    // Fill the per-download buffer, then vanish without mediaEnd.
    for _ in 0..32 {
        send_json(&mut ws, json!({ "type": "mediaChunk", "requestId": id, "data": "QQ==" })).await;
    }
    drop(ws);
    assert!(matches!(
        conn.events.recv().await.unwrap(),
        SessionEvent::Close(_)
    ));

    let mut received = 0;
    let mut failed = false;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => received += bytes.len(),
            Err(_) => failed = true,
        }
    }
    assert_eq!(received, 32);
    assert!(failed);
}

#[tokio::test]
async fn unreachable_sidecar_fails_to_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let connector = SidecarConnector::new(format!("ws://{addr}"), Duration::from_secs(1));
    assert!(connector.connect(None).await.is_err());
}
