//! # WebSocket Handlers
//!
//! The chat socket. Each connection gets a writer task draining its outbound
//! queue into the socket and a reader task feeding client frames through the
//! [`ConversationPipeline`].
//!
//! ## Endpoints
//!
//! - `GET /ws` - WebSocket connection for the chat room

use crate::chat::{ConversationPipeline, ServerEvent};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// WebSocket handler for the chat room.
///
/// **Route**: `GET /ws`
///
/// Frames are JSON objects `{"event": ..., "data": ...}`; see
/// [`crate::chat::events`] for the full list.
///
/// # Example
///
/// ```javascript
/// const ws = new WebSocket('ws://localhost:3000/ws');
/// ws.onmessage = (event) => {
///   const { event: name, data } = JSON.parse(event.data);
///   if (name === 'receiveMessage') console.log(`${data.user.name}: ${data.text}`);
/// };
/// ws.send(JSON.stringify({
///   event: 'sendMessage',
///   data: { text: 'hello', user: { _id: 'abc', name: 'user1' } },
/// }));
/// ```
pub async fn chat_websocket(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(pipeline): State<Arc<ConversationPipeline>>,
) -> Response {
    let connection_id = Uuid::new_v4().to_string();
    let client_ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| addr.ip().to_string());

    info!(
        connection_id = %connection_id,
        client_ip = %client_ip,
        "[WS] CONNECT_ATTEMPT connection_id={} ip={}",
        connection_id,
        client_ip
    );

    ws.on_upgrade(move |socket| handle_chat_socket(socket, pipeline, connection_id, client_ip))
        .into_response()
}

/// Drive one chat connection from upgrade to disconnect.
async fn handle_chat_socket(
    socket: WebSocket,
    pipeline: Arc<ConversationPipeline>,
    connection_id: String,
    client_ip: String,
) {
    let (mut sender, mut receiver) = socket.split();
    let connection_start = Instant::now();
    let frames_sent = Arc::new(AtomicU64::new(0));
    let frames_received = Arc::new(AtomicU64::new(0));

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let session = match pipeline.open_session(connection_id.clone(), outbound_tx).await {
        Ok(session) => session,
        Err(e) => {
            error!(
                connection_id = %connection_id,
                error = %e,
                "[WS] CONNECT_FAILED connection_id={} error={}",
                connection_id,
                e
            );
            let event = ServerEvent::ConnectError {
                message: e.user_message(),
            };
            if let Ok(frame) = event.to_frame() {
                let _ = sender.send(Message::Text(frame.into())).await;
            }
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    info!(
        connection_id = %connection_id,
        client_ip = %client_ip,
        name = %session.identity().display_name,
        "[WS] CONNECTED connection_id={} ip={} name={}",
        connection_id,
        client_ip,
        session.identity().display_name
    );

    // Writer: outbound queue -> socket
    let connection_id_send = connection_id.clone();
    let frames_sent_send = Arc::clone(&frames_sent);
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let frame = match event.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    error!(
                        connection_id = %connection_id_send,
                        error = %e,
                        "[WS] SERIALIZE_ERROR connection_id={} error={}",
                        connection_id_send,
                        e
                    );
                    continue;
                }
            };

            if let Err(e) = sender.send(Message::Text(frame.into())).await {
                warn!(
                    connection_id = %connection_id_send,
                    error = %e,
                    event = event.name(),
                    "[WS] SEND_ERROR connection_id={} error={}",
                    connection_id_send,
                    e
                );
                break;
            }
            let count = frames_sent_send.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(
                connection_id = %connection_id_send,
                event = event.name(),
                total_sent = count,
                "[WS] FRAME_SENT"
            );
        }
    });

    // Reader: socket -> pipeline. Owns the session, so events are handled one at a time.
    let connection_id_recv = connection_id.clone();
    let frames_received_recv = Arc::clone(&frames_received);
    let pipeline_recv = Arc::clone(&pipeline);
    let mut recv_task = tokio::spawn(async move {
        let mut session = session;
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    frames_received_recv.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        connection_id = %connection_id_recv,
                        size = text.len(),
                        "[WS] FRAME_RECEIVED"
                    );
                    pipeline_recv.handle_frame(&mut session, text.as_str()).await;
                }
                Ok(Message::Close(frame)) => {
                    let reason = frame
                        .as_ref()
                        .map(|f| f.code.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    info!(
                        connection_id = %connection_id_recv,
                        reason = %reason,
                        "[WS] CLOSE_RECEIVED connection_id={} reason={}",
                        connection_id_recv,
                        reason
                    );
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Binary(data)) => {
                    debug!(
                        connection_id = %connection_id_recv,
                        size = data.len(),
                        "[WS] BINARY_IGNORED"
                    );
                }
                Err(e) => {
                    warn!(
                        connection_id = %connection_id_recv,
                        error = %e,
                        "[WS] RECV_ERROR connection_id={} error={}",
                        connection_id_recv,
                        e
                    );
                    break;
                }
            }
        }
        pipeline_recv.close_session(&mut session).await;
    });

    tokio::select! {
        result = &mut send_task => {
            recv_task.abort();
            // The reader never got to close the session
            pipeline.hub().unregister(&connection_id).await;
            if let Err(e) = result {
                error!(connection_id = %connection_id, error = ?e, "[WS] SEND_TASK_ERROR");
            }
        }
        result = &mut recv_task => {
            send_task.abort();
            if let Err(e) = result {
                pipeline.hub().unregister(&connection_id).await;
                error!(connection_id = %connection_id, error = ?e, "[WS] RECV_TASK_ERROR");
            }
        }
    }

    let duration = connection_start.elapsed();
    info!(
        connection_id = %connection_id,
        client_ip = %client_ip,
        duration_ms = duration.as_millis(),
        frames_sent = frames_sent.load(Ordering::Relaxed),
        frames_received = frames_received.load(Ordering::Relaxed),
        "[WS] DISCONNECTED connection_id={} ip={} duration={:.2}s",
        connection_id,
        client_ip,
        duration.as_secs_f64()
    );
}
