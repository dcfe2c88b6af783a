//! WebSocket session handler.
//!
//! Each connection owns one engine [`ClientSession`]. Requests are processed in order;
//! a killed session or a device reset ends the connection.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use fwupdate_engine::{ClientSession, Outcome, PlatformAdapter};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};

use crate::websocket::{ClientMessage, ConnectionManager, ServerMessage};

use super::rpc::{dispatch, SharedService};

/// How long queued replies get to flush once the session ends.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle an established WebSocket connection.
pub async fn handle_websocket_connection<A>(
    socket: WebSocket,
    service: SharedService<A>,
    conn_manager: Arc<ConnectionManager>,
    reset: watch::Receiver<bool>,
    client: String,
) where
    A: PlatformAdapter + Send + 'static,
{
    let (ws_sender, ws_receiver) = socket.split();
    run_session(ws_sender, ws_receiver, service, conn_manager, reset, client).await
}

/// Drive one client session over a message sink and stream.
///
/// This function:
/// 1. Registers the connection with the manager
/// 2. Spawns a task to forward outgoing messages
/// 3. Processes incoming requests until close, kill, or reset
/// 4. Cleans up on disconnect
pub(crate) async fn run_session<A, Tx, Rx>(
    mut ws_sender: Tx,
    mut ws_receiver: Rx,
    service: SharedService<A>,
    conn_manager: Arc<ConnectionManager>,
    mut reset: watch::Receiver<bool>,
    client: String,
) where
    A: PlatformAdapter + Send + 'static,
    Tx: Sink<Message> + Unpin + Send + 'static,
    Tx::Error: Display + Send,
    Rx: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let conn_id = conn_manager.register(client.clone(), tx);
    let mut session = ClientSession::new(conn_id.clone());

    tracing::info!(conn_id = %conn_id, client = %client, "WebSocket client connected");

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
        let _ = ws_sender.send(Message::Close(None)).await;
    });

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => {
                let Some(result) = incoming else { break };
                match result {
                    Ok(Message::Text(text)) => {
                        let request: ClientMessage = match serde_json::from_str(&text) {
                            Ok(request) => request,
                            Err(e) => {
                                conn_manager.send_to(
                                    &conn_id,
                                    ServerMessage::error(format!("Invalid message format: {}", e), None),
                                );
                                continue;
                            }
                        };

                        let (updated, reply) = dispatch(service.clone(), session, request).await;
                        session = updated;
                        conn_manager.send_to(&conn_id, reply);

                        if let Some(reason) = session.kill_reason() {
                            tracing::warn!(conn_id = %conn_id, reason, "terminating client session");
                            conn_manager.send_to(
                                &conn_id,
                                ServerMessage::Killed {
                                    outcome: Outcome::FatalClientError,
                                    reason: reason.to_string(),
                                },
                            );
                            break;
                        }
                    }
                    Ok(Message::Binary(_)) => {
                        tracing::warn!("Binary messages not supported");
                    }
                    Ok(Message::Ping(data)) => {
                        tracing::trace!("Received ping: {} bytes", data.len());
                    }
                    Ok(Message::Pong(_)) => {
                        tracing::trace!("Received pong");
                    }
                    Ok(Message::Close(_)) => {
                        tracing::info!(conn_id = %conn_id, "WebSocket close frame received");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                        break;
                    }
                }
            }
            // Reduced to a bool so no watch guard lives across the dispatch await.
            true = async { reset.wait_for(|resetting| *resetting).await.is_ok() } => {
                conn_manager.send_to(&conn_id, ServerMessage::DeviceResetting);
                break;
            }
        }
    }

    // Dropping the sender lets the send task drain and close the socket.
    conn_manager.unregister(&conn_id);
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }

    tracing::info!(
        conn_id = %conn_id,
        client = %client,
        active_connections = conn_manager.connection_count(),
        "WebSocket client disconnected"
    );
}
